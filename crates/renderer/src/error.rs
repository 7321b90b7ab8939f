use std::fmt;

use thiserror::Error;

/// Programmable pipeline stage a compiler diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub(crate) fn as_naga(self) -> naga::ShaderStage {
        match self {
            StageKind::Vertex => naga::ShaderStage::Vertex,
            StageKind::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Initialization failures. Each one leaves the background permanently
/// disabled with a blank surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackgroundError {
    #[error("no compatible graphics context: {0}")]
    UnsupportedPlatform(String),
    #[error("{stage} shader failed to compile: {diagnostic}")]
    ShaderCompile { stage: StageKind, diagnostic: String },
    #[error("shader program failed to link: {diagnostic}")]
    ShaderLink { diagnostic: String },
}

impl BackgroundError {
    /// Compiler or linker output attached to the error, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            BackgroundError::UnsupportedPlatform(_) => None,
            BackgroundError::ShaderCompile { diagnostic, .. }
            | BackgroundError::ShaderLink { diagnostic } => Some(diagnostic),
        }
    }

    pub(crate) fn link(diagnostic: impl Into<String>) -> Self {
        BackgroundError::ShaderLink {
            diagnostic: diagnostic.into(),
        }
    }
}

/// Per-frame failure. The frame is skipped and the loop carries on.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("device error: {0}")]
    Device(String),
}

impl FrameError {
    /// True when reconfiguring the surface at its current size should recover.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(
            self,
            FrameError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
        )
    }

    /// True when the render loop cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Surface(wgpu::SurfaceError::OutOfMemory))
    }
}
