//! Renderer crate for the iridescence animated background.
//!
//! The crate draws a full-viewport iridescent pattern behind a host window
//! and keeps it moving with time and the pointer. The overall flow is:
//!
//! ```text
//!   CLI / bgconfig
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowHost ──▶ AnimatedShaderBackground::start
//!                                        │  compile ─▶ link ─▶ install
//!                                        ▼
//!                   winit event loop ──▶ render_frame(t) ──▶ GpuTarget::draw
//! ```
//!
//! [`AnimatedShaderBackground`] owns the shading program, the quad and the
//! per-frame inputs and talks to pixels only through [`RenderTarget`]. The
//! GLSL stages are parsed, validated and reflected with `naga` on the CPU
//! before any device work happens, so compile and link failures are reported
//! (and tested) without a GPU. [`shading::shade`] evaluates the same colour
//! law on the CPU.

mod background;
mod compile;
mod error;
mod geometry;
mod gpu;
mod inputs;
pub mod runtime;
pub mod shading;
mod types;
mod window;

use anyhow::Result;

pub use background::{AnimatedShaderBackground, FrameOutcome, Lifecycle, RenderTarget, SurfaceHost};
pub use compile::{
    build_program, compile_stage, link_program, CompiledStage, InputSlots, ProgramSource,
    ShadingProgram, UniformSlot, FRAGMENT_SHADER_GLSL, POSITION_ATTRIBUTE, UV_ATTRIBUTE,
    VERTEX_SHADER_GLSL,
};
pub use error::{BackgroundError, FrameError, StageKind};
pub use geometry::{QuadGeometry, QuadVertex, FULLSCREEN_QUAD};
pub use gpu::GpuTarget;
pub use inputs::{
    BackgroundUniforms, FrameInputs, SurfaceRect, SurfaceSize, Viewport, DEFAULT_POINTER,
    UNIFORM_OFFSETS,
};
pub use runtime::{ClockMode, RenderPolicy, DEFAULT_FRAME_STEP};
pub use types::{BackgroundConfig, GpuPowerPreference, RendererConfig, DEFAULT_SURFACE_ID};
pub use window::WindowHost;

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the host window and runs the background until the window closes.
    ///
    /// Initialization failures of the background are logged and leave the
    /// window blank; only failures of the window system itself are returned.
    /// Must be called from the main thread.
    pub fn run(self) -> Result<()> {
        window::run_window_loop(self.config)
    }
}
