//! The animated background component and the seams it draws through.
//!
//! [`AnimatedShaderBackground`] owns the program, the quad and the per-frame
//! inputs. Pixels go through a [`RenderTarget`], which the host hands out via
//! [`SurfaceHost::acquire`]. The `wgpu` implementation lives in
//! [`crate::gpu`]; tests substitute a recording double.

use tracing::{debug, error, info, warn};

use crate::compile::{build_program, ProgramSource, ShadingProgram};
use crate::error::{BackgroundError, FrameError};
use crate::geometry::QuadGeometry;
use crate::inputs::{BackgroundUniforms, FrameInputs, SurfaceRect, SurfaceSize, Viewport};
use crate::types::BackgroundConfig;

/// A drawing surface bound to a graphics context.
pub trait RenderTarget {
    /// Current backing size and device pixel ratio.
    fn viewport(&self) -> Viewport;
    /// Placement of the surface in pointer-event coordinates.
    fn bounds(&self) -> SurfaceRect;
    /// Resizes the backing store and returns the size actually in effect,
    /// which may differ from `size` (zero-area requests keep the old store,
    /// oversized ones are clamped). Calling it twice with the same size is a
    /// no-op.
    fn configure(&mut self, size: SurfaceSize) -> SurfaceSize;
    /// Creates device-side resources for a linked program and its quad.
    fn install(
        &mut self,
        program: &ShadingProgram,
        geometry: &QuadGeometry,
    ) -> Result<(), BackgroundError>;
    /// Clears to opaque black and draws the quad with `uniforms`.
    fn draw(&mut self, uniforms: &BackgroundUniforms) -> Result<(), FrameError>;
    /// Clears to opaque black without drawing.
    fn clear(&mut self) -> Result<(), FrameError>;
    /// Drops device resources. The target draws nothing afterwards.
    fn release(&mut self);
}

/// Hands out render targets for surfaces identified by an opaque id.
pub trait SurfaceHost {
    type Target: RenderTarget;

    /// Fails with [`BackgroundError::UnsupportedPlatform`] when the id is
    /// unknown or no compatible graphics context exists.
    fn acquire(&mut self, surface_id: &str) -> Result<Self::Target, BackgroundError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, not started yet.
    Idle,
    /// Started successfully; frames are drawn.
    Running,
    /// Initialization failed. Permanent.
    Disabled,
    /// Stopped by the owner.
    Stopped,
}

/// Result of one [`AnimatedShaderBackground::render_frame`] call.
#[derive(Debug)]
pub enum FrameOutcome {
    Presented,
    /// The device rejected the frame; the loop should carry on.
    Skipped(FrameError),
    /// The component is not running.
    Inactive,
}

/// Full-viewport animated shader background.
pub struct AnimatedShaderBackground<T: RenderTarget> {
    config: BackgroundConfig,
    source: ProgramSource,
    target: Option<T>,
    program: Option<ShadingProgram>,
    geometry: QuadGeometry,
    inputs: FrameInputs,
    lifecycle: Lifecycle,
    frames: u64,
    last_error: Option<BackgroundError>,
}

impl<T: RenderTarget> AnimatedShaderBackground<T> {
    pub fn new(config: BackgroundConfig) -> Self {
        Self {
            config,
            source: ProgramSource::default(),
            target: None,
            program: None,
            geometry: QuadGeometry::fullscreen(),
            inputs: FrameInputs::new(&config, SurfaceSize::new(0, 0)),
            lifecycle: Lifecycle::Idle,
            frames: 0,
            last_error: None,
        }
    }

    /// Replaces the built-in stage sources. Only takes effect before `start`.
    pub fn with_program_source(mut self, source: ProgramSource) -> Self {
        self.source = source;
        self
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn inputs(&self) -> &FrameInputs {
        &self.inputs
    }

    pub fn program(&self) -> Option<&ShadingProgram> {
        self.program.as_ref()
    }

    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    /// Frames presented since `start`.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// The initialization failure that disabled the component, if any.
    pub fn last_error(&self) -> Option<&BackgroundError> {
        self.last_error.as_ref()
    }

    /// Binds to the host surface `surface_id`, builds the program and uploads
    /// the quad. Any failure is logged and leaves the component disabled for
    /// good; the caller's loop is never started by a failed `start`.
    pub fn start<H>(&mut self, host: &mut H, surface_id: &str) -> Result<(), BackgroundError>
    where
        H: SurfaceHost<Target = T>,
    {
        match self.lifecycle {
            Lifecycle::Running => {
                warn!(surface_id, "background already running; ignoring start");
                return Ok(());
            }
            Lifecycle::Disabled => {
                if let Some(err) = &self.last_error {
                    return Err(err.clone());
                }
            }
            Lifecycle::Idle | Lifecycle::Stopped => {}
        }

        let mut target = match host.acquire(surface_id) {
            Ok(target) => target,
            Err(err) => return Err(self.disable(err)),
        };

        let viewport = target.viewport();
        let applied = target.configure(viewport.size);
        self.inputs = FrameInputs::new(&self.config, applied);

        let program = match build_program(&self.source) {
            Ok(program) => program,
            Err(err) => {
                blank(&mut target);
                return Err(self.disable(err));
            }
        };

        if let Err(err) = target.install(&program, &self.geometry) {
            blank(&mut target);
            return Err(self.disable(err));
        }

        info!(
            surface_id,
            width = applied.width,
            height = applied.height,
            scale_factor = viewport.scale_factor,
            "animated background started"
        );
        self.target = Some(target);
        self.program = Some(program);
        self.frames = 0;
        self.lifecycle = Lifecycle::Running;
        Ok(())
    }

    /// Re-reads the viewport and updates the backing store and resolution
    /// input. The resolution always matches the store the target applied, so
    /// a minimized (zero-area) window keeps drawing at the last real size.
    /// Does nothing until a program exists.
    pub fn on_resize(&mut self) {
        if self.program.is_none() {
            return;
        }
        let Some(target) = self.target.as_mut() else {
            return;
        };
        let viewport = target.viewport();
        let applied = target.configure(viewport.size);
        if applied.is_empty() {
            debug!("ignoring resize to an empty surface");
            return;
        }
        if applied.as_resolution() != self.inputs.resolution {
            debug!(
                width = applied.width,
                height = applied.height,
                requested_width = viewport.size.width,
                requested_height = viewport.size.height,
                "background resized"
            );
        }
        self.inputs.resolution = applied.as_resolution();
    }

    /// Records the pointer in surface-normalized coordinates, bottom-left
    /// origin, unclamped.
    pub fn on_pointer_move(&mut self, client_x: f64, client_y: f64) {
        let Some(target) = self.target.as_ref() else {
            return;
        };
        if let Some(pointer) = target.bounds().normalize_pointer(client_x, client_y) {
            self.inputs.pointer = pointer;
        }
    }

    /// Draws one frame at `elapsed_time` seconds.
    pub fn render_frame(&mut self, elapsed_time: f32) -> FrameOutcome {
        if self.lifecycle != Lifecycle::Running {
            return FrameOutcome::Inactive;
        }
        let Some(target) = self.target.as_mut() else {
            return FrameOutcome::Inactive;
        };

        self.inputs.elapsed_time = elapsed_time;
        match target.draw(&self.inputs.to_uniforms()) {
            Ok(()) => {
                self.frames = self.frames.saturating_add(1);
                FrameOutcome::Presented
            }
            Err(err) => {
                warn!(error = %err, elapsed_time, "frame skipped");
                FrameOutcome::Skipped(err)
            }
        }
    }

    /// Releases device resources. No frame is drawn afterwards.
    pub fn stop(&mut self) {
        if let Some(mut target) = self.target.take() {
            target.release();
            info!(frames = self.frames, "animated background stopped");
        }
        self.program = None;
        if self.lifecycle != Lifecycle::Disabled {
            self.lifecycle = Lifecycle::Stopped;
        }
    }

    fn disable(&mut self, err: BackgroundError) -> BackgroundError {
        match err.diagnostic() {
            Some(diagnostic) => error!(error = %err, diagnostic, "background disabled"),
            None => error!(error = %err, "background disabled"),
        }
        self.lifecycle = Lifecycle::Disabled;
        self.last_error = Some(err.clone());
        err
    }
}

fn blank<T: RenderTarget>(target: &mut T) {
    if let Err(err) = target.clear() {
        warn!(error = %err, "failed to blank surface");
    }
    target.release();
}
