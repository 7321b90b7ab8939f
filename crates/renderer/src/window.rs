use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::background::{AnimatedShaderBackground, FrameOutcome, SurfaceHost};
use crate::error::BackgroundError;
use crate::gpu::GpuTarget;
use crate::runtime::RenderPolicyDriver;
use crate::types::{GpuPowerPreference, RendererConfig};

/// Registry of host windows, addressed by surface id.
pub struct WindowHost {
    windows: HashMap<String, Arc<Window>>,
    gpu_power: GpuPowerPreference,
}

impl WindowHost {
    pub fn new(gpu_power: GpuPowerPreference) -> Self {
        Self {
            windows: HashMap::new(),
            gpu_power,
        }
    }

    /// Opens a window titled `surface_id` and registers it under that id.
    pub fn open<T>(
        &mut self,
        target: &EventLoopWindowTarget<T>,
        surface_id: &str,
        size: (u32, u32),
    ) -> Result<Arc<Window>> {
        let window = WindowBuilder::new()
            .with_title(surface_id)
            .with_inner_size(PhysicalSize::new(size.0, size.1))
            .build(target)
            .map_err(|err| anyhow!("failed to create background window: {err}"))?;
        let window = Arc::new(window);
        self.register(surface_id, window.clone());
        Ok(window)
    }

    pub fn register(&mut self, surface_id: &str, window: Arc<Window>) {
        self.windows.insert(surface_id.to_string(), window);
    }
}

impl SurfaceHost for WindowHost {
    type Target = GpuTarget;

    fn acquire(&mut self, surface_id: &str) -> Result<GpuTarget, BackgroundError> {
        let window = self.windows.get(surface_id).cloned().ok_or_else(|| {
            BackgroundError::UnsupportedPlatform(format!("no host surface named '{surface_id}'"))
        })?;
        GpuTarget::new(window, self.gpu_power)
    }
}

/// Frame counter that reports throughput once per second.
struct RenderStats {
    last_update: Instant,
    frames_since_update: u32,
}

impl RenderStats {
    fn new(now: Instant) -> Self {
        Self {
            last_update: now,
            frames_since_update: 0,
        }
    }

    fn record(&mut self, now: Instant, frame_count: u64, time: f32) {
        self.frames_since_update += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_update as f32 / elapsed.as_secs_f32();
            debug!(fps = fps.round(), frame_count, time, "render stats");
            self.frames_since_update = 0;
            self.last_update = now;
        }
    }
}

/// Opens the host window, starts the background on it and drives frames
/// until the window closes or `run_for` elapses. Must run on the main thread.
pub(crate) fn run_window_loop(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let mut host = WindowHost::new(config.gpu_power);
    let window = host.open(&event_loop, &config.surface_id, config.surface_size)?;

    let mut background = AnimatedShaderBackground::<GpuTarget>::new(config.background);
    if background.start(&mut host, &config.surface_id).is_err() {
        warn!(
            surface_id = %config.surface_id,
            "background disabled; the window stays blank until closed"
        );
    }
    drop(host);

    let mut driver = RenderPolicyDriver::new(config.policy.clone());
    let mut stats = RenderStats::new(Instant::now());
    let exit_at = config.run_for.map(|duration| Instant::now() + duration);
    if background.is_running() && driver.ready_for_frame(Instant::now()) {
        window.request_redraw();
    }

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                background.stop();
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                {
                    background.stop();
                    elwt.exit();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                background.on_pointer_move(position.x, position.y);
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                background.on_resize();
                driver.invalidate();
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let sample = driver.sample();
                match background.render_frame(sample.seconds) {
                    FrameOutcome::Presented => {
                        let now = Instant::now();
                        driver.mark_rendered(now);
                        stats.record(now, background.frame_count(), sample.seconds);
                    }
                    FrameOutcome::Skipped(err) => {
                        if err.needs_reconfigure() {
                            if let Some(target) = background.target() {
                                target.reconfigure();
                            }
                        } else if err.is_fatal() {
                            tracing::error!(error = %err, "surface out of memory; stopping");
                            background.stop();
                            elwt.exit();
                        }
                    }
                    FrameOutcome::Inactive => {}
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if exit_at.is_some_and(|deadline| now >= deadline) {
                info!("run duration elapsed; stopping background");
                background.stop();
                elwt.exit();
                return;
            }

            let frame_deadline = if !background.is_running() {
                None
            } else if driver.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                window.request_redraw();
                None
            } else {
                driver.next_deadline()
            };

            match frame_deadline.into_iter().chain(exit_at).min() {
                Some(deadline) => elwt.set_control_flow(ControlFlow::WaitUntil(deadline)),
                None => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        Event::LoopExiting => {
            background.stop();
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
