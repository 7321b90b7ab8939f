use std::sync::Arc;

use winit::window::Window;

use crate::error::BackgroundError;
use crate::inputs::SurfaceSize;
use crate::types::GpuPowerPreference;

/// wgpu instance, device and window surface for one background.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
    max_dimension: u32,
}

impl GpuContext {
    pub(crate) fn new(
        window: Arc<Window>,
        initial_size: SurfaceSize,
        gpu_power: GpuPowerPreference,
    ) -> Result<Self, BackgroundError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(window)
            .map_err(|err| unsupported("failed to create rendering surface", err))?;

        let power_preference = match gpu_power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| unsupported("failed to find a suitable GPU adapter", err))?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        let width = initial_size.width.max(1);
        let height = initial_size.height.max(1);
        if width > max_dimension || height > max_dimension {
            return Err(BackgroundError::UnsupportedPlatform(format!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            )));
        }

        let surface_caps = surface.get_capabilities(&adapter);
        // The colour law is tuned for values written straight to the display.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| {
                BackgroundError::UnsupportedPlatform(
                    "surface is not compatible with the selected adapter".to_string(),
                )
            })?;
        if surface_format.is_srgb() {
            tracing::warn!(
                ?surface_format,
                "no linear (non-sRGB) surface format available; colours will be gamma encoded"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("iridescence device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| unsupported("failed to create GPU device", err))?;

        let present_mode = choose_present_mode(&surface_caps.present_modes);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        tracing::debug!(?present_mode, ?surface_format, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            surface_format,
            max_dimension,
        })
    }

    pub(crate) fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.config.width, self.config.height)
    }

    /// Reconfigures the swapchain for `size` and returns the size in effect
    /// afterwards.
    pub(crate) fn resize(&mut self, size: SurfaceSize) -> SurfaceSize {
        let applied = clamp_surface_size(size, self.size(), self.max_dimension);
        if applied != self.size() {
            self.config.width = applied.width;
            self.config.height = applied.height;
            self.surface.configure(&self.device, &self.config);
        }
        applied
    }

    /// Reconfigures at the current size after a lost or outdated surface.
    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

fn unsupported(context: &str, err: impl std::fmt::Display) -> BackgroundError {
    BackgroundError::UnsupportedPlatform(format!("{context}: {err}"))
}

/// Zero-area requests keep `current`; oversized ones are clamped to `max`.
fn clamp_surface_size(requested: SurfaceSize, current: SurfaceSize, max: u32) -> SurfaceSize {
    if requested.is_empty() {
        return current;
    }
    SurfaceSize::new(requested.width.min(max), requested.height.min(max))
}

/// Fifo when advertised, else the first supported mode.
fn choose_present_mode(modes: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if modes.contains(&wgpu::PresentMode::Fifo) {
        return wgpu::PresentMode::Fifo;
    }
    modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_area_resize_keeps_current_size() {
        let current = SurfaceSize::new(800, 600);
        assert_eq!(
            clamp_surface_size(SurfaceSize::new(0, 0), current, 8192),
            current
        );
        assert_eq!(
            clamp_surface_size(SurfaceSize::new(1024, 0), current, 8192),
            current
        );
    }

    #[test]
    fn oversized_resize_is_clamped_to_device_limit() {
        let applied = clamp_surface_size(
            SurfaceSize::new(10_000, 600),
            SurfaceSize::new(800, 600),
            8192,
        );
        assert_eq!(applied, SurfaceSize::new(8192, 600));
    }

    #[test]
    fn prefers_fifo_when_advertised() {
        let modes = [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Fifo];
        assert_eq!(choose_present_mode(&modes), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn falls_back_to_first_supported_mode() {
        let modes = [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox];
        assert_eq!(choose_present_mode(&modes), wgpu::PresentMode::Immediate);
        assert_eq!(choose_present_mode(&[]), wgpu::PresentMode::Fifo);
    }
}
