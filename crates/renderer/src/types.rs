use crate::runtime::RenderPolicy;

/// Surface id the host opens when none is configured.
pub const DEFAULT_SURFACE_ID: &str = "iridescence-bg";

/// Visual parameters fixed when the background starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundConfig {
    /// Multiplier applied to the final colour.
    pub tint: [f32; 3],
    /// Strength of the pointer-driven distortion.
    pub amplitude: f32,
    /// Animation rate multiplier.
    pub speed: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            tint: [1.0, 1.0, 1.0],
            amplitude: 0.1,
            speed: 1.0,
        }
    }
}

/// GPU adapter power preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Opaque id of the host surface the background binds to.
    pub surface_id: String,
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Tint, amplitude and speed.
    pub background: BackgroundConfig,
    /// Animation clock and pacing.
    pub policy: RenderPolicy,
    /// Adapter selection hint.
    pub gpu_power: GpuPowerPreference,
    /// Stop the background and exit once this much wall-clock time has passed.
    pub run_for: Option<std::time::Duration>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_id: DEFAULT_SURFACE_ID.to_string(),
            surface_size: (1280, 720),
            background: BackgroundConfig::default(),
            policy: RenderPolicy::default(),
            gpu_power: GpuPowerPreference::default(),
            run_for: None,
        }
    }
}
