use anyhow::{Context, Result};
use bgconfig::{BackgroundFile, ClockSetting};
use renderer::{
    BackgroundConfig, ClockMode, GpuPowerPreference, RenderPolicy, RendererConfig,
};

use crate::cli::RunArgs;

/// Layers command-line overrides on top of the file and re-validates.
pub fn merge_overrides(mut file: BackgroundFile, args: &RunArgs) -> Result<BackgroundFile> {
    if let Some(tint) = args.tint {
        file.background.tint = tint;
    }
    if let Some(amplitude) = args.amplitude {
        file.background.amplitude = amplitude;
    }
    if let Some(speed) = args.speed {
        file.background.speed = speed;
    }
    if let Some(surface) = &args.surface {
        file.surface.id = surface.clone();
    }
    if let Some(size) = args.size {
        file.surface.size = size;
    }
    if let Some(fps) = args.fps {
        file.pacing.fps = fps;
    }
    if let Some(clock) = args.clock {
        file.pacing.clock = clock;
    }

    file.validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(file)
}

pub fn renderer_config(file: &BackgroundFile, args: &RunArgs) -> RendererConfig {
    let background = BackgroundConfig {
        tint: file.background.tint.map(|component| component as f32),
        amplitude: file.background.amplitude as f32,
        speed: file.background.speed as f32,
    };

    let policy = match args.still {
        Some(time) => RenderPolicy::Still { time },
        None => RenderPolicy::Animate {
            target_fps: file.fps_cap().map(|fps| fps as f32),
            clock: match file.pacing.clock {
                ClockSetting::Wall => ClockMode::Wall,
                ClockSetting::Frame => ClockMode::FrameStep {
                    step: file.pacing.frame_step,
                },
            },
        },
    };

    RendererConfig {
        surface_id: file.surface.id.clone(),
        surface_size: (file.surface.size.width, file.surface.size.height),
        background,
        policy,
        gpu_power: if args.high_performance {
            GpuPowerPreference::High
        } else {
            GpuPowerPreference::Low
        },
        run_for: args.run_for,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bgconfig::SurfaceDimensions;

    use super::*;

    #[test]
    fn flags_override_file_values() {
        let file = BackgroundFile::from_toml_str(
            "version = 1\n[background]\namplitude = 0.5\nspeed = 2.0\n",
        )
        .unwrap();
        let args = RunArgs {
            speed: Some(0.25),
            size: Some(SurfaceDimensions {
                width: 640,
                height: 480,
            }),
            ..RunArgs::default()
        };

        let merged = merge_overrides(file, &args).unwrap();
        assert_eq!(merged.background.amplitude, 0.5);
        assert_eq!(merged.background.speed, 0.25);
        assert_eq!(merged.surface.size.width, 640);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = RunArgs {
            fps: Some(-5.0),
            ..RunArgs::default()
        };
        assert!(merge_overrides(BackgroundFile::default(), &args).is_err());
    }

    #[test]
    fn frame_clock_and_cap_reach_the_policy() {
        let file = BackgroundFile::from_toml_str(
            "version = 1\n[pacing]\nclock = \"frame\"\nframe_step = \"20ms\"\nfps = 30\n",
        )
        .unwrap();
        let config = renderer_config(&file, &RunArgs::default());
        assert_eq!(
            config.policy,
            RenderPolicy::Animate {
                target_fps: Some(30.0),
                clock: ClockMode::FrameStep {
                    step: Duration::from_millis(20)
                },
            }
        );
        assert_eq!(config.gpu_power, GpuPowerPreference::Low);
    }

    #[test]
    fn still_flag_replaces_animation() {
        let args = RunArgs {
            still: Some(4.5),
            high_performance: true,
            run_for: Some(Duration::from_secs(2)),
            ..RunArgs::default()
        };
        let config = renderer_config(&BackgroundFile::default(), &args);
        assert_eq!(config.policy, RenderPolicy::Still { time: 4.5 });
        assert_eq!(config.gpu_power, GpuPowerPreference::High);
        assert_eq!(config.run_for, Some(Duration::from_secs(2)));
    }

    #[test]
    fn defaults_match_renderer_defaults() {
        let config = renderer_config(&BackgroundFile::default(), &RunArgs::default());
        let expected = RendererConfig::default();
        assert_eq!(config.surface_id, expected.surface_id);
        assert_eq!(config.surface_size, expected.surface_size);
        assert_eq!(config.background, expected.background);
        assert_eq!(config.policy, expected.policy);
    }
}
