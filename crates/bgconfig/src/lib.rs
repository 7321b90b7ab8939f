//! TOML configuration for the iridescence background.
//!
//! Every field is optional except `version`; a missing file yields
//! [`BackgroundFile::default`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Config schema version understood by this crate.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackgroundFile {
    pub version: u32,
    #[serde(default)]
    pub background: BackgroundSection,
    #[serde(default)]
    pub surface: SurfaceSection,
    #[serde(default)]
    pub pacing: PacingSection,
}

impl Default for BackgroundFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            background: BackgroundSection::default(),
            surface: SurfaceSection::default(),
            pacing: PacingSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackgroundSection {
    #[serde(default = "default_tint")]
    pub tint: [f64; 3],
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Default for BackgroundSection {
    fn default() -> Self {
        Self {
            tint: default_tint(),
            amplitude: default_amplitude(),
            speed: default_speed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SurfaceSection {
    #[serde(default = "default_surface_id")]
    pub id: String,
    #[serde(default)]
    pub size: SurfaceDimensions,
}

impl Default for SurfaceSection {
    fn default() -> Self {
        Self {
            id: default_surface_id(),
            size: SurfaceDimensions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSetting {
    /// Seconds since start.
    Wall,
    /// `frame_step` per rendered frame.
    Frame,
}

impl FromStr for ClockSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wall" => Ok(Self::Wall),
            "frame" | "frame-step" => Ok(Self::Frame),
            other => Err(format!("invalid clock '{other}'; expected 'wall' or 'frame'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PacingSection {
    #[serde(default = "default_clock")]
    pub clock: ClockSetting,
    #[serde(
        default = "default_frame_step",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub frame_step: Duration,
    /// Frame rate cap; zero renders on every refresh.
    #[serde(default)]
    pub fps: f64,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            clock: default_clock(),
            frame_step: default_frame_step(),
            fps: 0.0,
        }
    }
}

/// Window size written as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct SurfaceDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceDimensions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl FromStr for SurfaceDimensions {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (width, height) = raw
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid size '{raw}'; expected WIDTHxHEIGHT"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|err| format!("invalid size '{raw}': {err}"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

impl TryFrom<String> for SurfaceDimensions {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<SurfaceDimensions> for String {
    fn from(size: SurfaceDimensions) -> Self {
        size.to_string()
    }
}

impl fmt::Display for SurfaceDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn default_tint() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

fn default_amplitude() -> f64 {
    0.1
}

fn default_speed() -> f64 {
    1.0
}

fn default_surface_id() -> String {
    "iridescence-bg".to_string()
}

fn default_clock() -> ClockSetting {
    ClockSetting::Wall
}

fn default_frame_step() -> Duration {
    Duration::from_millis(16)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must be non-negative"))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be finite and non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

impl BackgroundFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: BackgroundFile = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Frame rate cap, or `None` when uncapped.
    pub fn fps_cap(&self) -> Option<f64> {
        (self.pacing.fps > 0.0).then_some(self.pacing.fps)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        let background = &self.background;
        for (index, component) in background.tint.iter().enumerate() {
            if !component.is_finite() || *component < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "background.tint[{index}] must be finite and >= 0"
                )));
            }
        }
        if !background.amplitude.is_finite() {
            return Err(ConfigError::Invalid(
                "background.amplitude must be finite".into(),
            ));
        }
        if !background.speed.is_finite() {
            return Err(ConfigError::Invalid("background.speed must be finite".into()));
        }

        if self.surface.id.trim().is_empty() {
            return Err(ConfigError::Invalid("surface.id may not be empty".into()));
        }
        if self.surface.size.width == 0 || self.surface.size.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "surface.size {} must be non-zero",
                self.surface.size
            )));
        }

        if !self.pacing.fps.is_finite() || self.pacing.fps < 0.0 {
            return Err(ConfigError::Invalid("pacing.fps must be >= 0".into()));
        }
        if self.pacing.frame_step.is_zero() {
            return Err(ConfigError::Invalid(
                "pacing.frame_step must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[background]
tint = [0.2, 0.5, 1.0]
amplitude = 0.25
speed = 1.5

[surface]
id = "desk-bg"
size = "1920x1080"

[pacing]
clock = "frame"
frame_step = "20ms"
fps = 30
"#;

    #[test]
    fn parses_sample_config() {
        let config = BackgroundFile::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.background.tint, [0.2, 0.5, 1.0]);
        assert_eq!(config.background.amplitude, 0.25);
        assert_eq!(config.surface.id, "desk-bg");
        assert_eq!(
            config.surface.size,
            SurfaceDimensions {
                width: 1920,
                height: 1080
            }
        );
        assert_eq!(config.pacing.clock, ClockSetting::Frame);
        assert_eq!(config.pacing.frame_step, Duration::from_millis(20));
        assert_eq!(config.fps_cap(), Some(30.0));
    }

    #[test]
    fn omitted_sections_take_defaults() {
        let config = BackgroundFile::from_toml_str("version = 1\n").expect("parse config");
        assert_eq!(config, BackgroundFile::default());
        assert_eq!(config.background.tint, [1.0, 1.0, 1.0]);
        assert_eq!(config.background.amplitude, 0.1);
        assert_eq!(config.background.speed, 1.0);
        assert_eq!(config.pacing.frame_step, Duration::from_millis(16));
        assert_eq!(config.fps_cap(), None);
    }

    #[test]
    fn numeric_frame_step_is_seconds() {
        let config = BackgroundFile::from_toml_str("version = 1\n[pacing]\nframe_step = 0.5\n")
            .expect("parse config");
        assert_eq!(config.pacing.frame_step, Duration::from_millis(500));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = BackgroundFile::from_toml_str("version = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_tint() {
        let err = BackgroundFile::from_toml_str("version = 1\n[background]\ntint = [1.0, -0.1, 1.0]\n")
            .unwrap_err();
        assert!(err.to_string().contains("tint[1]"), "{err}");
    }

    #[test]
    fn rejects_zero_frame_step() {
        let err = BackgroundFile::from_toml_str("version = 1\n[pacing]\nframe_step = \"0s\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_size() {
        let err = BackgroundFile::from_toml_str("version = 1\n[surface]\nsize = \"wide\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = BackgroundFile::from_toml_str("version = 1\n[surface]\nsize = \"0x720\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_clock() {
        let err = BackgroundFile::from_toml_str("version = 1\n[pacing]\nclock = \"lunar\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rendered_config_parses_back() {
        let config = BackgroundFile::from_toml_str(SAMPLE).expect("parse config");
        let rendered = config.to_toml_string().expect("render");
        assert!(rendered.contains("size = \"1920x1080\""), "{rendered}");
        assert!(rendered.contains("frame_step = \"20ms\""), "{rendered}");
        assert_eq!(BackgroundFile::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BackgroundFile::load(&dir.path().join("config.toml")).expect("load");
        assert_eq!(config, BackgroundFile::default());
    }

    #[test]
    fn load_reads_and_validates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "version = 1\n[background]\nspeed = 3.0\n").unwrap();
        assert_eq!(BackgroundFile::load(&path).unwrap().background.speed, 3.0);

        std::fs::write(&path, "version = 7\n").unwrap();
        assert!(BackgroundFile::load(&path).is_err());
    }

    #[test]
    fn size_and_clock_parse_from_cli_text() {
        assert_eq!(
            "800X600".parse::<SurfaceDimensions>().unwrap(),
            SurfaceDimensions {
                width: 800,
                height: 600
            }
        );
        assert_eq!("Frame".parse::<ClockSetting>().unwrap(), ClockSetting::Frame);
        assert!("800".parse::<SurfaceDimensions>().is_err());
    }
}
