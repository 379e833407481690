use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Blink phase length used when the file does not override it.
pub use lampstate::DEFAULT_BLINK_INTERVAL;

/// Shortest blink phase the lamp can time; it ticks in whole milliseconds.
pub const MIN_BLINK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How a pointer "up" is turned into a light transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchMappingSetting {
    /// Three horizontal bands: red, blinking, green from top to bottom.
    #[default]
    Banded,
    /// Every release advances to the next state in the cycle.
    Cycle,
}

/// Whether GPU resources survive a suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PausePolicySetting {
    #[default]
    Preserve,
    Teardown,
}

/// Minimum shader model the adapter has to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderModelSetting {
    #[default]
    Sm2,
    Sm4,
    Sm5,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1280,
            title: "Traffic Light".to_string(),
        }
    }
}

/// Linear RGBA colors used by the lamp.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaletteSettings {
    pub background: [f32; 4],
    pub red: [f32; 4],
    pub green: [f32; 4],
    pub blink: [f32; 4],
}

impl Default for PaletteSettings {
    fn default() -> Self {
        Self {
            background: [0.5, 0.5, 0.5, 1.0],
            red: [1.0, 0.0, 0.0, 1.0],
            green: [0.0, 1.0, 0.0, 1.0],
            blink: [1.0, 0.75, 0.0, 1.0],
        }
    }
}

impl PaletteSettings {
    fn entries(&self) -> [(&'static str, [f32; 4]); 4] {
        [
            ("background", self.background),
            ("red", self.red),
            ("green", self.green),
            ("blink", self.blink),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LampConfig {
    #[serde(
        default = "default_blink_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub blink_interval: Duration,
    #[serde(default)]
    pub touch_mapping: TouchMappingSetting,
    #[serde(default)]
    pub pause_policy: PausePolicySetting,
    #[serde(default)]
    pub min_shader_model: ShaderModelSetting,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub palette: PaletteSettings,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            blink_interval: DEFAULT_BLINK_INTERVAL,
            touch_mapping: TouchMappingSetting::default(),
            pause_policy: PausePolicySetting::default(),
            min_shader_model: ShaderModelSetting::default(),
            window: WindowSettings::default(),
            palette: PaletteSettings::default(),
        }
    }
}

fn default_blink_interval() -> Duration {
    DEFAULT_BLINK_INTERVAL
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
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
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map_err(|err| E::custom(format!("invalid duration {v}ms: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl LampConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LampConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` when given, otherwise returns the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blink_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "blink_interval must be greater than zero".into(),
            ));
        }
        if self.blink_interval < MIN_BLINK_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "blink_interval must be at least 1ms, got {:?}",
                self.blink_interval
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        for (name, color) in self.palette.entries() {
            if color
                .iter()
                .any(|component| !(0.0..=1.0).contains(component))
            {
                return Err(ConfigError::Invalid(format!(
                    "palette.{name} components must be within 0.0..=1.0, got {color:?}"
                )));
            }
        }

        Ok(())
    }
}
