#![forbid(unsafe_code)]

//! Named [`EffectsConfig`] bundles.
//!
//! Presets are plain data. They go through the same
//! [`EffectsConfig::validate`] as hand-written configs, and custom ones can be
//! loaded from JSON with [`Preset::from_json`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::combinator::EffectsConfig;
use crate::error::ConfigError;
use crate::flicker::{FlickerOptions, FlickerSpeed};
use crate::glitch::{GlitchIntensity, GlitchOptions};
use crate::rain::RainOptions;
use crate::scanlines::ScanLineOptions;

/// Built-in effect bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Static scan lines with a slow, occasional flicker.
    Terminal,
    /// Subtle random glitches over scrolling scan lines.
    Hacker,
    /// Everything on the element, loud.
    Cyberpunk,
    /// Rain with a subtle glitch on the target.
    Matrix,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Self::Terminal, Self::Hacker, Self::Cyberpunk, Self::Matrix];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Hacker => "hacker",
            Self::Cyberpunk => "cyberpunk",
            Self::Matrix => "matrix",
        }
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(value))
    }

    /// Whether the bundle includes rain and therefore needs a surface.
    #[must_use]
    pub fn needs_surface(self) -> bool {
        self.config().rain.is_some()
    }

    /// The bundle's config.
    #[must_use]
    pub fn config(self) -> EffectsConfig {
        match self {
            Self::Terminal => EffectsConfig {
                neon_flicker: Some(FlickerOptions {
                    speed: FlickerSpeed::Slow,
                    random_flicker: true,
                    ..FlickerOptions::default()
                }),
                scan_lines: Some(ScanLineOptions {
                    scroll_speed: 0.0,
                    opacity: 0.1,
                    ..ScanLineOptions::default()
                }),
                ..EffectsConfig::default()
            },
            Self::Hacker => EffectsConfig {
                glitch: Some(GlitchOptions {
                    intensity: GlitchIntensity::Subtle,
                    random_trigger: true,
                    min_interval: Duration::from_secs(3),
                    max_interval: Duration::from_secs(8),
                    ..GlitchOptions::default()
                }),
                scan_lines: Some(ScanLineOptions::default()),
                ..EffectsConfig::default()
            },
            Self::Cyberpunk => EffectsConfig {
                glitch: Some(GlitchOptions {
                    intensity: GlitchIntensity::Intense,
                    random_trigger: true,
                    ..GlitchOptions::default()
                }),
                neon_flicker: Some(FlickerOptions {
                    speed: FlickerSpeed::Fast,
                    random_flicker: true,
                    ..FlickerOptions::default()
                }),
                scan_lines: Some(ScanLineOptions {
                    opacity: 0.2,
                    scroll_speed: 30.0,
                    ..ScanLineOptions::default()
                }),
                ..EffectsConfig::default()
            },
            Self::Matrix => EffectsConfig {
                glitch: Some(GlitchOptions {
                    intensity: GlitchIntensity::Subtle,
                    ..GlitchOptions::default()
                }),
                rain: Some(RainOptions::default()),
                ..EffectsConfig::default()
            },
        }
    }

    /// Pretty JSON for this preset's config.
    pub fn to_json(self) -> Result<String, PresetError> {
        serde_json::to_string_pretty(&self.config()).map_err(PresetError::Json)
    }

    /// Parse and validate a config from JSON. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<EffectsConfig, PresetError> {
        let config: EffectsConfig = serde_json::from_str(json).map_err(PresetError::Json)?;
        config.validate().map_err(PresetError::Invalid)?;
        Ok(config)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            ConfigError::new("preset", s, "expected terminal|hacker|cyberpunk|matrix")
        })
    }
}

/// Failure loading a preset from JSON.
#[derive(Debug)]
pub enum PresetError {
    /// Not valid JSON for an [`EffectsConfig`].
    Json(serde_json::Error),
    /// Parsed, but failed validation.
    Invalid(Vec<ConfigError>),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "preset JSON error: {err}"),
            Self::Invalid(errors) => {
                write!(f, "invalid preset: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PresetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}
