#![forbid(unsafe_code)]

//! Process-level settings read from the environment.
//!
//! | Variable | Type | Effect |
//! |----------|------|--------|
//! | `NEONFX_ENABLE` | bool | `false` empties every config |
//! | `NEONFX_REDUCED_MOTION` | bool | no random modes, no scrolling, slower rain |
//! | `NEONFX_SEED` | u64 | base seed for effect RNGs |
//! | `NEONFX_PRESET` | name | preset the showcase starts with |
//! | `NEONFX_INTENSITY` | subtle\|medium\|intense | glitch intensity override |
//!
//! Invalid values keep the default and are reported in
//! [`FxSettingsParse::errors`] instead of aborting.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::glitch::GlitchIntensity;
use crate::preset::Preset;

const ENV_ENABLE: &str = "NEONFX_ENABLE";
const ENV_REDUCED_MOTION: &str = "NEONFX_REDUCED_MOTION";
const ENV_SEED: &str = "NEONFX_SEED";
const ENV_PRESET: &str = "NEONFX_PRESET";
const ENV_INTENSITY: &str = "NEONFX_INTENSITY";

/// Slowest rain frame delay allowed under reduced motion.
pub const REDUCED_MOTION_FRAME_DELAY: Duration = Duration::from_millis(120);

/// Environment-derived settings applied on top of any [`EffectsConfig`].
///
/// [`EffectsConfig`]: crate::EffectsConfig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxSettings {
    pub enabled: bool,
    pub reduced_motion: bool,
    pub seed: Option<u64>,
    pub preset: Option<Preset>,
    pub intensity: Option<GlitchIntensity>,
}

impl Default for FxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reduced_motion: false,
            seed: None,
            preset: None,
            intensity: None,
        }
    }
}

/// Settings plus every rejected variable.
#[derive(Debug, Clone)]
pub struct FxSettingsParse {
    pub settings: FxSettings,
    pub errors: Vec<ConfigError>,
}

impl FxSettings {
    /// Parse settings from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().settings
    }

    /// Parse settings from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> FxSettingsParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse settings from an arbitrary variable lookup.
    pub fn from_env_with<F>(mut get: F) -> FxSettingsParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut settings = FxSettings::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_ENABLE) {
            match parse_bool(&value) {
                Some(parsed) => settings.enabled = parsed,
                None => errors.push(ConfigError::new(
                    "enable",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Some(value) = get(ENV_REDUCED_MOTION) {
            match parse_bool(&value) {
                Some(parsed) => settings.reduced_motion = parsed,
                None => errors.push(ConfigError::new(
                    "reduced_motion",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Some(value) = get(ENV_SEED) {
            match value.trim().parse::<u64>() {
                Ok(parsed) => settings.seed = Some(parsed),
                Err(_) => errors.push(ConfigError::new("seed", value, "expected u64")),
            }
        }

        if let Some(value) = get(ENV_PRESET) {
            match Preset::parse(&value) {
                Some(parsed) => settings.preset = Some(parsed),
                None => errors.push(ConfigError::new(
                    "preset",
                    value,
                    "expected terminal|hacker|cyberpunk|matrix",
                )),
            }
        }

        if let Some(value) = get(ENV_INTENSITY) {
            match GlitchIntensity::parse(&value) {
                Some(parsed) => settings.intensity = Some(parsed),
                None => errors.push(ConfigError::new(
                    "intensity",
                    value,
                    "expected subtle|medium|intense",
                )),
            }
        }

        FxSettingsParse { settings, errors }
    }

    /// Seed for the effect at `slot`, derived from the base seed.
    #[must_use]
    pub(crate) fn derived_seed(&self, slot: u64) -> Option<u64> {
        self.seed
            .map(|seed| seed ^ slot.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Short human-readable summary for status lines.
    #[must_use]
    pub fn summary_short(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled = if self.enabled { "on" } else { "off" };
        let motion = if self.reduced_motion { "reduced" } else { "full" };
        write!(f, "NeonFX: {enabled} · motion {motion}")?;
        if let Some(seed) = self.seed {
            write!(f, " · seed {seed}")?;
        }
        if let Some(intensity) = self.intensity {
            write!(f, " · {intensity}")?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(vars: &[(&str, &str)]) -> FxSettingsParse {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FxSettings::from_env_with(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let parsed = parse(&[]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.settings, FxSettings::default());
    }

    #[test]
    fn reads_every_variable() {
        let parsed = parse(&[
            ("NEONFX_ENABLE", "off"),
            ("NEONFX_REDUCED_MOTION", "1"),
            ("NEONFX_SEED", " 42 "),
            ("NEONFX_PRESET", "Cyberpunk"),
            ("NEONFX_INTENSITY", "intense"),
        ]);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let s = parsed.settings;
        assert!(!s.enabled);
        assert!(s.reduced_motion);
        assert_eq!(s.seed, Some(42));
        assert_eq!(s.preset, Some(Preset::Cyberpunk));
        assert_eq!(s.intensity, Some(GlitchIntensity::Intense));
    }

    #[test]
    fn invalid_values_are_reported_and_ignored() {
        let parsed = parse(&[
            ("NEONFX_ENABLE", "maybe"),
            ("NEONFX_SEED", "-1"),
            ("NEONFX_PRESET", "vaporwave"),
        ]);
        let fields: Vec<_> = parsed.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["enable", "seed", "preset"]);
        assert!(parsed.settings.enabled);
        assert_eq!(parsed.settings.seed, None);
    }

    #[test]
    fn derived_seeds_differ_per_slot() {
        let settings = FxSettings {
            seed: Some(7),
            ..FxSettings::default()
        };
        assert_ne!(settings.derived_seed(0), settings.derived_seed(1));
        assert_eq!(FxSettings::default().derived_seed(0), None);
    }

    #[test]
    fn summary_mentions_seed() {
        let settings = FxSettings {
            seed: Some(9),
            reduced_motion: true,
            ..FxSettings::default()
        };
        assert_eq!(settings.summary_short(), "NeonFX: on · motion reduced · seed 9");
    }
}
