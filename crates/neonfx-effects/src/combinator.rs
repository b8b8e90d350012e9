#![forbid(unsafe_code)]

//! Several effects on one target behind a single handle.
//!
//! [`EffectsConfig`] is sparse: only the keys that are present get built.
//! Passthroughs for an unconfigured effect return `false` and leave the
//! element untouched.
//!
//! # Invariants
//! - The whole config is validated before anything touches the element, so
//!   an invalid config leaves no classes or attachments behind.
//! - If a later sub-effect fails to build, the ones built before it are torn
//!   down before the error is returned.
//! - [`CombinedEffect::destroy`] runs every sub-teardown even when some fail,
//!   and a second call is a no-op.

use std::fmt;
use std::time::Duration;

use neonfx_render::{EffectKind, Element, Surface, WeakElement};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, FxError, TeardownError, finish_validation};
use crate::flicker::{FlickerOptions, FlickerSequencer};
use crate::glitch::{GlitchEffect, GlitchOptions};
use crate::rain::{RainOptions, RainRenderer};
use crate::runtime::Runtime;
use crate::scanlines::{ScanLineOptions, ScanLines};
use crate::settings::{FxSettings, REDUCED_MOTION_FRAME_DELAY};
use crate::styles::RAIN_CLASS;

/// Rain renderer as hosted by a [`CombinedEffect`].
pub type BoxedRain = RainRenderer<Box<dyn Surface>>;

// ---------------------------------------------------------------------------
// EffectsConfig
// ---------------------------------------------------------------------------

/// Which effects to build, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub glitch: Option<GlitchOptions>,
    pub neon_flicker: Option<FlickerOptions>,
    pub scan_lines: Option<ScanLineOptions>,
    pub rain: Option<RainOptions>,
    /// Start scan lines and rain right after construction.
    pub autostart: bool,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            glitch: None,
            neon_flicker: None,
            scan_lines: None,
            rain: None,
            autostart: true,
        }
    }
}

impl EffectsConfig {
    /// True when no effect is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glitch.is_none()
            && self.neon_flicker.is_none()
            && self.scan_lines.is_none()
            && self.rain.is_none()
    }

    /// Kinds this config would build, in construction order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EffectKind> {
        let mut kinds = Vec::with_capacity(4);
        if self.glitch.is_some() {
            kinds.push(EffectKind::Glitch);
        }
        if self.neon_flicker.is_some() {
            kinds.push(EffectKind::Flicker);
        }
        if self.scan_lines.is_some() {
            kinds.push(EffectKind::ScanLines);
        }
        if self.rain.is_some() {
            kinds.push(EffectKind::Rain);
        }
        kinds
    }

    /// Validate every present section and return all violations together.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if let Some(Err(mut e)) = self.glitch.as_ref().map(GlitchOptions::validate) {
            errors.append(&mut e);
        }
        if let Some(Err(mut e)) = self.neon_flicker.as_ref().map(FlickerOptions::validate) {
            errors.append(&mut e);
        }
        if let Some(Err(mut e)) = self.scan_lines.as_ref().map(ScanLineOptions::validate) {
            errors.append(&mut e);
        }
        if let Some(Err(mut e)) = self.rain.as_ref().map(RainOptions::validate) {
            errors.append(&mut e);
        }
        finish_validation(errors)
    }

    /// Fold process settings into this config.
    ///
    /// Disabled settings empty the config. Reduced motion turns off the
    /// random modes and scrolling and slows rain to at least
    /// [`REDUCED_MOTION_FRAME_DELAY`]. A base seed fills in every seed the
    /// config leaves unset, distinct per effect.
    pub fn apply_settings(&mut self, settings: &FxSettings) {
        if !settings.enabled {
            *self = Self {
                autostart: self.autostart,
                ..Self::default()
            };
            return;
        }

        if let Some(glitch) = self.glitch.as_mut() {
            if let Some(intensity) = settings.intensity {
                glitch.intensity = intensity;
            }
            if settings.reduced_motion {
                glitch.random_trigger = false;
            }
            glitch.seed = glitch.seed.or(settings.derived_seed(0));
        }
        if let Some(flicker) = self.neon_flicker.as_mut() {
            if settings.reduced_motion {
                flicker.random_flicker = false;
            }
            flicker.seed = flicker.seed.or(settings.derived_seed(1));
        }
        if let Some(scan) = self.scan_lines.as_mut()
            && settings.reduced_motion
        {
            scan.scroll_speed = 0.0;
        }
        if let Some(rain) = self.rain.as_mut() {
            if settings.reduced_motion {
                rain.frame_delay = rain.frame_delay.max(REDUCED_MOTION_FRAME_DELAY);
            }
            rain.seed = rain.seed.or(settings.derived_seed(3));
        }
    }

    /// Copy with settings applied.
    #[must_use]
    pub fn with_settings(mut self, settings: &FxSettings) -> Self {
        self.apply_settings(settings);
        self
    }
}

// ---------------------------------------------------------------------------
// CombinedEffect
// ---------------------------------------------------------------------------

/// Handle over every effect built from one [`EffectsConfig`].
pub struct CombinedEffect {
    target: WeakElement,
    glitch: Option<GlitchEffect>,
    flicker: Option<FlickerSequencer>,
    scan_lines: Option<ScanLines>,
    rain: Option<BoxedRain>,
    destroyed: bool,
}

impl fmt::Debug for CombinedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedEffect")
            .field("glitch", &self.glitch.is_some())
            .field("flicker", &self.flicker.is_some())
            .field("scan_lines", &self.scan_lines.is_some())
            .field("rain", &self.rain.is_some())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl CombinedEffect {
    /// Build the configured element effects. Fails with
    /// [`FxError::MissingSurface`] if the config asks for rain.
    pub fn create(
        runtime: &Runtime,
        element: &Element,
        config: EffectsConfig,
    ) -> Result<Self, FxError> {
        Self::build(runtime, element, None, config)
    }

    /// Like [`create`](Self::create), with a surface for rain.
    pub fn create_with_surface(
        runtime: &Runtime,
        element: &Element,
        surface: Box<dyn Surface>,
        config: EffectsConfig,
    ) -> Result<Self, FxError> {
        Self::build(runtime, element, Some(surface), config)
    }

    fn build(
        runtime: &Runtime,
        element: &Element,
        surface: Option<Box<dyn Surface>>,
        config: EffectsConfig,
    ) -> Result<Self, FxError> {
        config.validate()?;
        if config.rain.is_some() && surface.is_none() {
            return Err(FxError::MissingSurface);
        }

        // Dropping `combined` on an early return destroys what was built.
        let mut combined = Self {
            target: element.downgrade(),
            glitch: None,
            flicker: None,
            scan_lines: None,
            rain: None,
            destroyed: false,
        };
        if let Some(options) = config.glitch {
            combined.glitch = Some(GlitchEffect::create(runtime, element, options)?);
        }
        if let Some(options) = config.neon_flicker {
            combined.flicker = Some(FlickerSequencer::create(runtime, element, options)?);
        }
        if let Some(options) = config.scan_lines {
            combined.scan_lines = Some(ScanLines::create(runtime, element, options)?);
        }
        if let (Some(options), Some(surface)) = (config.rain, surface) {
            let renderer = RainRenderer::create(runtime, surface, options)?;
            if !element.try_attach(EffectKind::Rain) {
                return Err(FxError::AlreadyAttached(EffectKind::Rain));
            }
            element.add_class(RAIN_CLASS);
            combined.rain = Some(renderer);
        }

        if config.autostart {
            combined.start_scan_lines();
            combined.start_rain();
        }
        debug!(
            element = %element.label(),
            glitch = combined.glitch.is_some(),
            flicker = combined.flicker.is_some(),
            scan_lines = combined.scan_lines.is_some(),
            rain = combined.rain.is_some(),
            "combined effect created"
        );
        Ok(combined)
    }

    /// Play one glitch burst.
    pub fn trigger_glitch(&self) -> bool {
        self.glitch.as_ref().is_some_and(GlitchEffect::trigger)
    }

    /// Play one flicker sequence.
    pub fn flicker_neon(&self, duration: Option<Duration>) -> bool {
        self.flicker.as_ref().is_some_and(|f| f.flicker(duration))
    }

    pub fn stop_flicker(&self) -> bool {
        self.flicker.as_ref().is_some_and(FlickerSequencer::stop)
    }

    pub fn start_scan_lines(&mut self) -> bool {
        self.scan_lines.as_mut().is_some_and(ScanLines::start)
    }

    pub fn stop_scan_lines(&mut self) -> bool {
        self.scan_lines.as_mut().is_some_and(ScanLines::stop)
    }

    pub fn start_rain(&mut self) -> bool {
        self.rain.as_mut().is_some_and(RainRenderer::start)
    }

    pub fn stop_rain(&mut self) -> bool {
        self.rain.as_mut().is_some_and(RainRenderer::stop)
    }

    #[must_use]
    pub fn glitch(&self) -> Option<&GlitchEffect> {
        self.glitch.as_ref()
    }

    #[must_use]
    pub fn flicker(&self) -> Option<&FlickerSequencer> {
        self.flicker.as_ref()
    }

    #[must_use]
    pub fn scan_lines(&self) -> Option<&ScanLines> {
        self.scan_lines.as_ref()
    }

    #[must_use]
    pub fn rain(&self) -> Option<&BoxedRain> {
        self.rain.as_ref()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear down every sub-effect. Failures are collected, not short-circuited.
    pub fn destroy(&mut self) -> Result<(), TeardownError> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        let mut failures = Vec::new();
        if let Some(glitch) = self.glitch.as_mut()
            && let Err(err) = glitch.destroy()
        {
            failures.push((EffectKind::Glitch, err));
        }
        if let Some(flicker) = self.flicker.as_mut()
            && let Err(err) = flicker.destroy()
        {
            failures.push((EffectKind::Flicker, err));
        }
        if let Some(scan) = self.scan_lines.as_mut()
            && let Err(err) = scan.destroy()
        {
            failures.push((EffectKind::ScanLines, err));
        }
        if let Some(rain) = self.rain.as_mut() {
            if let Err(err) = rain.destroy() {
                failures.push((EffectKind::Rain, err));
            }
            match self.target.upgrade() {
                Some(element) => {
                    element.remove_class(RAIN_CLASS);
                    element.detach(EffectKind::Rain);
                }
                None => failures.push((EffectKind::Rain, FxError::TargetReleased(EffectKind::Rain))),
            }
        }

        if failures.is_empty() {
            debug!("combined effect destroyed");
            return Ok(());
        }
        for (kind, err) in &failures {
            warn!(effect = %kind, error = %err, "effect teardown failed");
        }
        Err(TeardownError { failures })
    }
}

impl Drop for CombinedEffect {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glitch::GlitchIntensity;
    use neonfx_render::{CellSurface, EffectKinds};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn full_config() -> EffectsConfig {
        EffectsConfig {
            glitch: Some(GlitchOptions::default()),
            neon_flicker: Some(FlickerOptions::default()),
            scan_lines: Some(ScanLineOptions::default()),
            rain: Some(RainOptions::default()),
            autostart: true,
        }
    }

    #[test]
    fn unconfigured_passthroughs_are_noops() {
        let runtime = Runtime::new();
        let element = Element::new("title");
        let config = EffectsConfig {
            glitch: Some(GlitchOptions::default()),
            ..EffectsConfig::default()
        };
        let mut fx = CombinedEffect::create(&runtime, &element, config).unwrap();
        let before = element.snapshot();
        assert!(!fx.flicker_neon(None));
        assert!(!fx.stop_flicker());
        assert!(!fx.start_scan_lines());
        assert!(!fx.start_rain());
        assert_eq!(element.snapshot(), before);
        assert!(fx.trigger_glitch());
    }

    #[test]
    fn full_config_attaches_every_kind_and_tears_down() {
        let runtime = Runtime::with_seed(3);
        let element = Element::new("screen");
        let surface = Box::new(CellSurface::new(20, 10, 8.0, 16.0));
        let mut fx = CombinedEffect::create_with_surface(&runtime, &element, surface, full_config())
            .unwrap();
        assert_eq!(element.attached(), EffectKinds::all());
        assert!(fx.scan_lines().is_some_and(ScanLines::is_running));
        assert!(fx.rain().is_some_and(RainRenderer::is_running));

        fx.trigger_glitch();
        fx.flicker_neon(None);
        runtime.run_for(ms(100), ms(16));
        assert_eq!(fx.destroy(), Ok(()));
        assert_eq!(fx.destroy(), Ok(()));
        assert!(element.attached().is_empty());
        assert!(element.snapshot().classes.is_empty());
        assert_eq!(runtime.pending_callbacks(), 0);
    }

    #[test]
    fn rain_without_surface_is_rejected() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let result = CombinedEffect::create(&runtime, &element, full_config());
        assert_eq!(result.err(), Some(FxError::MissingSurface));
        assert!(element.attached().is_empty());
    }

    #[test]
    fn invalid_config_reports_every_section() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let mut config = full_config();
        if let Some(g) = config.glitch.as_mut() {
            g.duration = Duration::ZERO;
        }
        if let Some(r) = config.rain.as_mut() {
            r.density = 2.0;
        }
        let surface = Box::new(CellSurface::new(4, 4, 8.0, 8.0));
        match CombinedEffect::create_with_surface(&runtime, &element, surface, config) {
            Err(FxError::InvalidConfig(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, ["glitch.duration", "rain.density"]);
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        assert!(element.attached().is_empty());
    }

    #[test]
    fn partial_failure_unwinds_built_effects() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let _existing = ScanLines::create(&runtime, &element, ScanLineOptions::default()).unwrap();
        let config = EffectsConfig {
            glitch: Some(GlitchOptions::default()),
            scan_lines: Some(ScanLineOptions::default()),
            ..EffectsConfig::default()
        };
        let result = CombinedEffect::create(&runtime, &element, config);
        assert_eq!(result.err(), Some(FxError::AlreadyAttached(EffectKind::ScanLines)));
        assert_eq!(element.attached(), EffectKinds::SCAN_LINES);
        assert!(!element.has_class(crate::styles::GLITCH_CLASS));
    }

    #[test]
    fn teardown_after_target_drop_collects_failures() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let config = EffectsConfig {
            glitch: Some(GlitchOptions::default()),
            neon_flicker: Some(FlickerOptions::default()),
            ..EffectsConfig::default()
        };
        let mut fx = CombinedEffect::create(&runtime, &element, config).unwrap();
        drop(element);
        let err = fx.destroy().unwrap_err();
        let kinds: Vec<_> = err.failures.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, [EffectKind::Glitch, EffectKind::Flicker]);
        assert_eq!(fx.destroy(), Ok(()));
    }

    #[test]
    fn settings_disable_and_reduce_motion() {
        let mut config = full_config();
        if let Some(glitch) = config.glitch.as_mut() {
            glitch.random_trigger = true;
        }
        let reduced = FxSettings {
            reduced_motion: true,
            seed: Some(11),
            intensity: Some(GlitchIntensity::Subtle),
            ..FxSettings::default()
        };
        let applied = config.clone().with_settings(&reduced);
        let glitch = applied.glitch.as_ref().unwrap();
        assert!(!glitch.random_trigger);
        assert_eq!(glitch.intensity, GlitchIntensity::Subtle);
        assert!(glitch.seed.is_some());
        assert_ne!(glitch.seed, applied.neon_flicker.as_ref().unwrap().seed);
        assert_eq!(applied.scan_lines.as_ref().unwrap().scroll_speed, 0.0);
        assert_eq!(applied.rain.as_ref().unwrap().frame_delay, ms(120));

        let disabled = FxSettings {
            enabled: false,
            ..FxSettings::default()
        };
        assert!(config.with_settings(&disabled).is_empty());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = full_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: EffectsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        let sparse: EffectsConfig = serde_json::from_str(r#"{"glitch":{}}"#).unwrap();
        assert_eq!(sparse.kinds(), [EffectKind::Glitch]);
        assert!(sparse.autostart);
    }
}
