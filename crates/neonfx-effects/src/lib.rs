#![forbid(unsafe_code)]

//! NeonFX effects.
//!
//! # Role in NeonFX
//! This crate holds the effects themselves and the pieces that tie them
//! together:
//!
//! - [`rain::RainRenderer`]: throttled "matrix rain" into a [`Surface`].
//! - [`glitch::GlitchEffect`]: short displacement bursts on an [`Element`].
//! - [`flicker::FlickerSequencer`]: opacity/brightness flicker with a
//!   re-entrancy guard.
//! - [`scanlines::ScanLines`]: scrolling scan-line overlay.
//! - [`combinator::CombinedEffect`]: any subset of the above on one target,
//!   torn down by a single call.
//! - [`preset::Preset`]: named, data-only [`EffectsConfig`] bundles.
//!
//! Every effect is driven by a [`Runtime`], which owns the frame clock, the
//! timer queue, the stylesheet registry, and the seed source. Nothing here
//! sleeps or spawns threads; the host advances the runtime.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use neonfx_effects::{CombinedEffect, EffectsConfig, GlitchOptions, Runtime};
//! use neonfx_render::Element;
//!
//! let runtime = Runtime::with_seed(7);
//! let title = Element::new("title");
//! let config = EffectsConfig {
//!     glitch: Some(GlitchOptions::default()),
//!     ..EffectsConfig::default()
//! };
//! let mut fx = CombinedEffect::create(&runtime, &title, config).unwrap();
//! assert!(fx.trigger_glitch());
//! runtime.advance(Duration::from_millis(250));
//! assert!(title.snapshot().is_untransformed());
//! fx.destroy().unwrap();
//! ```
//!
//! [`Surface`]: neonfx_render::Surface
//! [`Element`]: neonfx_render::Element

pub mod combinator;
pub mod error;
pub mod flicker;
pub mod glitch;
mod millis;
pub mod preset;
pub mod rain;
pub mod runtime;
pub mod scanlines;
pub mod settings;
pub mod styles;

pub use combinator::{CombinedEffect, EffectsConfig};
pub use error::{ConfigError, FxError, TeardownError};
pub use flicker::{FLICKER_STEPS, FlickerOptions, FlickerSequencer, FlickerSpeed, FlickerTier};
pub use glitch::{GLITCH_KEYFRAMES, GlitchEffect, GlitchFrame, GlitchIntensity, GlitchOptions, GlitchParams};
pub use preset::{Preset, PresetError};
pub use rain::{Column, FrameOutcome, RainField, RainOptions, RainRenderer, trail_brightness};
pub use runtime::Runtime;
pub use scanlines::{ScanLineOptions, ScanLines};
pub use settings::{FxSettings, FxSettingsParse};
