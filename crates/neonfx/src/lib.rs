#![forbid(unsafe_code)]

//! NeonFX public facade crate.
//!
//! Re-exports the types most hosts need from the internal crates and offers
//! a prelude. Hosts own the element and the surface; NeonFX only mutates
//! their visual state while a [`Runtime`] is advanced.
//!
//! ```
//! use std::time::Duration;
//! use neonfx::prelude::*;
//!
//! let runtime = Runtime::with_seed(1);
//! let sign = Element::new("sign");
//! let mut fx = CombinedEffect::create(&runtime, &sign, Preset::Terminal.config())?;
//! fx.flicker_neon(None);
//! runtime.run_for(Duration::from_millis(600), Duration::from_millis(16));
//! fx.destroy()?;
//! # Ok::<(), neonfx::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use neonfx_core::{
    FrameClock, FrameSubscription, FrameTime, FxRng, RandomRepeat, StepSequence, TimerHandle,
    Timers,
};

// --- Render re-exports -----------------------------------------------------

pub use neonfx_render::{
    CellSurface, EffectKind, EffectKinds, Element, PackedRgba, PxRect, ScanLineOverlay, Shadow,
    StylesheetRegistry, Surface, SurfaceCaps, SurfaceCell, SurfaceSize, VisualProps, WeakElement,
};

// --- Effect re-exports -----------------------------------------------------

pub use neonfx_effects::{
    CombinedEffect, ConfigError, EffectsConfig, FlickerOptions, FlickerSequencer, FlickerSpeed,
    FxError, FxSettings, GlitchEffect, GlitchIntensity, GlitchOptions, Preset, PresetError,
    RainOptions, RainRenderer, Runtime, ScanLineOptions, ScanLines, TeardownError,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for NeonFX hosts.
#[derive(Debug)]
pub enum Error {
    /// Effect construction failed.
    Effect(FxError),
    /// One or more effects failed to tear down.
    Teardown(TeardownError),
    /// A preset could not be loaded.
    Preset(PresetError),
    /// I/O failure while reading presets or driving a terminal.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Effect(err) => write!(f, "{err}"),
            Self::Teardown(err) => write!(f, "{err}"),
            Self::Preset(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Effect(err) => Some(err),
            Self::Teardown(err) => Some(err),
            Self::Preset(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<FxError> for Error {
    fn from(err: FxError) -> Self {
        Self::Effect(err)
    }
}

impl From<TeardownError> for Error {
    fn from(err: TeardownError) -> Self {
        Self::Teardown(err)
    }
}

impl From<PresetError> for Error {
    fn from(err: PresetError) -> Self {
        Self::Preset(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for NeonFX hosts.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CellSurface, CombinedEffect, EffectsConfig, Element, Error, FxSettings, PackedRgba,
        Preset, Result, Runtime, Surface,
    };

    pub use crate::{core, effects, render};
}

pub use neonfx_core as core;
pub use neonfx_effects as effects;
pub use neonfx_render as render;
