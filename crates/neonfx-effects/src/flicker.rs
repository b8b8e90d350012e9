#![forbid(unsafe_code)]

//! Neon flicker.
//!
//! A flicker is the [`FLICKER_STEPS`] table of `(opacity, brightness)`
//! multipliers played over the element's current values, spaced evenly over
//! the flicker duration. When the last step has had its share of time the
//! values captured at invocation are written back.
//!
//! # Invariants
//!
//! 1. At most one sequence runs. `flicker()` while flickering returns
//!    `false` and changes nothing.
//! 2. A completed sequence restores the opacity and brightness captured when
//!    it started, not a neutral value, so dimming applied by another effect
//!    survives.
//! 3. `stop()` and `destroy()` cancel the repeater and any sequence, then
//!    force opacity and brightness to `1.0`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use neonfx_core::{RandomRepeat, StepSequence};
use neonfx_render::{EffectKind, Element, WeakElement};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ConfigError, FxError, finish_validation};
use crate::runtime::Runtime;
use crate::styles::{self, FLICKER_CLASS};

/// `(opacity, brightness)` multipliers, in play order.
pub const FLICKER_STEPS: [(f32, f32); 8] = [
    (0.4, 0.6),
    (1.0, 1.2),
    (0.2, 0.4),
    (0.9, 1.1),
    (0.1, 0.3),
    (1.0, 1.25),
    (0.6, 0.8),
    (1.0, 1.0),
];

/// Continuous-mode pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlickerSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

/// Random-interval window and sequence length for one speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlickerTier {
    pub min: Duration,
    pub max: Duration,
    pub duration: Duration,
}

impl FlickerSpeed {
    #[must_use]
    pub const fn tier(self) -> FlickerTier {
        match self {
            Self::Slow => FlickerTier {
                min: Duration::from_secs(4),
                max: Duration::from_secs(8),
                duration: Duration::from_millis(600),
            },
            Self::Normal => FlickerTier {
                min: Duration::from_secs(2),
                max: Duration::from_secs(5),
                duration: Duration::from_millis(400),
            },
            Self::Fast => FlickerTier {
                min: Duration::from_millis(800),
                max: Duration::from_secs(2),
                duration: Duration::from_millis(250),
            },
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for FlickerSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlickerSpeed {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(Self::Slow),
            "normal" => Ok(Self::Normal),
            "fast" => Ok(Self::Fast),
            _ => Err(ConfigError::new("flicker.speed", s, "expected slow|normal|fast")),
        }
    }
}

/// Flicker tuning. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickerOptions {
    pub speed: FlickerSpeed,
    /// Sequence length. `None` uses the speed tier's duration.
    #[serde(with = "crate::millis::option")]
    pub duration: Option<Duration>,
    /// Flicker on its own at the tier's random intervals.
    pub random_flicker: bool,
    pub seed: Option<u64>,
}

impl Default for FlickerOptions {
    fn default() -> Self {
        Self {
            speed: FlickerSpeed::Normal,
            duration: None,
            random_flicker: false,
            seed: None,
        }
    }
}

impl FlickerOptions {
    /// Validate constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.duration.is_some_and(|d| d.is_zero()) {
            errors.push(ConfigError::new("flicker.duration", "0ms", "must be > 0"));
        }
        finish_validation(errors)
    }

    /// Sequence length used when `flicker()` gets no explicit duration.
    #[must_use]
    pub fn effective_duration(&self) -> Duration {
        self.duration.unwrap_or(self.speed.tier().duration)
    }
}

// ---------------------------------------------------------------------------
// FlickerSequencer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlickerState {
    Idle,
    Flickering,
    Destroyed,
}

struct FlickerInner {
    runtime: Runtime,
    target: WeakElement,
    options: FlickerOptions,
    state: FlickerState,
    sequence: Option<StepSequence>,
    repeat: Option<RandomRepeat>,
    runs: u64,
}

/// Flicker effect attached to one element.
pub struct FlickerSequencer {
    inner: Rc<RefCell<FlickerInner>>,
}

impl fmt::Debug for FlickerSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FlickerSequencer")
            .field("state", &inner.state)
            .field("speed", &inner.options.speed)
            .field("runs", &inner.runs)
            .finish()
    }
}

impl FlickerSequencer {
    /// Attach to `element`. Arms the repeater when `random_flicker` is set.
    pub fn create(
        runtime: &Runtime,
        element: &Element,
        options: FlickerOptions,
    ) -> Result<Self, FxError> {
        options.validate()?;
        if !element.try_attach(EffectKind::Flicker) {
            return Err(FxError::AlreadyAttached(EffectKind::Flicker));
        }
        styles::ensure_base_styles(runtime.styles());
        element.add_class(FLICKER_CLASS);

        let tier = options.speed.tier();
        let repeat = options
            .random_flicker
            .then(|| RandomRepeat::new(runtime.timers(), tier.min, tier.max, runtime.rng_for(options.seed)));
        debug!(
            element = %element.label(),
            speed = %options.speed,
            random = options.random_flicker,
            "flicker effect created"
        );

        let inner = Rc::new(RefCell::new(FlickerInner {
            runtime: runtime.clone(),
            target: element.downgrade(),
            options,
            state: FlickerState::Idle,
            sequence: None,
            repeat: None,
            runs: 0,
        }));

        if let Some(repeat) = repeat {
            let weak = Rc::downgrade(&inner);
            repeat.start(move |_| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !Self::release_if_orphaned(&inner) {
                    Self::flicker_inner(&inner, None);
                }
            });
            inner.borrow_mut().repeat = Some(repeat);
        }
        Ok(Self { inner })
    }

    fn release_if_orphaned(inner: &Rc<RefCell<FlickerInner>>) -> bool {
        let guard = inner.borrow();
        if !guard.target.is_released() {
            return false;
        }
        if let Some(repeat) = guard.repeat.as_ref() {
            repeat.stop();
        }
        debug!("flicker repeater stopped: target released");
        true
    }

    /// Play one sequence lasting `duration` (or the configured default).
    ///
    /// Returns `false` without touching the element if a sequence is already
    /// running or the effect was destroyed.
    pub fn flicker(&self, duration: Option<Duration>) -> bool {
        Self::flicker_inner(&self.inner, duration)
    }

    fn flicker_inner(inner: &Rc<RefCell<FlickerInner>>, duration: Option<Duration>) -> bool {
        let (timers, target, original, interval) = {
            let mut guard = inner.borrow_mut();
            if guard.state != FlickerState::Idle {
                trace!(state = ?guard.state, "flicker ignored");
                return false;
            }
            let Some(element) = guard.target.upgrade() else {
                trace!("flicker ignored: target released");
                return false;
            };
            let total = duration
                .filter(|d| !d.is_zero())
                .unwrap_or_else(|| guard.options.effective_duration());
            guard.state = FlickerState::Flickering;
            guard.runs += 1;
            (
                guard.runtime.timers().clone(),
                guard.target.clone(),
                element.inspect(|p| (p.opacity, p.brightness)),
                total / FLICKER_STEPS.len() as u32,
            )
        };

        let step_target = target.clone();
        let weak = Rc::downgrade(inner);
        let sequence = StepSequence::play(
            &timers,
            FLICKER_STEPS.len(),
            interval,
            move |index| {
                let (opacity, brightness) = FLICKER_STEPS[index];
                if let Some(element) = step_target.upgrade() {
                    element.update(|props| {
                        props.opacity = (original.0 * opacity).clamp(0.0, 1.0);
                        props.brightness = original.1 * brightness;
                    });
                }
            },
            move || {
                if let Some(element) = target.upgrade() {
                    element.update(|props| {
                        props.opacity = original.0;
                        props.brightness = original.1;
                    });
                }
                if let Some(inner) = weak.upgrade() {
                    let finished = {
                        let mut guard = inner.borrow_mut();
                        if guard.state == FlickerState::Flickering {
                            guard.state = FlickerState::Idle;
                        }
                        guard.sequence.take()
                    };
                    drop(finished);
                }
                trace!("flicker finished");
            },
        );

        let mut guard = inner.borrow_mut();
        if guard.state == FlickerState::Flickering {
            guard.sequence = Some(sequence);
        }
        true
    }

    /// Cancel continuous mode and any running sequence, then reset opacity
    /// and brightness to `1.0`. Returns `true` if anything was running.
    pub fn stop(&self) -> bool {
        let (was_running, repeat, sequence, target) = {
            let mut guard = self.inner.borrow_mut();
            if guard.state == FlickerState::Destroyed {
                return false;
            }
            let was_running = guard.state == FlickerState::Flickering
                || guard.repeat.as_ref().is_some_and(RandomRepeat::is_armed);
            guard.state = FlickerState::Idle;
            (
                was_running,
                guard.repeat.take(),
                guard.sequence.take(),
                guard.target.clone(),
            )
        };
        if let Some(repeat) = repeat {
            repeat.stop();
        }
        if let Some(sequence) = sequence {
            sequence.cancel();
        }
        if let Some(element) = target.upgrade() {
            element.update(|props| {
                props.opacity = 1.0;
                props.brightness = 1.0;
            });
        }
        if was_running {
            debug!("flicker stopped");
        }
        was_running
    }

    /// Stop, reset, and detach. Idempotent.
    ///
    /// Returns [`FxError::TargetReleased`] when the element was dropped
    /// first; timers are released either way.
    pub fn destroy(&mut self) -> Result<(), FxError> {
        if self.inner.borrow().state == FlickerState::Destroyed {
            return Ok(());
        }
        self.stop();
        let target = {
            let mut guard = self.inner.borrow_mut();
            guard.state = FlickerState::Destroyed;
            guard.target.clone()
        };
        let Some(element) = target.upgrade() else {
            debug!("flicker destroyed after target release");
            return Err(FxError::TargetReleased(EffectKind::Flicker));
        };
        element.remove_class(FLICKER_CLASS);
        element.detach(EffectKind::Flicker);
        debug!(element = %element.label(), "flicker destroyed");
        Ok(())
    }

    #[must_use]
    pub fn is_flickering(&self) -> bool {
        self.inner.borrow().state == FlickerState::Flickering
    }

    /// Sequences started so far.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.inner.borrow().runs
    }
}

impl Drop for FlickerSequencer {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}
