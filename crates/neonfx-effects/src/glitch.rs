#![forbid(unsafe_code)]

//! Glitch bursts.
//!
//! [`GlitchEffect::trigger`] overrides an element's transform, blur, and
//! shadows with the [`GLITCH_KEYFRAMES`] table, scaled by the configured
//! [`GlitchIntensity`], then restores the values it captured before the
//! burst. In continuous mode a [`RandomRepeat`] fires the trigger at uniform
//! random delays inside `[min_interval, max_interval]`.
//!
//! # Invariants
//!
//! 1. At most one burst is in flight. `trigger()` while active is a no-op.
//! 2. After a burst completes the element's offset, skew, blur, and shadows
//!    equal the snapshot taken when the burst started.
//! 3. `destroy()` cancels the repeater and any in-flight burst, restores the
//!    snapshot if a burst was active, and is idempotent.
//!
//! Only the fields the burst writes are restored, so concurrent effects that
//! own opacity or brightness are left alone.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use neonfx_core::{RandomRepeat, StepSequence};
use neonfx_render::{EffectKind, Element, PackedRgba, Shadow, VisualProps, WeakElement};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ConfigError, FxError, finish_validation};
use crate::runtime::Runtime;
use crate::styles::{self, GLITCH_CLASS};

/// Color of the left half of the split shadow.
const SPLIT_RED: PackedRgba = PackedRgba::rgb(0xFF, 0x00, 0x3C);
/// Color of the right half of the split shadow.
const SPLIT_CYAN: PackedRgba = PackedRgba::rgb(0x00, 0xFF, 0xF9);

// ---------------------------------------------------------------------------
// Intensity
// ---------------------------------------------------------------------------

/// Named glitch strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlitchIntensity {
    Subtle,
    #[default]
    Medium,
    Intense,
}

/// Pixel offset, blur radius, and skew for one intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitchParams {
    pub offset_px: f32,
    pub blur_px: f32,
    pub skew_deg: f32,
}

impl GlitchIntensity {
    pub const ALL: [GlitchIntensity; 3] = [Self::Subtle, Self::Medium, Self::Intense];

    #[must_use]
    pub const fn params(self) -> GlitchParams {
        match self {
            Self::Subtle => GlitchParams {
                offset_px: 2.0,
                blur_px: 0.5,
                skew_deg: 1.0,
            },
            Self::Medium => GlitchParams {
                offset_px: 5.0,
                blur_px: 1.0,
                skew_deg: 3.0,
            },
            Self::Intense => GlitchParams {
                offset_px: 10.0,
                blur_px: 2.0,
                skew_deg: 6.0,
            },
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subtle => "subtle",
            Self::Medium => "medium",
            Self::Intense => "intense",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "subtle" | "low" => Some(Self::Subtle),
            "medium" | "normal" => Some(Self::Medium),
            "intense" | "high" => Some(Self::Intense),
            _ => None,
        }
    }
}

impl fmt::Display for GlitchIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlitchIntensity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| ConfigError::new("glitch.intensity", s, "expected subtle|medium|intense"))
    }
}

// ---------------------------------------------------------------------------
// Keyframes
// ---------------------------------------------------------------------------

/// One burst keyframe, as multiples of the intensity parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitchFrame {
    pub dx: f32,
    pub dy: f32,
    pub skew: f32,
    pub blur: f32,
    /// Horizontal distance of the two split shadows, in offsets.
    pub split: f32,
}

/// Burst displacement table. Alternates direction and ends at identity.
pub const GLITCH_KEYFRAMES: [GlitchFrame; 5] = [
    GlitchFrame {
        dx: -1.0,
        dy: 0.4,
        skew: 1.0,
        blur: 1.0,
        split: 1.0,
    },
    GlitchFrame {
        dx: 1.0,
        dy: -0.4,
        skew: -1.0,
        blur: 0.5,
        split: -1.0,
    },
    GlitchFrame {
        dx: -0.6,
        dy: -0.2,
        skew: 0.5,
        blur: 1.0,
        split: 0.6,
    },
    GlitchFrame {
        dx: 0.6,
        dy: 0.2,
        skew: -0.5,
        blur: 0.5,
        split: -0.6,
    },
    GlitchFrame {
        dx: 0.0,
        dy: 0.0,
        skew: 0.0,
        blur: 0.0,
        split: 0.0,
    },
];

fn apply_keyframe(props: &mut VisualProps, base: &GlitchBase, frame: &GlitchFrame, p: GlitchParams) {
    props.offset_x = base.offset_x + frame.dx * p.offset_px;
    props.offset_y = base.offset_y + frame.dy * p.offset_px;
    props.skew_deg = base.skew_deg + frame.skew * p.skew_deg;
    props.blur_px = base.blur_px + frame.blur * p.blur_px;
    props.shadows.clone_from(&base.shadows);
    if frame.split != 0.0 {
        let split = frame.split * p.offset_px;
        props.shadows.push(Shadow::new(-split, 0.0, 0.0, SPLIT_RED));
        props.shadows.push(Shadow::new(split, 0.0, 0.0, SPLIT_CYAN));
    }
}

/// The fields a burst overrides, captured before it starts.
#[derive(Debug, Clone, PartialEq)]
struct GlitchBase {
    offset_x: f32,
    offset_y: f32,
    skew_deg: f32,
    blur_px: f32,
    shadows: Vec<Shadow>,
}

impl GlitchBase {
    fn capture(props: &VisualProps) -> Self {
        Self {
            offset_x: props.offset_x,
            offset_y: props.offset_y,
            skew_deg: props.skew_deg,
            blur_px: props.blur_px,
            shadows: props.shadows.clone(),
        }
    }

    fn restore(&self, props: &mut VisualProps) {
        props.offset_x = self.offset_x;
        props.offset_y = self.offset_y;
        props.skew_deg = self.skew_deg;
        props.blur_px = self.blur_px;
        props.shadows.clone_from(&self.shadows);
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Glitch tuning. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchOptions {
    pub intensity: GlitchIntensity,
    /// Length of one burst.
    #[serde(with = "crate::millis")]
    pub duration: Duration,
    /// Fire bursts on their own at random intervals.
    pub random_trigger: bool,
    #[serde(with = "crate::millis")]
    pub min_interval: Duration,
    #[serde(with = "crate::millis")]
    pub max_interval: Duration,
    pub seed: Option<u64>,
}

impl Default for GlitchOptions {
    fn default() -> Self {
        Self {
            intensity: GlitchIntensity::Medium,
            duration: Duration::from_millis(200),
            random_trigger: false,
            min_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(6),
            seed: None,
        }
    }
}

impl GlitchOptions {
    /// Validate constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.duration.is_zero() {
            errors.push(ConfigError::new("glitch.duration", "0ms", "must be > 0"));
        }
        if self.max_interval < self.min_interval {
            errors.push(ConfigError::new(
                "glitch.max_interval",
                format!("{}ms", self.max_interval.as_millis()),
                "must be >= min_interval",
            ));
        }
        if self.random_trigger && self.min_interval < self.duration {
            errors.push(ConfigError::new(
                "glitch.min_interval",
                format!("{}ms", self.min_interval.as_millis()),
                "must be >= duration when random_trigger is set",
            ));
        }
        finish_validation(errors)
    }
}

// ---------------------------------------------------------------------------
// GlitchEffect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlitchState {
    Idle,
    Active,
    Destroyed,
}

struct GlitchInner {
    runtime: Runtime,
    target: WeakElement,
    options: GlitchOptions,
    state: GlitchState,
    base: Option<GlitchBase>,
    burst: Option<StepSequence>,
    repeat: Option<RandomRepeat>,
    bursts: u64,
}

/// Glitch effect attached to one element.
pub struct GlitchEffect {
    inner: Rc<RefCell<GlitchInner>>,
}

impl fmt::Debug for GlitchEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("GlitchEffect")
            .field("state", &inner.state)
            .field("intensity", &inner.options.intensity)
            .field("bursts", &inner.bursts)
            .finish()
    }
}

impl GlitchEffect {
    /// Attach to `element`. Arms the repeater when `random_trigger` is set.
    pub fn create(
        runtime: &Runtime,
        element: &Element,
        options: GlitchOptions,
    ) -> Result<Self, FxError> {
        options.validate()?;
        if !element.try_attach(EffectKind::Glitch) {
            return Err(FxError::AlreadyAttached(EffectKind::Glitch));
        }
        styles::ensure_base_styles(runtime.styles());
        element.add_class(GLITCH_CLASS);

        let repeat = options.random_trigger.then(|| {
            RandomRepeat::new(
                runtime.timers(),
                options.min_interval,
                options.max_interval,
                runtime.rng_for(options.seed),
            )
        });
        debug!(
            element = %element.label(),
            intensity = %options.intensity,
            random = options.random_trigger,
            "glitch effect created"
        );

        let inner = Rc::new(RefCell::new(GlitchInner {
            runtime: runtime.clone(),
            target: element.downgrade(),
            options,
            state: GlitchState::Idle,
            base: None,
            burst: None,
            repeat: None,
            bursts: 0,
        }));

        if let Some(repeat) = repeat {
            let weak = Rc::downgrade(&inner);
            repeat.start(move |_| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !Self::release_if_orphaned(&inner) {
                    Self::trigger_inner(&inner);
                }
            });
            inner.borrow_mut().repeat = Some(repeat);
        }
        Ok(Self { inner })
    }

    /// Stop the repeater once the element is gone so nothing stays scheduled
    /// for a target that no longer exists.
    fn release_if_orphaned(inner: &Rc<RefCell<GlitchInner>>) -> bool {
        let guard = inner.borrow();
        if !guard.target.is_released() {
            return false;
        }
        if let Some(repeat) = guard.repeat.as_ref() {
            repeat.stop();
        }
        debug!("glitch repeater stopped: target released");
        true
    }

    /// Play one burst. Returns `false` if a burst is already in flight, the
    /// effect was destroyed, or the element is gone.
    pub fn trigger(&self) -> bool {
        Self::trigger_inner(&self.inner)
    }

    fn trigger_inner(inner: &Rc<RefCell<GlitchInner>>) -> bool {
        let (timers, element, base, params, interval) = {
            let mut guard = inner.borrow_mut();
            if guard.state != GlitchState::Idle {
                trace!(state = ?guard.state, "glitch trigger ignored");
                return false;
            }
            let Some(element) = guard.target.upgrade() else {
                trace!("glitch trigger ignored: target released");
                return false;
            };
            let base = element.inspect(GlitchBase::capture);
            guard.base = Some(base.clone());
            guard.state = GlitchState::Active;
            guard.bursts += 1;
            let frames = GLITCH_KEYFRAMES.len() as u32;
            (
                guard.runtime.timers().clone(),
                element,
                base,
                guard.options.intensity.params(),
                guard.options.duration / frames,
            )
        };

        let target = element.downgrade();
        let step_target = target.clone();
        let weak = Rc::downgrade(inner);
        let burst = StepSequence::play(
            &timers,
            GLITCH_KEYFRAMES.len(),
            interval,
            move |index| {
                if let Some(element) = step_target.upgrade() {
                    element.update(|props| {
                        apply_keyframe(props, &base, &GLITCH_KEYFRAMES[index], params);
                    });
                }
            },
            move || {
                if let Some(inner) = weak.upgrade() {
                    Self::finish_burst(&inner);
                }
            },
        );
        drop(element);

        let mut guard = inner.borrow_mut();
        if guard.state == GlitchState::Active {
            guard.burst = Some(burst);
        }
        true
    }

    fn finish_burst(inner: &Rc<RefCell<GlitchInner>>) {
        let (base, target, burst) = {
            let mut guard = inner.borrow_mut();
            if guard.state != GlitchState::Active {
                return;
            }
            guard.state = GlitchState::Idle;
            (guard.base.take(), guard.target.clone(), guard.burst.take())
        };
        drop(burst);
        if let (Some(base), Some(element)) = (base, target.upgrade()) {
            element.update(|props| base.restore(props));
        }
        trace!("glitch burst finished");
    }

    /// Stop everything and restore the element. Idempotent.
    ///
    /// Returns [`FxError::TargetReleased`] when the element was dropped
    /// first; timers are released either way.
    pub fn destroy(&mut self) -> Result<(), FxError> {
        let (repeat, burst, base, target) = {
            let mut guard = self.inner.borrow_mut();
            if guard.state == GlitchState::Destroyed {
                return Ok(());
            }
            guard.state = GlitchState::Destroyed;
            (
                guard.repeat.take(),
                guard.burst.take(),
                guard.base.take(),
                guard.target.clone(),
            )
        };
        if let Some(repeat) = repeat {
            repeat.stop();
        }
        if let Some(burst) = burst {
            burst.cancel();
        }

        let Some(element) = target.upgrade() else {
            debug!("glitch destroyed after target release");
            return Err(FxError::TargetReleased(EffectKind::Glitch));
        };
        element.update(|props| {
            if let Some(base) = &base {
                base.restore(props);
            }
            props.classes.remove(GLITCH_CLASS);
        });
        element.detach(EffectKind::Glitch);
        debug!(element = %element.label(), "glitch destroyed");
        Ok(())
    }

    /// Whether a burst is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.borrow().state == GlitchState::Active
    }

    /// Whether continuous mode is armed.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.inner
            .borrow()
            .repeat
            .as_ref()
            .is_some_and(RandomRepeat::is_armed)
    }

    /// Bursts started so far.
    #[must_use]
    pub fn burst_count(&self) -> u64 {
        self.inner.borrow().bursts
    }
}

impl Drop for GlitchEffect {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}
