#![forbid(unsafe_code)]

//! Scrolling scan-line overlay.
//!
//! While running, the element carries the `neonfx-scanlines` class and a
//! [`ScanLineOverlay`] whose offset advances `scroll_speed` pixels per second,
//! wrapping at `spacing`. A zero speed gives static lines with no frame
//! subscription at all. The subscription cancels itself on the first frame
//! after the element is dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use neonfx_core::FrameSubscription;
use neonfx_render::{EffectKind, Element, PackedRgba, ScanLineOverlay, WeakElement};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, FxError, finish_validation};
use crate::runtime::Runtime;
use crate::styles::{self, SCANLINES_CLASS};

/// Scan-line tuning. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLineOptions {
    /// Pixels between lines.
    pub spacing: f32,
    pub opacity: f32,
    /// Pixels per second. Zero disables scrolling.
    pub scroll_speed: f32,
    pub color: PackedRgba,
}

impl Default for ScanLineOptions {
    fn default() -> Self {
        Self {
            spacing: 3.0,
            opacity: 0.15,
            scroll_speed: 20.0,
            color: PackedRgba::BLACK,
        }
    }
}

impl ScanLineOptions {
    /// Validate constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if !(self.spacing.is_finite() && self.spacing >= 1.0) {
            errors.push(ConfigError::new(
                "scan_lines.spacing",
                self.spacing.to_string(),
                "must be a finite number >= 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            errors.push(ConfigError::new(
                "scan_lines.opacity",
                self.opacity.to_string(),
                "must be within [0, 1]",
            ));
        }
        if !(self.scroll_speed.is_finite() && self.scroll_speed >= 0.0) {
            errors.push(ConfigError::new(
                "scan_lines.scroll_speed",
                self.scroll_speed.to_string(),
                "must be a finite number >= 0",
            ));
        }
        finish_validation(errors)
    }

    /// Overlay phase `elapsed` after start.
    #[must_use]
    pub fn offset_at(&self, elapsed: Duration) -> f32 {
        (elapsed.as_secs_f32() * self.scroll_speed) % self.spacing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    Running,
    Destroyed,
}

/// Scan-line overlay attached to one element.
pub struct ScanLines {
    runtime: Runtime,
    target: WeakElement,
    options: ScanLineOptions,
    state: ScanState,
    subscription: Rc<RefCell<Option<FrameSubscription>>>,
}

impl fmt::Debug for ScanLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanLines")
            .field("state", &self.state)
            .field("options", &self.options)
            .finish()
    }
}

impl ScanLines {
    /// Attach to `element`. The overlay is not shown until [`start`](Self::start).
    pub fn create(
        runtime: &Runtime,
        element: &Element,
        options: ScanLineOptions,
    ) -> Result<Self, FxError> {
        options.validate()?;
        if !element.try_attach(EffectKind::ScanLines) {
            return Err(FxError::AlreadyAttached(EffectKind::ScanLines));
        }
        styles::ensure_base_styles(runtime.styles());
        debug!(element = %element.label(), spacing = options.spacing, "scan lines created");
        Ok(Self {
            runtime: runtime.clone(),
            target: element.downgrade(),
            options,
            state: ScanState::Idle,
            subscription: Rc::default(),
        })
    }

    /// Show the overlay. Returns `false` if already running, destroyed, or
    /// the element is gone.
    pub fn start(&mut self) -> bool {
        if self.state != ScanState::Idle {
            return false;
        }
        let Some(element) = self.target.upgrade() else {
            return false;
        };
        let overlay = ScanLineOverlay {
            spacing: self.options.spacing,
            opacity: self.options.opacity,
            offset: 0.0,
            color: self.options.color,
        };
        element.update(|props| {
            props.classes.insert(SCANLINES_CLASS.to_string());
            props.overlay = Some(overlay);
        });

        if self.options.scroll_speed > 0.0 {
            let started = self.runtime.now();
            let options = self.options.clone();
            let target = self.target.clone();
            let slot = Rc::downgrade(&self.subscription);
            let subscription = self.runtime.clock().subscribe(move |time| {
                let Some(element) = target.upgrade() else {
                    if let Some(slot) = slot.upgrade() {
                        let released = slot.borrow_mut().take();
                        drop(released);
                        debug!("scan lines unsubscribed: target released");
                    }
                    return;
                };
                let offset = options.offset_at(time.now.saturating_sub(started));
                element.update(|props| {
                    if let Some(overlay) = props.overlay.as_mut() {
                        overlay.offset = offset;
                    }
                });
            });
            *self.subscription.borrow_mut() = Some(subscription);
        }
        self.state = ScanState::Running;
        debug!("scan lines started");
        true
    }

    /// Remove the overlay and class. Returns `true` if it was running.
    pub fn stop(&mut self) -> bool {
        if self.state != ScanState::Running {
            return false;
        }
        let subscription = self.subscription.borrow_mut().take();
        if let Some(mut subscription) = subscription {
            subscription.cancel();
        }
        if let Some(element) = self.target.upgrade() {
            element.update(|props| {
                props.classes.remove(SCANLINES_CLASS);
                props.overlay = None;
            });
        }
        self.state = ScanState::Idle;
        debug!("scan lines stopped");
        true
    }

    /// Stop and detach. Idempotent.
    pub fn destroy(&mut self) -> Result<(), FxError> {
        if self.state == ScanState::Destroyed {
            return Ok(());
        }
        self.stop();
        self.state = ScanState::Destroyed;
        let Some(element) = self.target.upgrade() else {
            return Err(FxError::TargetReleased(EffectKind::ScanLines));
        };
        element.detach(EffectKind::ScanLines);
        debug!(element = %element.label(), "scan lines destroyed");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ScanState::Running
    }
}

impl Drop for ScanLines {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn start_adds_overlay_and_stop_removes_it() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let mut lines = ScanLines::create(&runtime, &element, ScanLineOptions::default()).unwrap();
        assert!(lines.start());
        assert!(!lines.start());
        assert!(element.has_class(SCANLINES_CLASS));
        assert!(element.snapshot().overlay.is_some());

        assert!(lines.stop());
        assert!(!lines.stop());
        assert!(!element.has_class(SCANLINES_CLASS));
        assert!(element.snapshot().overlay.is_none());
        assert_eq!(runtime.pending_callbacks(), 0);
    }

    #[test]
    fn overlay_scrolls_and_wraps() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let mut lines = ScanLines::create(&runtime, &element, ScanLineOptions::default()).unwrap();
        lines.start();
        runtime.advance(ms(100));
        let offset = element.snapshot().overlay.map(|o| o.offset).unwrap_or_default();
        assert!((offset - 2.0).abs() < 1e-4, "offset {offset}");
        runtime.advance(ms(100));
        let offset = element.snapshot().overlay.map(|o| o.offset).unwrap_or_default();
        assert!((offset - 1.0).abs() < 1e-4, "offset {offset}");
    }

    #[test]
    fn dropped_element_releases_the_subscription() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let mut lines = ScanLines::create(&runtime, &element, ScanLineOptions::default()).unwrap();
        assert!(lines.start());
        assert_eq!(runtime.pending_callbacks(), 1);

        drop(element);
        runtime.run_for(ms(1_000), ms(50));
        assert_eq!(runtime.pending_callbacks(), 0);
        assert_eq!(
            lines.destroy(),
            Err(FxError::TargetReleased(EffectKind::ScanLines))
        );
    }

    #[test]
    fn zero_speed_needs_no_subscription() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let options = ScanLineOptions {
            scroll_speed: 0.0,
            ..ScanLineOptions::default()
        };
        let mut lines = ScanLines::create(&runtime, &element, options).unwrap();
        lines.start();
        assert_eq!(runtime.pending_callbacks(), 0);
        runtime.advance(ms(500));
        assert_eq!(element.snapshot().overlay.map(|o| o.offset), Some(0.0));
    }

    #[test]
    fn destroy_is_idempotent() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let mut lines = ScanLines::create(&runtime, &element, ScanLineOptions::default()).unwrap();
        lines.start();
        assert_eq!(lines.destroy(), Ok(()));
        assert_eq!(lines.destroy(), Ok(()));
        assert!(!lines.start());
        assert!(element.attached().is_empty());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let runtime = Runtime::new();
        let element = Element::new("screen");
        let options = ScanLineOptions {
            spacing: 0.0,
            opacity: 2.0,
            scroll_speed: -1.0,
            ..ScanLineOptions::default()
        };
        match ScanLines::create(&runtime, &element, options) {
            Err(FxError::InvalidConfig(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        assert!(element.attached().is_empty());
    }
}
