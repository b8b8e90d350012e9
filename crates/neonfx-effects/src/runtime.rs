#![forbid(unsafe_code)]

//! The scheduling context every effect is created against.
//!
//! A [`Runtime`] bundles the [`FrameClock`], the [`Timers`] queue, the
//! [`StylesheetRegistry`], and a seed source. Hosts drive it by calling
//! [`Runtime::advance`] once per display frame; tests drive it with exact
//! simulated durations.
//!
//! # Invariants
//!
//! 1. Within one `advance_to`, due timers fire first in deadline order, then
//!    every frame subscriber runs once in subscription order.
//! 2. Time never goes backwards.
//! 3. Each [`Runtime::fork_rng`] call yields a distinct, reproducible stream.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use neonfx_core::{FrameClock, FxRng, Timers};
use neonfx_render::StylesheetRegistry;

use crate::settings::FxSettings;

/// Frame clock, timers, stylesheet registry, and seeds. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct Runtime {
    clock: FrameClock,
    timers: Timers,
    styles: StylesheetRegistry,
    seeds: Rc<RefCell<FxRng>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("now", &self.now())
            .field("frame", &self.clock.frame())
            .field("pending_callbacks", &self.pending_callbacks())
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime whose forked RNGs derive from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: FrameClock::new(),
            timers: Timers::new(),
            styles: StylesheetRegistry::new(),
            seeds: Rc::new(RefCell::new(FxRng::new(seed))),
        }
    }

    /// Runtime seeded from `NEONFX_SEED` when set.
    #[must_use]
    pub fn from_settings(settings: &FxSettings) -> Self {
        Self::with_seed(settings.seed.unwrap_or(0))
    }

    #[must_use]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    #[must_use]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    #[must_use]
    pub fn styles(&self) -> &StylesheetRegistry {
        &self.styles
    }

    /// A fresh RNG for one effect.
    #[must_use]
    pub fn fork_rng(&self) -> FxRng {
        FxRng::new(self.seeds.borrow_mut().next_u64())
    }

    /// RNG for an effect with an optional explicit seed.
    #[must_use]
    pub(crate) fn rng_for(&self, seed: Option<u64>) -> FxRng {
        seed.map_or_else(|| self.fork_rng(), FxRng::new)
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.timers.now().max(self.clock.now())
    }

    /// Advance by `dt` and run one frame. Returns callbacks invoked.
    pub fn advance(&self, dt: Duration) -> usize {
        self.advance_to(self.now().saturating_add(dt))
    }

    /// Advance to `now` and run one frame. Returns callbacks invoked.
    pub fn advance_to(&self, now: Duration) -> usize {
        let fired = self.timers.advance_to(now);
        fired + self.clock.tick(now)
    }

    /// Advance by `total` in steps of `frame`, one frame per step.
    ///
    /// A zero `frame` runs a single step of `total`.
    pub fn run_for(&self, total: Duration, frame: Duration) -> usize {
        if frame.is_zero() {
            return self.advance(total);
        }
        let end = self.now().saturating_add(total);
        let mut fired = 0;
        while self.now() < end {
            let next = self.now().saturating_add(frame).min(end);
            fired += self.advance_to(next);
        }
        fired
    }

    /// Pending timers plus live frame subscriptions.
    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.timers.pending() + self.clock.subscriber_count()
    }
}
