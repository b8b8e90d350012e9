#![forbid(unsafe_code)]

//! Delayed one-shot callbacks and randomized self re-arming repeaters.
//!
//! [`Timers`] is a deadline-ordered queue driven by [`Timers::advance_to`].
//! [`RandomRepeat`] sits on top of it: every firing picks a fresh uniform
//! random delay inside `[min, max]` from an injected [`FxRng`], so the
//! interval policy is testable with a fixed seed.
//!
//! # Invariants
//!
//! 1. Timers fire in `(deadline, creation order)` order.
//! 2. A timer scheduled from inside a callback with a deadline at or before
//!    the target time fires within the same `advance_to` call.
//! 3. A cancelled timer never fires. Cancelling is idempotent, and dropping
//!    a [`TimerHandle`] cancels it.
//! 4. After [`RandomRepeat::stop`] returns, its callback never runs again.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::logging::{debug, trace};
use crate::rng::FxRng;

type TimerCallback = Box<dyn FnOnce(Duration)>;
type TimerKey = (Duration, u64);

#[derive(Default)]
struct TimerState {
    next_id: u64,
    now: Duration,
    queue: BTreeMap<TimerKey, TimerCallback>,
}

/// Deadline-ordered one-shot timer queue. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct Timers {
    state: Rc<RefCell<TimerState>>,
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Timers")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl Timers {
    /// Create an empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once, `delay` after the current time.
    ///
    /// The callback receives its own deadline.
    pub fn after(&self, delay: Duration, callback: impl FnOnce(Duration) + 'static) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state.now.checked_add(delay).unwrap_or(Duration::MAX);
        state.queue.insert((deadline, id), Box::new(callback));
        trace!(timer_id = id, deadline_ms = deadline.as_millis() as u64, "timer scheduled");
        TimerHandle {
            key: Some((deadline, id)),
            timers: Rc::downgrade(&self.state),
        }
    }

    /// Fire every timer whose deadline is `<= now`, in order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn advance_to(&self, now: Duration) -> usize {
        let mut fired = 0;
        loop {
            let due = {
                let mut state = self.state.borrow_mut();
                let next_key = state.queue.keys().next().copied();
                match next_key {
                    Some(key) if key.0 <= now => {
                        state.now = state.now.max(key.0);
                        state.queue.remove(&key).map(|callback| (key.0, callback))
                    }
                    _ => None,
                }
            };
            let Some((deadline, callback)) = due else {
                break;
            };
            callback(deadline);
            fired += 1;
        }
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(now);
        fired
    }

    /// Current queue time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state.borrow().queue.keys().next().map(|key| key.0)
    }
}

/// Handle to a scheduled timer. Cancels on drop.
pub struct TimerHandle {
    key: Option<TimerKey>,
    timers: Weak<RefCell<TimerState>>,
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("deadline", &self.key.map(|key| key.0))
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl TimerHandle {
    /// Cancel the timer. Returns `true` if it was still pending.
    pub fn cancel(&mut self) -> bool {
        let Some(key) = self.key.take() else {
            return false;
        };
        let Some(state) = self.timers.upgrade() else {
            return false;
        };
        let removed = state.borrow_mut().queue.remove(&key);
        let was_pending = removed.is_some();
        drop(removed);
        was_pending
    }

    /// Whether the timer has neither fired nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        match (self.key, self.timers.upgrade()) {
            (Some(key), Some(state)) => state.borrow().queue.contains_key(&key),
            _ => false,
        }
    }

    /// Scheduled deadline, if not cancelled.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.key.map(|key| key.0)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// RandomRepeat
// ---------------------------------------------------------------------------

type RepeatCallback = Rc<RefCell<Box<dyn FnMut(Duration)>>>;

struct RepeatState {
    timers: Timers,
    min: Duration,
    max: Duration,
    rng: FxRng,
    pending: Option<TimerHandle>,
    armed: bool,
    fired: u64,
}

/// Repeater that fires at uniform random delays inside `[min, max]`.
///
/// Each firing re-arms with a newly drawn delay, which avoids the visible
/// periodicity of a fixed interval.
pub struct RandomRepeat {
    state: Rc<RefCell<RepeatState>>,
}

impl fmt::Debug for RandomRepeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RandomRepeat")
            .field("min", &state.min)
            .field("max", &state.max)
            .field("armed", &state.armed)
            .field("fired", &state.fired)
            .finish()
    }
}

impl RandomRepeat {
    /// Create an idle repeater. Bounds are swapped if given in reverse.
    #[must_use]
    pub fn new(timers: &Timers, min: Duration, max: Duration, rng: FxRng) -> Self {
        let (min, max) = if max < min { (max, min) } else { (min, max) };
        Self {
            state: Rc::new(RefCell::new(RepeatState {
                timers: timers.clone(),
                min,
                max,
                rng,
                pending: None,
                armed: false,
                fired: 0,
            })),
        }
    }

    /// Start firing `callback`. No-op if already armed.
    pub fn start(&self, callback: impl FnMut(Duration) + 'static) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.armed {
                return false;
            }
            state.armed = true;
        }
        let callback: RepeatCallback = Rc::new(RefCell::new(Box::new(callback)));
        Self::arm(&self.state, callback);
        true
    }

    fn arm(state: &Rc<RefCell<RepeatState>>, callback: RepeatCallback) {
        let weak = Rc::downgrade(state);
        let mut guard = state.borrow_mut();
        let (min, max) = (guard.min, guard.max);
        let delay = guard.rng.duration_between(min, max);
        trace!(delay_ms = delay.as_millis() as u64, "random repeat armed");
        let handle = guard.timers.after(delay, move |now| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            {
                let mut inner = state.borrow_mut();
                if !inner.armed {
                    return;
                }
                inner.fired += 1;
            }
            {
                let mut run = callback.borrow_mut();
                (*run)(now);
            }
            let still_armed = state.borrow().armed;
            if still_armed {
                Self::arm(&state, callback);
            }
        });
        let previous = guard.pending.replace(handle);
        drop(guard);
        drop(previous);
    }

    /// Stop firing. Idempotent. Returns `true` if it was armed.
    pub fn stop(&self) -> bool {
        let pending = {
            let mut state = self.state.borrow_mut();
            if !state.armed {
                return false;
            }
            state.armed = false;
            state.pending.take()
        };
        if let Some(mut handle) = pending {
            handle.cancel();
        }
        debug!("random repeat stopped");
        true
    }

    /// Whether the repeater will fire again.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.borrow().armed
    }

    /// Number of times the callback has fired.
    #[must_use]
    pub fn fire_count(&self) -> u64 {
        self.state.borrow().fired
    }

    /// Deadline of the next firing, if armed.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let state = self.state.borrow();
        if !state.armed {
            return None;
        }
        state.pending.as_ref().and_then(TimerHandle::deadline)
    }
}

impl Drop for RandomRepeat {
    fn drop(&mut self) {
        self.stop();
    }
}
