#![forbid(unsafe_code)]

//! Cooperative per-frame callback source.
//!
//! [`FrameClock`] plays the role of a display-refresh callback loop. The host
//! (a terminal loop, a test, a browser shim) calls [`FrameClock::tick`] once
//! per frame; every live subscriber runs once, in subscription order.
//!
//! # Invariants
//!
//! 1. Subscribers added during a tick first run on the *next* tick.
//! 2. A subscription cancelled before or during a tick never runs again,
//!    including when it cancels itself from inside its own callback.
//! 3. `cancel()` is idempotent and dropping a [`FrameSubscription`] cancels it.
//! 4. Frame time never goes backwards.
//!
//! Callbacks are moved out of the subscriber table before they run, so a
//! callback may freely subscribe, cancel, or tick-query the clock.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::logging::trace;

/// Time information handed to each frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTime {
    /// Monotonic time of this frame since the clock origin.
    pub now: Duration,
    /// 1-based frame counter.
    pub frame: u64,
}

type FrameCallback = Box<dyn FnMut(FrameTime)>;

#[derive(Default)]
struct ClockState {
    next_id: u64,
    frame: u64,
    now: Duration,
    /// `None` marks a callback that is currently executing.
    subscribers: BTreeMap<u64, Option<FrameCallback>>,
}

/// Single-threaded frame callback source. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct FrameClock {
    state: Rc<RefCell<ClockState>>,
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FrameClock")
            .field("frame", &state.frame)
            .field("now", &state.now)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl FrameClock {
    /// Create a clock at time zero with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run on every subsequent tick until cancelled.
    pub fn subscribe(&self, callback: impl FnMut(FrameTime) + 'static) -> FrameSubscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.insert(id, Some(Box::new(callback)));
        trace!(sub_id = id, "frame subscription added");
        FrameSubscription {
            id: Some(id),
            clock: Rc::downgrade(&self.state),
        }
    }

    /// Run one frame at time `now`. Returns the number of callbacks invoked.
    pub fn tick(&self, now: Duration) -> usize {
        let (ids, time) = {
            let mut state = self.state.borrow_mut();
            state.frame += 1;
            state.now = state.now.max(now);
            let ids: Vec<u64> = state.subscribers.keys().copied().collect();
            (
                ids,
                FrameTime {
                    now: state.now,
                    frame: state.frame,
                },
            )
        };

        let mut fired = 0;
        for id in ids {
            let taken = match self.state.borrow_mut().subscribers.get_mut(&id) {
                Some(slot) => slot.take(),
                None => continue,
            };
            let Some(mut callback) = taken else {
                continue;
            };
            callback(time);
            fired += 1;

            // Put the callback back unless it was cancelled while running.
            let orphan = match self.state.borrow_mut().subscribers.get_mut(&id) {
                Some(slot) => {
                    *slot = Some(callback);
                    None
                }
                None => Some(callback),
            };
            drop(orphan);
        }
        fired
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    /// Frames ticked so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.state.borrow().frame
    }

    /// Time of the most recent tick.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }
}

/// Handle to a frame subscription. Cancels on drop.
pub struct FrameSubscription {
    id: Option<u64>,
    clock: Weak<RefCell<ClockState>>,
}

impl fmt::Debug for FrameSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSubscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl FrameSubscription {
    /// Stop receiving frames. Returns `true` only on the first call.
    pub fn cancel(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        if let Some(state) = self.clock.upgrade() {
            let removed = state.borrow_mut().subscribers.remove(&id);
            drop(removed);
            trace!(sub_id = id, "frame subscription cancelled");
        }
        true
    }

    /// Whether this subscription will still receive frames.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match (self.id, self.clock.upgrade()) {
            (Some(id), Some(state)) => state.borrow().subscribers.contains_key(&id),
            _ => false,
        }
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
