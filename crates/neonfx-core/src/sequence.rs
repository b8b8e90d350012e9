#![forbid(unsafe_code)]

//! Ordered step playback on top of [`Timers`].
//!
//! A [`StepSequence`] runs `on_step(0)` immediately, then `on_step(i)` at
//! `i * interval` for each remaining step, and finally `on_finish()` at
//! `steps * interval`. Glitch keyframes and flicker steps are both played
//! this way.
//!
//! # Invariants
//!
//! 1. Steps run strictly in index order, each exactly once.
//! 2. `on_finish` runs at most once, and never after [`StepSequence::cancel`].
//! 3. Cancelling from inside `on_step` stops the remaining steps.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::timers::{TimerHandle, Timers};

type StepFn = Box<dyn FnMut(usize)>;
type FinishFn = Box<dyn FnOnce()>;

struct SequenceState {
    timers: Timers,
    interval: Duration,
    steps: usize,
    next: usize,
    on_step: Option<StepFn>,
    on_finish: Option<FinishFn>,
    pending: Option<TimerHandle>,
    done: bool,
}

/// A cancellable, in-flight step sequence.
pub struct StepSequence {
    state: Rc<RefCell<SequenceState>>,
}

impl fmt::Debug for StepSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("StepSequence")
            .field("steps", &state.steps)
            .field("next", &state.next)
            .field("interval", &state.interval)
            .field("done", &state.done)
            .finish()
    }
}

impl StepSequence {
    /// Start playing `steps` steps spaced by `interval`.
    ///
    /// The first step runs before this returns, so the caller must not hold
    /// any borrow that `on_step` needs.
    pub fn play(
        timers: &Timers,
        steps: usize,
        interval: Duration,
        on_step: impl FnMut(usize) + 'static,
        on_finish: impl FnOnce() + 'static,
    ) -> Self {
        let state = Rc::new(RefCell::new(SequenceState {
            timers: timers.clone(),
            interval,
            steps,
            next: 0,
            on_step: Some(Box::new(on_step)),
            on_finish: Some(Box::new(on_finish)),
            pending: None,
            done: false,
        }));
        Self::advance(&state);
        Self { state }
    }

    fn advance(state: &Rc<RefCell<SequenceState>>) {
        let (index, steps) = {
            let inner = state.borrow();
            if inner.done {
                return;
            }
            (inner.next, inner.steps)
        };

        if index >= steps {
            let (finish, step) = {
                let mut inner = state.borrow_mut();
                inner.done = true;
                (inner.on_finish.take(), inner.on_step.take())
            };
            drop(step);
            if let Some(finish) = finish {
                finish();
            }
            return;
        }

        let step = state.borrow_mut().on_step.take();
        if let Some(mut step) = step {
            step(index);
            let orphan = {
                let mut inner = state.borrow_mut();
                if inner.done {
                    Some(step)
                } else {
                    inner.on_step = Some(step);
                    None
                }
            };
            drop(orphan);
        }

        let timers = {
            let mut inner = state.borrow_mut();
            if inner.done {
                return;
            }
            inner.next = index + 1;
            inner.timers.clone()
        };
        let interval = state.borrow().interval;
        let weak = Rc::downgrade(state);
        let handle = timers.after(interval, move |_| {
            if let Some(state) = weak.upgrade() {
                Self::advance(&state);
            }
        });
        let previous = state.borrow_mut().pending.replace(handle);
        drop(previous);
    }

    /// Stop the sequence. `on_finish` will not run. Idempotent.
    ///
    /// Returns `true` if the sequence was still playing.
    pub fn cancel(&self) -> bool {
        let (pending, step, finish) = {
            let mut inner = self.state.borrow_mut();
            if inner.done {
                return false;
            }
            inner.done = true;
            (
                inner.pending.take(),
                inner.on_step.take(),
                inner.on_finish.take(),
            )
        };
        if let Some(mut handle) = pending {
            handle.cancel();
        }
        drop(step);
        drop(finish);
        true
    }

    /// Whether steps or the finish callback are still outstanding.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        !self.state.borrow().done
    }

    /// Index of the next step to run.
    #[must_use]
    pub fn next_step(&self) -> usize {
        self.state.borrow().next
    }
}

impl Drop for StepSequence {
    fn drop(&mut self) {
        self.cancel();
    }
}
