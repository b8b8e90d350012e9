#![forbid(unsafe_code)]

//! Scheduling primitives for NeonFX.
//!
//! # Role in NeonFX
//! `neonfx-core` owns the two cooperative scheduling primitives every effect
//! is built on, plus the deterministic RNG they share:
//!
//! - [`clock::FrameClock`]: per-frame callbacks, paced by whoever drives
//!   [`FrameClock::tick`](clock::FrameClock::tick).
//! - [`timers::Timers`]: delayed one-shot callbacks ordered by deadline, and
//!   [`timers::RandomRepeat`], which re-arms itself at a uniform random delay.
//! - [`sequence::StepSequence`]: an ordered step player built on timers.
//! - [`rng::FxRng`]: small seedable PRNG so effect output is reproducible.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Nothing blocks:
//! "waiting" is always "not yet fired".

pub mod clock;
pub mod logging;
pub mod rng;
pub mod sequence;
pub mod timers;

pub use clock::{FrameClock, FrameSubscription, FrameTime};
pub use rng::FxRng;
pub use sequence::StepSequence;
pub use timers::{RandomRepeat, TimerHandle, Timers};
