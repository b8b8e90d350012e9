#![forbid(unsafe_code)]

//! Deterministic pseudo-random numbers for effects.
//!
//! Effects never reach for ambient randomness: each one owns an [`FxRng`]
//! seeded by its caller, so a given seed always produces the same glyphs,
//! fall speeds, and trigger intervals.

use std::time::Duration;

/// Golden-ratio increment used by the splitmix seed scrambler.
const SPLITMIX_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Fallback state; xorshift must never be seeded with zero.
const NONZERO_FALLBACK: u64 = 0x2545_F491_4F6C_DD1D;

/// Scramble a seed so that nearby seeds produce unrelated streams.
#[inline]
fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(SPLITMIX_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Xorshift64 PRNG with splitmix seeding.
///
/// Not cryptographic. Cheap to clone; clones continue the same stream
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxRng {
    state: u64,
}

impl FxRng {
    /// Create a generator from a seed. Any seed (including zero) is valid.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let state = splitmix64(seed);
        Self {
            state: if state == 0 { NONZERO_FALLBACK } else { state },
        }
    }

    /// Next raw 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform `f64` in `[0.0, 1.0)`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform `f32` in `[0.0, 1.0)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u32 << 24) as f32
    }

    /// Uniform `f32` in `[min, max)`. Returns `min` when the range is empty.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + (max - min) * self.next_f32()
    }

    /// Uniform index in `0..n`. Returns 0 when `n == 0`.
    pub fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_u64() % n as u64) as usize
    }

    /// `true` with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p.clamp(0.0, 1.0)
    }

    /// Uniform duration in `[min, max]`. Returns `min` when `max <= min`.
    pub fn duration_between(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        min + (max - min).mul_f64(self.next_f64())
    }

    /// Pick a random element, or `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.below(items.len()))
    }
}

impl Default for FxRng {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = FxRng::new(42);
        let mut b = FxRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn zero_seed_is_usable() {
        let mut rng = FxRng::new(0);
        let first = rng.next_u64();
        let second = rng.next_u64();
        assert_ne!(first, 0);
        assert_ne!(first, second);
    }

    #[test]
    fn unit_floats_stay_in_range() {
        let mut rng = FxRng::new(7);
        for _ in 0..10_000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f), "f32 out of range: {f}");
            let d = rng.next_f64();
            assert!((0.0..1.0).contains(&d), "f64 out of range: {d}");
        }
    }

    #[test]
    fn duration_between_respects_bounds() {
        let mut rng = FxRng::new(99);
        let min = Duration::from_millis(200);
        let max = Duration::from_millis(800);
        for _ in 0..1_000 {
            let d = rng.duration_between(min, max);
            assert!(d >= min && d <= max, "{d:?} outside window");
        }
        assert_eq!(rng.duration_between(max, min), max);
    }

    #[test]
    fn pick_and_below_handle_empty() {
        let mut rng = FxRng::new(1);
        let empty: [char; 0] = [];
        assert_eq!(rng.pick(&empty), None);
        assert_eq!(rng.below(0), 0);
        assert_eq!(rng.pick(&['a']), Some(&'a'));
    }

    #[test]
    fn range_f32_degenerate_returns_min() {
        let mut rng = FxRng::new(3);
        assert_eq!(rng.range_f32(1.0, 1.0), 1.0);
        for _ in 0..100 {
            let v = rng.range_f32(0.5, 1.5);
            assert!((0.5..1.5).contains(&v));
        }
    }
}
