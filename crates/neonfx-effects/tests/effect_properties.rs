#![forbid(unsafe_code)]

//! Property tests for rain, flicker, and glitch invariants.
//!
//! Run with: cargo test -p neonfx-effects --test effect_properties

use std::time::Duration;

use neonfx_core::FxRng;
use neonfx_effects::{
    FlickerOptions, FlickerSequencer, FrameOutcome, GlitchEffect, GlitchIntensity, GlitchOptions,
    RainField, RainOptions, RainRenderer, Runtime, trail_brightness,
};
use neonfx_render::{CellSurface, Element, Surface, VisualProps};
use proptest::prelude::*;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn small_rain(trail_length: usize, seed: u64) -> RainOptions {
    RainOptions {
        cell_size: 8.0,
        trail_length,
        min_glyph_interval: ms(0),
        max_glyph_interval: ms(30),
        reset_jitter: ms(100),
        seed: Some(seed),
        ..RainOptions::default()
    }
}

// ============================================================================
// Rain
// ============================================================================

proptest! {
    /// No trail ever outgrows `trail_length`, and after every frame no column
    /// sits past the reset limit.
    #[test]
    fn trail_bound_and_reset_limit_hold(
        seed in any::<u64>(),
        trail_length in 1usize..12,
        cols in 1u16..12,
        rows in 1u16..12,
        frames in 1usize..120,
    ) {
        let options = small_rain(trail_length, seed);
        let mut surface = CellSurface::new(cols, rows, 8.0, 8.0);
        let limit = surface.size().height + trail_length as f32 * 8.0;
        let mut field = RainField::new(options, FxRng::new(seed)).unwrap();
        let mut now = Duration::ZERO;
        for _ in 0..frames {
            now += ms(16);
            let outcome = field.step(now, &mut surface);
            let is_rendered = matches!(outcome, FrameOutcome::Rendered { .. });
            prop_assert!(is_rendered);
            for column in field.columns() {
                prop_assert!(column.trail.len() <= trail_length);
                prop_assert!(column.vertical_position <= limit);
            }
        }
        prop_assert_eq!(field.columns().len(), cols as usize);
    }

    /// Between resets, every column strictly falls.
    #[test]
    fn columns_fall_monotonically(seed in any::<u64>(), frames in 1usize..60) {
        let mut surface = CellSurface::new(10, 20, 8.0, 8.0);
        let mut field = RainField::new(small_rain(6, seed), FxRng::new(seed)).unwrap();
        let mut now = Duration::ZERO;
        field.step(now, &mut surface);
        for _ in 0..frames {
            let before: Vec<f32> = field.columns().iter().map(|c| c.vertical_position).collect();
            now += ms(16);
            let resets = match field.step(now, &mut surface) {
                FrameOutcome::Rendered { resets, .. } => resets,
                FrameOutcome::EmptySurface => 0,
            };
            let reset_position = -6.0 * 8.0;
            let mut seen_resets = 0;
            for (column, prev) in field.columns().iter().zip(before) {
                if column.vertical_position == reset_position && column.trail.is_empty() {
                    seen_resets += 1;
                } else {
                    prop_assert!(column.vertical_position > prev);
                }
            }
            prop_assert!(seen_resets >= resets);
        }
    }

    /// Accepted frames are always at least `frame_delay` apart, whatever the
    /// host frame cadence.
    #[test]
    fn throttle_spacing_holds(
        seed in any::<u64>(),
        delay_ms in 1u64..120,
        steps in proptest::collection::vec(1u64..80, 1..80),
    ) {
        let runtime = Runtime::with_seed(seed);
        let options = RainOptions {
            frame_delay: ms(delay_ms),
            ..small_rain(4, seed)
        };
        let mut rain = RainRenderer::create(&runtime, CellSurface::new(6, 6, 8.0, 8.0), options).unwrap();
        rain.start();
        let mut last: Option<Duration> = None;
        let mut rendered = 0;
        for step in steps {
            runtime.advance(ms(step));
            if rain.rendered_frames() > rendered {
                rendered = rain.rendered_frames();
                let at = rain.last_render_at().unwrap();
                if let Some(prev) = last {
                    prop_assert!(at - prev >= ms(delay_ms), "{:?} after {:?}", at, prev);
                }
                last = Some(at);
            }
        }
        prop_assert!(rendered >= 1);
    }
}

#[test]
fn brightness_tiers_are_ordered() {
    for len in 4..40 {
        assert_eq!(trail_brightness(len - 1, len), 1.0);
        assert_eq!(trail_brightness(len - 2, len), 0.9);
        assert_eq!(trail_brightness(len - 3, len), 0.85);
        for index in 0..len - 3 {
            let b = trail_brightness(index, len);
            assert!(b < 0.85, "index {index} of {len}: {b}");
            if index > 0 {
                assert!(b > trail_brightness(index - 1, len));
            }
        }
    }
}

// ============================================================================
// Flicker and glitch
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Flicker(Option<u64>),
    Stop,
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        proptest::option::of(50u64..600).prop_map(Op::Flicker),
        Just(Op::Stop),
        (1u64..300).prop_map(Op::Advance),
    ]
}

proptest! {
    /// A second flicker never starts while one is running, and the element is
    /// back at its base values whenever nothing is running.
    #[test]
    fn flicker_is_mutually_exclusive(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let runtime = Runtime::with_seed(5);
        let element = Element::new("sign");
        let flicker = FlickerSequencer::create(&runtime, &element, FlickerOptions::default()).unwrap();
        let mut runs = 0;
        for op in ops {
            match op {
                Op::Flicker(duration) => {
                    let busy = flicker.is_flickering();
                    let started = flicker.flicker(duration.map(ms));
                    prop_assert_eq!(started, !busy);
                    if started {
                        runs += 1;
                    }
                }
                Op::Stop => {
                    flicker.stop();
                    prop_assert!(!flicker.is_flickering());
                }
                Op::Advance(n) => {
                    runtime.advance(ms(n));
                }
            }
            prop_assert_eq!(flicker.run_count(), runs);
            if !flicker.is_flickering() {
                let props = element.snapshot();
                prop_assert_eq!((props.opacity, props.brightness), (1.0, 1.0));
            }
        }
    }

    /// A burst always leaves the element exactly as it found it.
    #[test]
    fn glitch_round_trip_restores_snapshot(
        offset_x in -20.0f32..20.0,
        offset_y in -20.0f32..20.0,
        skew in -5.0f32..5.0,
        intensity in prop_oneof![
            Just(GlitchIntensity::Subtle),
            Just(GlitchIntensity::Medium),
            Just(GlitchIntensity::Intense),
        ],
        duration_ms in 5u64..400,
    ) {
        let runtime = Runtime::new();
        let element = Element::with_props(
            "title",
            VisualProps {
                offset_x,
                offset_y,
                skew_deg: skew,
                ..VisualProps::default()
            },
        );
        let options = GlitchOptions {
            intensity,
            duration: ms(duration_ms),
            ..GlitchOptions::default()
        };
        let glitch = GlitchEffect::create(&runtime, &element, options).unwrap();
        let before = element.snapshot();
        prop_assert!(glitch.trigger());
        runtime.advance(ms(duration_ms));
        prop_assert!(!glitch.is_active());
        prop_assert_eq!(element.snapshot(), before);
        prop_assert_eq!(runtime.pending_callbacks(), 0);
    }
}
