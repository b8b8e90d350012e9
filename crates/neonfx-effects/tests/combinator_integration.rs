#![forbid(unsafe_code)]

//! End-to-end tests for presets driven through `CombinedEffect`.

use std::time::Duration;

use neonfx_effects::styles::{BASE_STYLES_ID, RAIN_CLASS, SCANLINES_CLASS};
use neonfx_effects::{
    CombinedEffect, EffectsConfig, FlickerOptions, FxSettings, Preset, RainOptions, Runtime,
};
use neonfx_render::{CellSurface, EffectKinds, Element};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn every_preset_runs_and_tears_down_cleanly() {
    for preset in Preset::ALL {
        let runtime = Runtime::with_seed(42);
        let element = Element::new(preset.name());
        let surface = Box::new(CellSurface::new(40, 12, 8.0, 16.0));
        let mut fx =
            CombinedEffect::create_with_surface(&runtime, &element, surface, preset.config())
                .unwrap_or_else(|err| panic!("{preset}: {err}"));

        fx.trigger_glitch();
        fx.flicker_neon(None);
        runtime.run_for(Duration::from_secs(20), ms(16));

        assert!(runtime.styles().contains(BASE_STYLES_ID));
        assert_eq!(fx.destroy(), Ok(()), "{preset}");
        let props = element.snapshot();
        assert!(props.classes.is_empty(), "{preset}: {:?}", props.classes);
        assert!(props.attached.is_empty());
        assert!(props.is_untransformed(), "{preset}: {props:?}");
        assert_eq!((props.opacity, props.brightness), (1.0, 1.0));
        assert_eq!(runtime.pending_callbacks(), 0, "{preset}");
    }
}

#[test]
fn random_presets_fire_on_their_own() {
    let runtime = Runtime::with_seed(9);
    let element = Element::new("title");
    let fx = CombinedEffect::create(&runtime, &element, Preset::Cyberpunk.config()).unwrap();
    runtime.run_for(Duration::from_secs(30), ms(16));
    assert!(fx.glitch().is_some_and(|g| g.burst_count() > 0));
    assert!(fx.flicker().is_some_and(|f| f.run_count() > 0));
}

#[test]
fn reduced_motion_silences_random_modes() {
    let runtime = Runtime::with_seed(9);
    let element = Element::new("title");
    let settings = FxSettings {
        reduced_motion: true,
        ..FxSettings::default()
    };
    let config = Preset::Cyberpunk.config().with_settings(&settings);
    let fx = CombinedEffect::create(&runtime, &element, config).unwrap();
    runtime.run_for(Duration::from_secs(30), ms(16));
    assert_eq!(fx.glitch().map(|g| g.burst_count()), Some(0));
    assert_eq!(fx.flicker().map(|f| f.run_count()), Some(0));
    let overlay = element.snapshot().overlay.unwrap();
    assert_eq!(overlay.offset, 0.0);
    assert_eq!(runtime.pending_callbacks(), 0);
}

#[test]
fn autostart_off_leaves_overlays_idle() {
    let runtime = Runtime::new();
    let element = Element::new("screen");
    let config = EffectsConfig {
        autostart: false,
        ..Preset::Hacker.config()
    };
    let mut fx = CombinedEffect::create(&runtime, &element, config).unwrap();
    assert!(!element.has_class(SCANLINES_CLASS));
    assert!(fx.start_scan_lines());
    assert!(element.has_class(SCANLINES_CLASS));
    assert!(fx.stop_scan_lines());
    assert!(!fx.stop_scan_lines());
}

#[test]
fn rain_draws_into_the_surface_and_stops() {
    let runtime = Runtime::with_seed(1);
    let element = Element::new("backdrop");
    let config = EffectsConfig {
        rain: Some(RainOptions {
            density: 1.0,
            ..RainOptions::default()
        }),
        ..EffectsConfig::default()
    };
    let surface = Box::new(CellSurface::new(20, 10, 16.0, 16.0));
    let mut fx = CombinedEffect::create_with_surface(&runtime, &element, surface, config).unwrap();
    assert!(element.has_class(RAIN_CLASS));
    assert_eq!(element.attached(), EffectKinds::RAIN);

    runtime.run_for(ms(500), ms(16));
    let rain = fx.rain().unwrap();
    assert_eq!(rain.column_count(), 20);
    assert_eq!(rain.rendered_frames(), 8);

    assert!(fx.stop_rain());
    let frames = fx.rain().map(|r| r.rendered_frames());
    runtime.run_for(ms(500), ms(16));
    assert_eq!(fx.rain().map(|r| r.rendered_frames()), frames);
    assert!(fx.start_rain());
    fx.destroy().unwrap();
    assert!(!element.has_class(RAIN_CLASS));
}

#[test]
fn flicker_passthrough_stops_early() {
    let runtime = Runtime::new();
    let element = Element::new("sign");
    let config = EffectsConfig {
        neon_flicker: Some(FlickerOptions::default()),
        ..EffectsConfig::default()
    };
    let fx = CombinedEffect::create(&runtime, &element, config).unwrap();
    assert!(fx.flicker_neon(Some(ms(1_000))));
    assert!(!fx.flicker_neon(None));
    runtime.advance(ms(100));
    assert!(fx.stop_flicker());
    let props = element.snapshot();
    assert_eq!((props.opacity, props.brightness), (1.0, 1.0));
    assert!(fx.flicker_neon(None));
}

#[test]
fn dropping_the_handle_releases_everything() {
    let runtime = Runtime::with_seed(3);
    let element = Element::new("title");
    {
        let _fx = CombinedEffect::create(&runtime, &element, Preset::Cyberpunk.config()).unwrap();
        runtime.run_for(ms(200), ms(16));
    }
    assert_eq!(runtime.pending_callbacks(), 0);
    assert!(element.attached().is_empty());
}

#[test]
fn removed_target_leaves_nothing_scheduled() {
    let runtime = Runtime::with_seed(11);
    let element = Element::new("title");
    let mut fx = CombinedEffect::create(&runtime, &element, Preset::Cyberpunk.config()).unwrap();
    assert!(fx.scan_lines().is_some_and(|s| s.is_running()));
    assert!(runtime.pending_callbacks() > 0);

    drop(element);
    runtime.run_for(Duration::from_secs(60), ms(50));
    assert_eq!(runtime.pending_callbacks(), 0);
    assert!(fx.glitch().is_some_and(|g| !g.is_repeating()));
    assert!(fx.destroy().is_err());
    assert!(fx.is_destroyed());
}
