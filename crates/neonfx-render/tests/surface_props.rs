//! Property tests for compositing and the cell surface.

use neonfx_render::{CellSurface, PackedRgba, PxRect, Surface};
use proptest::prelude::*;

fn color() -> impl Strategy<Value = PackedRgba> {
    any::<u32>().prop_map(PackedRgba)
}

proptest! {
    #[test]
    fn over_opaque_destination_stays_opaque(src in color(), r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let dst = PackedRgba::rgb(r, g, b);
        prop_assert_eq!(src.over(dst).a(), 255);
    }

    #[test]
    fn over_result_channels_lie_between_inputs(src in color(), dst in color()) {
        let out = src.over(dst);
        if src.a() > 0 && dst.a() > 0 {
            for (s, d, o) in [
                (src.r(), dst.r(), out.r()),
                (src.g(), dst.g(), out.g()),
                (src.b(), dst.b(), out.b()),
            ] {
                prop_assert!(o >= s.min(d) && o <= s.max(d), "{} not in [{}, {}]", o, s.min(d), s.max(d));
            }
        }
    }

    #[test]
    fn hex_display_round_trips(c in color()) {
        prop_assert_eq!(PackedRgba::parse_hex(&c.to_string()).ok(), Some(c));
    }

    #[test]
    fn arbitrary_draws_never_panic(
        cols in 0u16..20,
        rows in 0u16..20,
        ops in proptest::collection::vec((-50.0f32..400.0, -50.0f32..400.0, -20.0f32..200.0, -20.0f32..200.0), 0..40),
    ) {
        let mut surface = CellSurface::new(cols, rows, 8.0, 16.0);
        for (x, y, w, h) in ops {
            surface.fill_rect(PxRect::new(x, y, w, h), PackedRgba::rgba(0, 0, 0, 13));
            surface.draw_glyph(x, y, 'ﾊ', PackedRgba::rgb(0, 255, 65));
        }
        prop_assert_eq!(surface.cells().len(), cols as usize * rows as usize);
        prop_assert!(surface.glyph_count() <= surface.cells().len());
    }
}
