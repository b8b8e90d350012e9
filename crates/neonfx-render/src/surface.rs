#![forbid(unsafe_code)]

//! Drawing-surface abstraction.
//!
//! A [`Surface`] is the rectangular pixel-addressed target the rain renderer
//! paints into. Hosts implement it over whatever they actually own. The
//! in-memory [`CellSurface`](crate::CellSurface) is the reference
//! implementation.
//!
//! Surfaces advertise what they can do through [`SurfaceCaps`] so an effect
//! that needs glyph drawing can refuse an unsuitable surface up front instead
//! of silently rendering nothing.

use crate::color::PackedRgba;

bitflags::bitflags! {
    /// Drawing operations a surface supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SurfaceCaps: u8 {
        /// Solid and translucent rectangle fills.
        const FILL   = 0b0000_0001;
        /// Single-glyph text drawing.
        const GLYPHS = 0b0000_0010;
        /// Fills composite with alpha instead of replacing.
        const ALPHA  = 0b0000_0100;
    }
}

/// Surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (or not a positive number).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PxRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PxRect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole surface of `size`.
    #[inline]
    pub const fn from_size(size: SurfaceSize) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }
}

/// A pixel-addressed drawing surface.
pub trait Surface {
    /// Current size. May change between frames (container resize).
    fn size(&self) -> SurfaceSize;

    /// Supported drawing operations.
    fn capabilities(&self) -> SurfaceCaps;

    /// Fill `rect` with `color`, compositing when the surface supports alpha.
    fn fill_rect(&mut self, rect: PxRect, color: PackedRgba);

    /// Draw `glyph` with its top-left corner at `(x, y)`.
    ///
    /// Positions outside the surface are ignored.
    fn draw_glyph(&mut self, x: f32, y: f32, glyph: char, color: PackedRgba);

    /// Fill the entire surface.
    fn fill_all(&mut self, color: PackedRgba) {
        let rect = PxRect::from_size(self.size());
        self.fill_rect(rect, color);
    }
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn size(&self) -> SurfaceSize {
        (**self).size()
    }

    fn capabilities(&self) -> SurfaceCaps {
        (**self).capabilities()
    }

    fn fill_rect(&mut self, rect: PxRect, color: PackedRgba) {
        (**self).fill_rect(rect, color);
    }

    fn draw_glyph(&mut self, x: f32, y: f32, glyph: char, color: PackedRgba) {
        (**self).draw_glyph(x, y, glyph, color);
    }

    fn fill_all(&mut self, color: PackedRgba) {
        (**self).fill_all(color);
    }
}
