#![forbid(unsafe_code)]

//! In-memory cell-grid surface.
//!
//! [`CellSurface`] maps a pixel coordinate space onto a grid of cells, each
//! `cell_width x cell_height` pixels. Fills composite onto every cell they
//! touch. A glyph occupies exactly one cell and is addressed by the pixel
//! position of its top-left corner.
//!
//! Terminal hosts present the grid one cell per terminal column. Tests read
//! cells back directly.
//!
//! # Invariants
//!
//! 1. `cells.len() == cols * rows` at all times, including after
//!    [`CellSurface::resize`].
//! 2. Out-of-range draws are ignored, never clamped onto an edge cell.
//! 3. A glyph whose foreground has faded below [`GLYPH_CLEAR_LUMA`] is
//!    removed, so repeated translucent fills eventually erase a trail.

use unicode_width::UnicodeWidthChar;

use crate::color::PackedRgba;
use crate::surface::{PxRect, Surface, SurfaceCaps, SurfaceSize};

/// Foreground luma below which a faded glyph is dropped from its cell.
pub const GLYPH_CLEAR_LUMA: u8 = 12;

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCell {
    pub glyph: Option<char>,
    pub fg: PackedRgba,
    pub bg: PackedRgba,
}

impl Default for SurfaceCell {
    fn default() -> Self {
        Self {
            glyph: None,
            fg: PackedRgba::WHITE,
            bg: PackedRgba::BLACK,
        }
    }
}

/// Cell-grid [`Surface`] with configurable cell pixel size.
#[derive(Debug, Clone)]
pub struct CellSurface {
    cols: u16,
    rows: u16,
    cell_width: f32,
    cell_height: f32,
    caps: SurfaceCaps,
    cells: Vec<SurfaceCell>,
}

impl CellSurface {
    /// Create a grid of `cols x rows` cells, each `cell_width x cell_height`
    /// pixels, with every capability enabled.
    ///
    /// Non-positive cell sizes are treated as one pixel.
    #[must_use]
    pub fn new(cols: u16, rows: u16, cell_width: f32, cell_height: f32) -> Self {
        Self {
            cols,
            rows,
            cell_width: sanitize_cell_size(cell_width),
            cell_height: sanitize_cell_size(cell_height),
            caps: SurfaceCaps::all(),
            cells: vec![SurfaceCell::default(); cols as usize * rows as usize],
        }
    }

    /// Restrict the advertised capabilities. Operations outside `caps`
    /// become no-ops.
    #[must_use]
    pub fn with_capabilities(mut self, caps: SurfaceCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Change the grid dimensions. All cells are reset.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if cols == self.cols && rows == self.rows {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            old_cols = self.cols,
            old_rows = self.rows,
            cols,
            rows,
            "cell surface resized"
        );
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![SurfaceCell::default(); cols as usize * rows as usize];
    }

    /// Reset every cell to an empty cell with background `bg`.
    pub fn clear(&mut self, bg: PackedRgba) {
        for cell in &mut self.cells {
            *cell = SurfaceCell {
                bg,
                ..SurfaceCell::default()
            };
        }
    }

    #[inline]
    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.cols
    }

    #[inline]
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    #[inline]
    #[must_use]
    pub const fn cell_width(&self) -> f32 {
        self.cell_width
    }

    #[inline]
    #[must_use]
    pub const fn cell_height(&self) -> f32 {
        self.cell_height
    }

    /// Cell at `(col, row)`, or `None` when out of range.
    #[must_use]
    pub fn cell(&self, col: u16, row: u16) -> Option<&SurfaceCell> {
        self.index(col, row).map(|idx| &self.cells[idx])
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[SurfaceCell] {
        &self.cells
    }

    /// Number of cells currently holding a glyph.
    #[must_use]
    pub fn glyph_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.glyph.is_some()).count()
    }

    /// Glyphs of one row as text, with spaces for empty cells.
    #[must_use]
    pub fn row_text(&self, row: u16) -> String {
        (0..self.cols)
            .map(|col| {
                self.cell(col, row)
                    .and_then(|cell| cell.glyph)
                    .unwrap_or(' ')
            })
            .collect()
    }

    #[inline]
    fn index(&self, col: u16, row: u16) -> Option<usize> {
        (col < self.cols && row < self.rows)
            .then(|| row as usize * self.cols as usize + col as usize)
    }

    /// Half-open cell span covered by `[start, start + len)` pixels.
    fn span(start: f32, len: f32, cell: f32, limit: u16) -> (u16, u16) {
        if !(len > 0.0) {
            return (0, 0);
        }
        let first = (start / cell).floor().max(0.0);
        let last = ((start + len) / cell).ceil().min(limit as f32);
        if last <= first {
            return (0, 0);
        }
        (first as u16, last as u16)
    }

    fn composite(&self, color: PackedRgba, dst: PackedRgba) -> PackedRgba {
        if self.caps.contains(SurfaceCaps::ALPHA) {
            color.over(dst)
        } else {
            PackedRgba::rgb(color.r(), color.g(), color.b())
        }
    }
}

fn sanitize_cell_size(size: f32) -> f32 {
    if size.is_finite() && size > 0.0 { size } else { 1.0 }
}

impl Surface for CellSurface {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(
            self.cols as f32 * self.cell_width,
            self.rows as f32 * self.cell_height,
        )
    }

    fn capabilities(&self) -> SurfaceCaps {
        self.caps
    }

    fn fill_rect(&mut self, rect: PxRect, color: PackedRgba) {
        if !self.caps.contains(SurfaceCaps::FILL) {
            return;
        }
        let (c0, c1) = Self::span(rect.x, rect.width, self.cell_width, self.cols);
        let (r0, r1) = Self::span(rect.y, rect.height, self.cell_height, self.rows);
        let alpha = self.caps.contains(SurfaceCaps::ALPHA);
        for row in r0..r1 {
            for col in c0..c1 {
                let Some(idx) = self.index(col, row) else {
                    continue;
                };
                let bg = self.composite(color, self.cells[idx].bg);
                let cell = &mut self.cells[idx];
                cell.bg = bg;
                if cell.glyph.is_none() {
                    continue;
                }
                if alpha {
                    cell.fg = color.over(cell.fg);
                    if cell.fg.luma() < GLYPH_CLEAR_LUMA {
                        cell.glyph = None;
                    }
                } else {
                    // Opaque fills overwrite.
                    cell.glyph = None;
                    cell.fg = bg;
                }
            }
        }
    }

    fn draw_glyph(&mut self, x: f32, y: f32, glyph: char, color: PackedRgba) {
        if !self.caps.contains(SurfaceCaps::GLYPHS) {
            return;
        }
        if glyph.width().unwrap_or(0) == 0 {
            return;
        }
        if !(x >= 0.0 && y >= 0.0) {
            return;
        }
        let col = (x / self.cell_width).floor();
        let row = (y / self.cell_height).floor();
        if col >= self.cols as f32 || row >= self.rows as f32 {
            return;
        }
        let Some(idx) = self.index(col as u16, row as u16) else {
            return;
        };
        let fg = self.composite(color, self.cells[idx].bg);
        let cell = &mut self.cells[idx];
        cell.glyph = Some(glyph);
        cell.fg = fg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> CellSurface {
        CellSurface::new(4, 3, 10.0, 10.0)
    }

    #[test]
    fn size_is_grid_times_cell() {
        let s = surface();
        assert_eq!(s.size(), SurfaceSize::new(40.0, 30.0));
        assert_eq!(s.cells().len(), 12);
    }

    #[test]
    fn glyph_lands_in_containing_cell() {
        let mut s = surface();
        s.draw_glyph(25.0, 19.9, 'ｱ', PackedRgba::WHITE);
        assert_eq!(s.cell(2, 1).and_then(|c| c.glyph), Some('ｱ'));
        assert_eq!(s.glyph_count(), 1);
        assert_eq!(s.row_text(1), "  ｱ ");
    }

    #[test]
    fn out_of_range_glyphs_are_ignored() {
        let mut s = surface();
        s.draw_glyph(-1.0, 0.0, 'a', PackedRgba::WHITE);
        s.draw_glyph(0.0, -0.5, 'a', PackedRgba::WHITE);
        s.draw_glyph(40.0, 0.0, 'a', PackedRgba::WHITE);
        s.draw_glyph(0.0, 30.0, 'a', PackedRgba::WHITE);
        s.draw_glyph(f32::NAN, 0.0, 'a', PackedRgba::WHITE);
        assert_eq!(s.glyph_count(), 0);
    }

    #[test]
    fn zero_width_glyph_is_skipped() {
        let mut s = surface();
        s.draw_glyph(0.0, 0.0, '\u{200B}', PackedRgba::WHITE);
        assert_eq!(s.glyph_count(), 0);
    }

    #[test]
    fn translucent_fills_erase_glyphs_eventually() {
        let mut s = surface();
        s.draw_glyph(0.0, 0.0, '7', PackedRgba::rgb(0, 255, 65));
        let fade = PackedRgba::BLACK.with_opacity(0.05);
        let mut frames = 0;
        while s.glyph_count() > 0 && frames < 500 {
            s.fill_all(fade);
            frames += 1;
        }
        assert_eq!(s.glyph_count(), 0);
        assert!(frames > 10, "fade should take many frames, took {frames}");
    }

    #[test]
    fn partial_fill_touches_overlapping_cells_only() {
        let mut s = surface();
        let red = PackedRgba::rgb(255, 0, 0);
        s.fill_rect(PxRect::new(5.0, 0.0, 10.0, 5.0), red);
        assert_eq!(s.cell(0, 0).map(|c| c.bg), Some(red));
        assert_eq!(s.cell(1, 0).map(|c| c.bg), Some(red));
        assert_eq!(s.cell(2, 0).map(|c| c.bg), Some(PackedRgba::BLACK));
        assert_eq!(s.cell(0, 1).map(|c| c.bg), Some(PackedRgba::BLACK));
    }

    #[test]
    fn missing_capabilities_turn_ops_into_noops() {
        let mut s = surface().with_capabilities(SurfaceCaps::FILL);
        s.draw_glyph(0.0, 0.0, 'x', PackedRgba::WHITE);
        assert_eq!(s.glyph_count(), 0);

        let mut s = surface().with_capabilities(SurfaceCaps::GLYPHS);
        s.fill_all(PackedRgba::WHITE);
        assert_eq!(s.cell(0, 0).map(|c| c.bg), Some(PackedRgba::BLACK));
    }

    #[test]
    fn resize_resets_grid() {
        let mut s = surface();
        s.draw_glyph(0.0, 0.0, 'x', PackedRgba::WHITE);
        s.resize(2, 2);
        assert_eq!(s.cells().len(), 4);
        assert_eq!(s.glyph_count(), 0);
        assert_eq!(s.size(), SurfaceSize::new(20.0, 20.0));
    }

    #[test]
    fn invalid_cell_size_falls_back_to_one_pixel() {
        let s = CellSurface::new(3, 2, 0.0, f32::NAN);
        assert_eq!(s.size(), SurfaceSize::new(3.0, 2.0));
    }
}
