#![forbid(unsafe_code)]

//! Demo state: a title element with element effects over a rain backdrop.
//!
//! Layout, top to bottom: the title row, the status row, then the rain
//! surface filling the rest of the terminal. The scan-line overlay, when
//! present on the title, dims rows across the whole screen.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use neonfx::{
    CellSurface, CombinedEffect, EffectsConfig, Element, PackedRgba, RainRenderer, Runtime,
    VisualProps,
};
use tracing::debug;

/// Text shown on the title row.
pub const TITLE: &str = "N E O N F X";

/// Rows above the rain surface.
pub const HEADER_ROWS: u16 = 2;

/// Element pixels per terminal column when mapping glitch offsets.
const PX_PER_COL: f32 = 2.0;

const NEON: PackedRgba = PackedRgba::rgb(0xFF, 0x2E, 0x88);
const STATUS_FG: PackedRgba = PackedRgba::rgb(0x80, 0x80, 0x80);

/// What the main loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// One composed terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenCell {
    pub ch: char,
    pub fg: PackedRgba,
    pub bg: PackedRgba,
}

impl Default for ScreenCell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: PackedRgba::WHITE,
            bg: PackedRgba::BLACK,
        }
    }
}

/// Everything the demo owns.
pub struct DemoApp {
    runtime: Runtime,
    title: Element,
    effects: CombinedEffect,
    rain: Option<RainRenderer<CellSurface>>,
    label: String,
    cols: u16,
    rows: u16,
    last_action: String,
}

impl DemoApp {
    /// Build the demo for a `cols x rows` terminal.
    ///
    /// Rain options, if any, drive a backdrop renderer that owns the rain
    /// surface; everything else is attached to the title element.
    pub fn new(
        runtime: Runtime,
        mut config: EffectsConfig,
        label: impl Into<String>,
        cols: u16,
        rows: u16,
    ) -> neonfx::Result<Self> {
        let rain_options = config.rain.take();
        let autostart = config.autostart;
        let title = Element::new("title");
        let effects = CombinedEffect::create(&runtime, &title, config)?;
        let rain = match rain_options {
            Some(options) => {
                let cell = options.cell_size;
                let surface = CellSurface::new(cols, rain_rows(rows), cell, cell);
                let mut renderer = RainRenderer::create(&runtime, surface, options)?;
                if autostart {
                    renderer.start();
                }
                Some(renderer)
            }
            None => None,
        };
        Ok(Self {
            runtime,
            title,
            effects,
            rain,
            label: label.into(),
            cols,
            rows,
            last_action: String::from("ready"),
        })
    }

    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[must_use]
    pub fn title(&self) -> &Element {
        &self.title
    }

    #[must_use]
    pub fn rain(&self) -> Option<&RainRenderer<CellSurface>> {
        self.rain.as_ref()
    }

    #[must_use]
    pub fn last_action(&self) -> &str {
        &self.last_action
    }

    /// Apply one key press.
    pub fn handle_char(&mut self, ch: char) -> Action {
        let outcome = match ch.to_ascii_lowercase() {
            'q' => return Action::Quit,
            'g' => describe("glitch", self.effects.trigger_glitch()),
            'f' => describe("flicker", self.effects.flicker_neon(None)),
            's' => {
                let running = self
                    .effects
                    .scan_lines()
                    .is_some_and(neonfx::ScanLines::is_running);
                if running {
                    describe("scan lines off", self.effects.stop_scan_lines())
                } else {
                    describe("scan lines on", self.effects.start_scan_lines())
                }
            }
            'r' => match self.rain.as_mut() {
                Some(rain) if rain.is_running() => describe("rain off", rain.stop()),
                Some(rain) => describe("rain on", rain.start()),
                None => describe("rain", false),
            },
            _ => return Action::Continue,
        };
        debug!(key = %ch, outcome = %outcome, "key handled");
        self.last_action = outcome;
        Action::Continue
    }

    /// Advance effect time by `dt`.
    pub fn tick(&self, dt: Duration) -> usize {
        self.runtime.advance(dt)
    }

    /// Follow a terminal resize.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) == (self.cols, self.rows) {
            return;
        }
        self.cols = cols;
        self.rows = rows;
        if let Some(rain) = self.rain.as_ref() {
            rain.with_surface_mut(|surface| surface.resize(cols, rain_rows(rows)));
        }
        debug!(cols, rows, "showcase resized");
    }

    /// Compose the full screen, row-major, `rows` rows of `cols` cells.
    #[must_use]
    pub fn compose(&self) -> Vec<Vec<ScreenCell>> {
        let props = self.title.snapshot();
        let width = self.cols as usize;
        let mut screen = vec![vec![ScreenCell::default(); width]; self.rows as usize];

        if let Some(row) = screen.get_mut(0) {
            draw_title(row, &props);
        }
        if let Some(row) = screen.get_mut(1) {
            let status = self.status_line();
            for (cell, ch) in row.iter_mut().zip(status.chars()) {
                cell.ch = ch;
                cell.fg = STATUS_FG;
            }
        }
        if let Some(rain) = self.rain.as_ref() {
            rain.with_surface(|surface| {
                for (r, row) in screen.iter_mut().skip(HEADER_ROWS as usize).enumerate() {
                    for (c, cell) in row.iter_mut().enumerate() {
                        if let Some(src) = surface.cell(c as u16, r as u16) {
                            cell.bg = src.bg;
                            if let Some(glyph) = src.glyph {
                                cell.ch = glyph;
                                cell.fg = src.fg.over(src.bg);
                            }
                        }
                    }
                }
            });
        }

        if let Some(overlay) = props.overlay
            && overlay.spacing >= 1.0
        {
            for (r, row) in screen.iter_mut().enumerate() {
                if (r as f32 + overlay.offset) % overlay.spacing < 1.0 {
                    let shade = overlay.color.with_opacity(overlay.opacity);
                    for cell in row.iter_mut() {
                        cell.fg = shade.over(cell.fg);
                        cell.bg = shade.over(cell.bg);
                    }
                }
            }
        }
        screen
    }

    /// One-line summary of demo state.
    #[must_use]
    pub fn status_line(&self) -> String {
        let rain = match self.rain.as_ref() {
            Some(r) if r.is_running() => "on",
            Some(_) => "off",
            None => "-",
        };
        format!(
            "[{}] g glitch  f flicker  s scan  r rain({rain})  q quit | {}",
            self.label, self.last_action
        )
    }

    /// Write the composed screen to `out`.
    pub fn draw(&self, out: &mut impl Write) -> io::Result<()> {
        for (r, row) in self.compose().iter().enumerate() {
            crossterm::queue!(out, MoveTo(0, r as u16))?;
            for cell in row {
                crossterm::queue!(
                    out,
                    SetForegroundColor(to_color(cell.fg)),
                    SetBackgroundColor(to_color(cell.bg)),
                    Print(cell.ch)
                )?;
            }
        }
        crossterm::queue!(out, ResetColor)?;
        out.flush()
    }

    /// Tear every effect down.
    pub fn shutdown(&mut self) -> neonfx::Result<()> {
        if let Some(rain) = self.rain.as_mut() {
            rain.destroy()?;
        }
        self.effects.destroy()?;
        Ok(())
    }
}

fn describe(what: &str, ok: bool) -> String {
    if ok {
        what.to_string()
    } else {
        format!("{what} unavailable")
    }
}

fn rain_rows(rows: u16) -> u16 {
    rows.saturating_sub(HEADER_ROWS)
}

fn to_color(c: PackedRgba) -> Color {
    Color::Rgb {
        r: c.r(),
        g: c.g(),
        b: c.b(),
    }
}

fn draw_title(row: &mut [ScreenCell], props: &VisualProps) {
    let len = TITLE.chars().count();
    let start = (row.len().saturating_sub(len) / 2) as i32;
    let shift = (props.offset_x / PX_PER_COL).round() as i32;
    let level = (props.opacity * props.brightness).clamp(0.0, 1.0);

    let mut place = |offset: i32, color: PackedRgba| {
        for (i, ch) in TITLE.chars().enumerate() {
            if ch == ' ' {
                continue;
            }
            let col = start + offset + i as i32;
            if let Some(cell) = usize::try_from(col).ok().and_then(|c| row.get_mut(c)) {
                cell.ch = ch;
                cell.fg = color;
            }
        }
    };

    for shadow in &props.shadows {
        let offset = shift + (shadow.offset_x / PX_PER_COL).round() as i32;
        place(offset, shadow.color.with_opacity(level).over(PackedRgba::BLACK));
    }
    place(shift, NEON.with_opacity(level).over(PackedRgba::BLACK));
}

#[cfg(test)]
mod tests {
    use super::*;
    use neonfx::Preset;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn title_text(screen: &[Vec<ScreenCell>]) -> String {
        screen[0].iter().map(|c| c.ch).collect::<String>().trim().to_string()
    }

    #[test]
    fn matrix_demo_renders_rain_below_header() {
        let mut app =
            DemoApp::new(Runtime::with_seed(4), Preset::Matrix.config(), "matrix", 40, 20).unwrap();
        for _ in 0..20 {
            app.tick(ms(50));
        }
        let screen = app.compose();
        assert_eq!(screen.len(), 20);
        assert_eq!(title_text(&screen), TITLE);
        let glyphs = screen[HEADER_ROWS as usize..]
            .iter()
            .flatten()
            .filter(|c| c.ch != ' ')
            .count();
        assert!(glyphs > 0);
        assert!(app.status_line().contains("rain(on)"));
        app.shutdown().unwrap();
    }

    #[test]
    fn keys_drive_effects() {
        let mut app =
            DemoApp::new(Runtime::with_seed(1), Preset::Matrix.config(), "matrix", 30, 10).unwrap();
        assert_eq!(app.handle_char('g'), Action::Continue);
        assert_eq!(app.last_action(), "glitch");
        assert_eq!(app.handle_char('f'), Action::Continue);
        assert_eq!(app.last_action(), "flicker unavailable");
        app.handle_char('r');
        assert_eq!(app.last_action(), "rain off");
        assert!(!app.rain().is_some_and(RainRenderer::is_running));
        app.handle_char('R');
        assert_eq!(app.last_action(), "rain on");
        assert_eq!(app.handle_char('x'), Action::Continue);
        assert_eq!(app.handle_char('q'), Action::Quit);
    }

    #[test]
    fn scan_line_toggle_dims_rows() {
        let config = EffectsConfig {
            scan_lines: Some(neonfx::ScanLineOptions {
                scroll_speed: 0.0,
                opacity: 0.5,
                ..neonfx::ScanLineOptions::default()
            }),
            ..EffectsConfig::default()
        };
        let mut app = DemoApp::new(Runtime::new(), config, "custom", 20, 6).unwrap();
        let dimmed = app.compose();
        assert_eq!(dimmed[2][0].fg, PackedRgba::WHITE);
        assert_ne!(dimmed[3][0].fg, PackedRgba::WHITE);

        app.handle_char('s');
        assert_eq!(app.last_action(), "scan lines off");
        let plain = app.compose();
        assert_eq!(plain[3][0].fg, PackedRgba::WHITE);
        app.handle_char('s');
        assert_eq!(app.last_action(), "scan lines on");
    }

    #[test]
    fn glitch_shifts_title_then_restores() {
        let config = EffectsConfig {
            glitch: Some(neonfx::GlitchOptions {
                intensity: neonfx::GlitchIntensity::Intense,
                ..neonfx::GlitchOptions::default()
            }),
            ..EffectsConfig::default()
        };
        let mut app = DemoApp::new(Runtime::new(), config, "custom", 40, 4).unwrap();
        let before = app.compose()[0].clone();
        app.handle_char('g');
        assert_ne!(app.compose()[0], before);
        app.tick(ms(250));
        assert_eq!(app.compose()[0], before);
    }

    #[test]
    fn resize_follows_terminal() {
        let mut app =
            DemoApp::new(Runtime::new(), Preset::Matrix.config(), "matrix", 20, 10).unwrap();
        app.resize(50, 12);
        assert_eq!(app.compose().len(), 12);
        assert_eq!(app.compose()[0].len(), 50);
        let rows = app.rain().map(|r| r.with_surface(|s| s.rows()));
        assert_eq!(rows, Some(10));
        app.tick(ms(16));
        assert_eq!(app.rain().map(RainRenderer::column_count), Some(50));
    }

    #[test]
    fn draw_emits_every_row() {
        let app = DemoApp::new(Runtime::new(), Preset::Terminal.config(), "terminal", 10, 3).unwrap();
        let mut out = Vec::new();
        app.draw(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("N"));
        assert!(text.matches("\u{1b}[").count() > 30);
    }
}
