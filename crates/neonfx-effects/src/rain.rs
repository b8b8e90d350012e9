#![forbid(unsafe_code)]

//! Matrix rain.
//!
//! The surface is divided into vertical lanes ([`Column`]s), one per
//! `cell_size` pixels of width. Every accepted frame:
//!
//! 1. a translucent fill in the fade color dims what was drawn before,
//! 2. each due column appends a random glyph to its bounded trail,
//! 3. every trail glyph is drawn below the column's leading edge with a
//!    three-tier brightness (white head, two bright glyphs, linear tail),
//! 4. columns advance by `fall_speed * cell_size` and reset once the whole
//!    trail has left the surface.
//!
//! [`RainField`] is that per-frame state machine with no scheduling attached.
//! [`RainRenderer`] owns a surface and a field and runs the field from the
//! runtime's frame clock, throttled to `frame_delay`.
//!
//! # Invariants
//!
//! 1. `trail.len() <= trail_length` for every column after every frame.
//! 2. A column whose `vertical_position` exceeds
//!    `surface_height + trail_length * cell_size` is reset within the same
//!    frame: empty trail, position `-trail_length * cell_size`.
//! 3. Two accepted frames are never closer than `frame_delay`.
//! 4. Column count is `floor(surface_width / cell_size)` for the last
//!    observed surface size.
//!
//! # Failure Modes
//!
//! - Zero-size surface: paint work is skipped, the frame subscription stays.
//! - Surface without fill or glyph support: [`RainRenderer::create`] fails
//!   with [`FxError::UnsupportedSurface`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use neonfx_core::{FrameSubscription, FxRng};
use neonfx_render::{PackedRgba, Surface, SurfaceCaps, SurfaceSize};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ConfigError, FxError, finish_validation};
use crate::runtime::Runtime;
use crate::styles;

/// Half-width katakana followed by digits.
pub const MATRIX_GLYPHS: &str = "ｱｲｳｴｵｶｷｸｹｺｻｼｽｾｿﾀﾁﾂﾃﾄﾅﾆﾇﾈﾉﾊﾋﾌﾍﾎﾏﾐﾑﾒﾓﾔﾕﾖﾗﾘﾙﾚﾛﾜﾝ0123456789";

/// Brightness of the leading glyph.
pub const HEAD_BRIGHTNESS: f32 = 1.0;
/// Brightness of the two glyphs directly behind the head, nearest first.
pub const SECONDARY_BRIGHTNESS: [f32; 2] = [0.9, 0.85];
/// Scale of the linear tail fade, `scale * index / len`.
pub const TAIL_BRIGHTNESS_SCALE: f32 = 0.8;

const REQUIRED_CAPS: SurfaceCaps = SurfaceCaps::FILL.union(SurfaceCaps::GLYPHS);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Rain tuning. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainOptions {
    /// Alphabet glyphs are drawn from.
    pub glyphs: String,
    /// Lane width and row height in pixels.
    pub cell_size: f32,
    /// Minimum time between accepted frames.
    #[serde(with = "crate::millis")]
    pub frame_delay: Duration,
    /// Probability in `[0, 1]` that a column starts on the surface.
    pub density: f32,
    pub glyph_color: PackedRgba,
    pub head_color: PackedRgba,
    pub fade_color: PackedRgba,
    /// Opacity of the per-frame decay fill.
    pub fade_opacity: f32,
    pub trail_length: usize,
    pub min_fall_speed: f32,
    pub max_fall_speed: f32,
    #[serde(with = "crate::millis")]
    pub min_glyph_interval: Duration,
    #[serde(with = "crate::millis")]
    pub max_glyph_interval: Duration,
    /// Upper bound of the random delay before a reset column appends again.
    #[serde(with = "crate::millis")]
    pub reset_jitter: Duration,
    pub seed: Option<u64>,
}

impl Default for RainOptions {
    fn default() -> Self {
        Self {
            glyphs: MATRIX_GLYPHS.to_string(),
            cell_size: 16.0,
            frame_delay: Duration::from_millis(50),
            density: 0.7,
            glyph_color: PackedRgba::rgb(0x00, 0xFF, 0x41),
            head_color: PackedRgba::rgb(0xE6, 0xFF, 0xE6),
            fade_color: PackedRgba::BLACK,
            fade_opacity: 0.05,
            trail_length: 20,
            min_fall_speed: 0.5,
            max_fall_speed: 1.5,
            min_glyph_interval: Duration::from_millis(40),
            max_glyph_interval: Duration::from_millis(160),
            reset_jitter: Duration::from_millis(800),
            seed: None,
        }
    }
}

impl RainOptions {
    /// Validate constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.glyphs.chars().next().is_none() {
            errors.push(ConfigError::new("rain.glyphs", "", "must contain at least one glyph"));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            errors.push(ConfigError::new(
                "rain.cell_size",
                self.cell_size.to_string(),
                "must be a finite number > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.density) {
            errors.push(ConfigError::new(
                "rain.density",
                self.density.to_string(),
                "must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.fade_opacity) {
            errors.push(ConfigError::new(
                "rain.fade_opacity",
                self.fade_opacity.to_string(),
                "must be within [0, 1]",
            ));
        }
        if self.trail_length == 0 {
            errors.push(ConfigError::new("rain.trail_length", "0", "must be >= 1"));
        }
        if !(self.min_fall_speed.is_finite() && self.min_fall_speed > 0.0) {
            errors.push(ConfigError::new(
                "rain.min_fall_speed",
                self.min_fall_speed.to_string(),
                "must be a finite number > 0",
            ));
        }
        if !(self.max_fall_speed.is_finite() && self.max_fall_speed >= self.min_fall_speed) {
            errors.push(ConfigError::new(
                "rain.max_fall_speed",
                self.max_fall_speed.to_string(),
                "must be finite and >= min_fall_speed",
            ));
        }
        if self.max_glyph_interval < self.min_glyph_interval {
            errors.push(ConfigError::new(
                "rain.max_glyph_interval",
                format!("{}ms", self.max_glyph_interval.as_millis()),
                "must be >= min_glyph_interval",
            ));
        }
        finish_validation(errors)
    }

    /// Lowest y a column may reach before it is reset.
    fn reset_limit(&self, height: f32) -> f32 {
        height + self.trail_length as f32 * self.cell_size
    }

    fn reset_position(&self) -> f32 {
        -(self.trail_length as f32) * self.cell_size
    }
}

// ---------------------------------------------------------------------------
// Brightness
// ---------------------------------------------------------------------------

/// Brightness of the glyph at `index` in a trail of `len` glyphs.
///
/// The last index is the head. The two before it use
/// [`SECONDARY_BRIGHTNESS`]. Everything earlier fades linearly with
/// `TAIL_BRIGHTNESS_SCALE * index / len`, which stays below both upper tiers.
#[must_use]
pub fn trail_brightness(index: usize, len: usize) -> f32 {
    if index >= len {
        return 0.0;
    }
    match len - 1 - index {
        0 => HEAD_BRIGHTNESS,
        1 => SECONDARY_BRIGHTNESS[0],
        2 => SECONDARY_BRIGHTNESS[1],
        _ => TAIL_BRIGHTNESS_SCALE * index as f32 / len as f32,
    }
}

fn glyph_color(options: &RainOptions, index: usize, len: usize) -> PackedRgba {
    if index + 1 == len {
        options.head_color
    } else {
        options.glyph_color.with_opacity(trail_brightness(index, len))
    }
}

// ---------------------------------------------------------------------------
// RainField
// ---------------------------------------------------------------------------

/// One vertical lane.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Pixel y of the oldest trail glyph. Negative while above the surface.
    pub vertical_position: f32,
    /// Rows advanced per accepted frame.
    pub fall_speed: f32,
    /// Oldest glyph first, head last.
    pub trail: VecDeque<char>,
    pub next_glyph_at: Duration,
}

/// What one [`RainField::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered { glyphs: usize, resets: usize },
    /// The surface had no area. Nothing was painted.
    EmptySurface,
}

/// Per-frame rain state, independent of any scheduler.
#[derive(Debug, Clone)]
pub struct RainField {
    options: RainOptions,
    glyphs: Vec<char>,
    fade: PackedRgba,
    rng: FxRng,
    size: SurfaceSize,
    columns: Vec<Column>,
}

impl RainField {
    /// Validate `options` and build an empty field. Columns appear on the
    /// first [`resize`](Self::resize) or [`step`](Self::step).
    pub fn new(options: RainOptions, rng: FxRng) -> Result<Self, FxError> {
        options.validate()?;
        let glyphs = options.glyphs.chars().collect();
        let fade = options.fade_color.with_opacity(options.fade_opacity);
        Ok(Self {
            options,
            glyphs,
            fade,
            rng,
            size: SurfaceSize::default(),
            columns: Vec::new(),
        })
    }

    #[must_use]
    pub fn options(&self) -> &RainOptions {
        &self.options
    }

    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Adopt `size`, rebuilding the columns only when the column count
    /// changes. Returns `true` if the columns were rebuilt.
    ///
    /// An empty size is ignored: the last non-empty size and its columns are
    /// kept, so a surface that blinks to zero resumes where it left off.
    pub fn resize(&mut self, size: SurfaceSize, now: Duration) -> bool {
        if size == self.size || size.is_empty() {
            return false;
        }
        let cell = self.options.cell_size;
        let count = (size.width / cell).floor() as usize;
        let had_size = !self.size.is_empty();
        self.size = size;
        if had_size && count == self.columns.len() {
            trace!(width = size.width, height = size.height, "rain columns kept");
            return false;
        }

        self.columns.clear();
        let rows = ((size.height / cell).floor() as usize).max(1);
        for _ in 0..count {
            let fall_speed = self
                .rng
                .range_f32(self.options.min_fall_speed, self.options.max_fall_speed);
            let column = if self.rng.chance(self.options.density as f64) {
                Column {
                    vertical_position: self.rng.below(rows) as f32 * cell,
                    fall_speed,
                    trail: VecDeque::with_capacity(self.options.trail_length),
                    next_glyph_at: now,
                }
            } else {
                Column {
                    vertical_position: self.options.reset_position()
                        - self.rng.range_f32(0.0, size.height),
                    fall_speed,
                    trail: VecDeque::with_capacity(self.options.trail_length),
                    next_glyph_at: now
                        + self.rng.duration_between(Duration::ZERO, self.options.reset_jitter),
                }
            };
            self.columns.push(column);
        }
        debug!(
            width = size.width,
            height = size.height,
            columns = count,
            "rain columns rebuilt"
        );
        true
    }

    /// Run one frame at `now` against `surface`.
    pub fn step<S: Surface + ?Sized>(&mut self, now: Duration, surface: &mut S) -> FrameOutcome {
        let size = surface.size();
        self.resize(size, now);
        if size.is_empty() {
            trace!("rain frame skipped: empty surface");
            return FrameOutcome::EmptySurface;
        }

        surface.fill_all(self.fade);

        let Self {
            options,
            glyphs,
            rng,
            columns,
            ..
        } = self;
        let cell = options.cell_size;
        let limit = options.reset_limit(size.height);
        let mut drawn = 0;
        let mut resets = 0;

        for (lane, column) in columns.iter_mut().enumerate() {
            if now >= column.next_glyph_at {
                if let Some(&glyph) = rng.pick(glyphs) {
                    column.trail.push_back(glyph);
                    while column.trail.len() > options.trail_length {
                        column.trail.pop_front();
                    }
                }
                column.next_glyph_at = now
                    + rng.duration_between(options.min_glyph_interval, options.max_glyph_interval);
            }

            let x = lane as f32 * cell;
            let len = column.trail.len();
            for (index, &glyph) in column.trail.iter().enumerate() {
                let y = column.vertical_position + index as f32 * cell;
                surface.draw_glyph(x, y, glyph, glyph_color(options, index, len));
                drawn += 1;
            }

            column.vertical_position += column.fall_speed * cell;

            if column.vertical_position > limit {
                column.vertical_position = options.reset_position();
                column.trail.clear();
                column.fall_speed = rng.range_f32(options.min_fall_speed, options.max_fall_speed);
                column.next_glyph_at = now + rng.duration_between(Duration::ZERO, options.reset_jitter);
                resets += 1;
            }
        }

        FrameOutcome::Rendered {
            glyphs: drawn,
            resets,
        }
    }
}

// ---------------------------------------------------------------------------
// RainRenderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Destroyed,
}

struct RainShared<S> {
    field: RainField,
    surface: S,
    frame_delay: Duration,
    last_render_at: Option<Duration>,
    rendered_frames: u64,
    skipped_frames: u64,
}

impl<S: Surface> RainShared<S> {
    fn on_frame(&mut self, now: Duration) {
        if let Some(last) = self.last_render_at
            && now.saturating_sub(last) < self.frame_delay
        {
            self.skipped_frames += 1;
            return;
        }
        self.last_render_at = Some(now);
        if let FrameOutcome::Rendered { .. } = self.field.step(now, &mut self.surface) {
            self.rendered_frames += 1;
        }
    }
}

/// Throttled rain renderer that owns its surface.
pub struct RainRenderer<S: Surface + 'static> {
    runtime: Runtime,
    shared: Rc<RefCell<RainShared<S>>>,
    subscription: Option<FrameSubscription>,
    state: RunState,
}

impl<S: Surface + 'static> fmt::Debug for RainRenderer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("RainRenderer")
            .field("state", &self.state)
            .field("columns", &shared.field.columns().len())
            .field("rendered_frames", &shared.rendered_frames)
            .field("last_render_at", &shared.last_render_at)
            .finish()
    }
}

impl<S: Surface + 'static> RainRenderer<S> {
    /// Validate `options`, check the surface, and build an idle renderer.
    pub fn create(runtime: &Runtime, surface: S, options: RainOptions) -> Result<Self, FxError> {
        let rng = runtime.rng_for(options.seed);
        let mut field = RainField::new(options, rng)?;
        let missing = REQUIRED_CAPS.difference(surface.capabilities());
        if !missing.is_empty() {
            return Err(FxError::UnsupportedSurface { missing });
        }
        styles::ensure_base_styles(runtime.styles());

        let frame_delay = field.options.frame_delay;
        field.resize(surface.size(), runtime.now());
        debug!(
            columns = field.columns().len(),
            frame_delay_ms = frame_delay.as_millis() as u64,
            "rain renderer created"
        );
        Ok(Self {
            runtime: runtime.clone(),
            shared: Rc::new(RefCell::new(RainShared {
                field,
                surface,
                frame_delay,
                last_render_at: None,
                rendered_frames: 0,
                skipped_frames: 0,
            })),
            subscription: None,
            state: RunState::Idle,
        })
    }

    /// Subscribe to the frame clock. Returns `false` if already running or
    /// destroyed.
    pub fn start(&mut self) -> bool {
        if self.state != RunState::Idle {
            return false;
        }
        let weak = Rc::downgrade(&self.shared);
        self.subscription = Some(self.runtime.clock().subscribe(move |time| {
            if let Some(shared) = weak.upgrade() {
                shared.borrow_mut().on_frame(time.now);
            }
        }));
        self.state = RunState::Running;
        debug!("rain started");
        true
    }

    /// Cancel the frame subscription. The surface keeps its last image.
    pub fn stop(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.state = RunState::Idle;
        debug!("rain stopped");
        true
    }

    /// Stop permanently. Idempotent.
    pub fn destroy(&mut self) -> Result<(), FxError> {
        if self.state == RunState::Destroyed {
            return Ok(());
        }
        self.stop();
        self.state = RunState::Destroyed;
        debug!("rain destroyed");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state == RunState::Destroyed
    }

    /// Read the surface.
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.shared.borrow().surface)
    }

    /// Mutate the surface, e.g. to resize it.
    pub fn with_surface_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.shared.borrow_mut().surface)
    }

    /// Read the column state.
    pub fn with_field<R>(&self, f: impl FnOnce(&RainField) -> R) -> R {
        f(&self.shared.borrow().field)
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.shared.borrow().field.columns().len()
    }

    /// Time of the most recent accepted frame.
    #[must_use]
    pub fn last_render_at(&self) -> Option<Duration> {
        self.shared.borrow().last_render_at
    }

    /// Accepted frames that painted.
    #[must_use]
    pub fn rendered_frames(&self) -> u64 {
        self.shared.borrow().rendered_frames
    }

    /// Frames rejected by the throttle.
    #[must_use]
    pub fn skipped_frames(&self) -> u64 {
        self.shared.borrow().skipped_frames
    }
}

impl<S: Surface + 'static> Drop for RainRenderer<S> {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}
