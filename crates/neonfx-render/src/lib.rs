#![forbid(unsafe_code)]

//! Render-side types for NeonFX.
//!
//! # Role in NeonFX
//! Effects never talk to a concrete display. They draw through the
//! [`Surface`] trait and mutate an [`Element`]'s [`VisualProps`]. Hosts
//! translate those into whatever they present (terminal cells, a canvas, a
//! DOM node).
//!
//! - [`color`]: straight-alpha RGBA color with hex parsing.
//! - [`surface`]: the drawing-surface trait and its capability flags.
//! - [`cell_surface`]: an in-memory cell-grid surface.
//! - [`element`]: the visual target effects override.
//! - [`stylesheet`]: idempotent rule-text registry.

pub mod cell_surface;
pub mod color;
pub mod element;
pub mod stylesheet;
pub mod surface;

pub use cell_surface::{CellSurface, SurfaceCell};
pub use color::{ColorParseError, PackedRgba};
pub use element::{
    EffectKind, EffectKinds, Element, ScanLineOverlay, Shadow, VisualProps, WeakElement,
};
pub use stylesheet::StylesheetRegistry;
pub use surface::{PxRect, Surface, SurfaceCaps, SurfaceSize};
