#![forbid(unsafe_code)]

//! NeonFX terminal showcase.
//!
//! The binary in `main.rs` wires these modules to a real terminal; tests
//! drive [`app::DemoApp`] headlessly.

pub mod app;
pub mod cli;
pub mod logging;
pub mod session;
