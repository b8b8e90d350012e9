#![forbid(unsafe_code)]

//! File logging for the showcase.
//!
//! The terminal is in raw mode on the alternate screen, so events go to a
//! file instead of stderr. `RUST_LOG` overrides [`DEFAULT_FILTER`].

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,neonfx_effects=debug,neonfx_showcase=debug";

/// Build the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber writing plain-text events to `path`.
///
/// # Errors
///
/// Fails when the file cannot be created. A subscriber installed earlier is
/// left in place and reported as success.
pub fn init_file_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();
    if installed.is_ok() {
        tracing::info!(path = %path.display(), "file logging initialised");
    }
    Ok(())
}
