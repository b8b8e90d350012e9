#![forbid(unsafe_code)]

//! Error types shared by every effect.
//!
//! # Failure Modes
//!
//! | Error | Raised by | Recovery |
//! |-------|-----------|----------|
//! | [`FxError::InvalidConfig`] | any factory | fix the listed fields |
//! | [`FxError::UnsupportedSurface`] | rain factory | use a surface with fill + glyph support |
//! | [`FxError::MissingSurface`] | combinator with rain configured | pass a surface |
//! | [`FxError::AlreadyAttached`] | any element factory | destroy the existing effect first |
//! | [`FxError::TargetReleased`] | `destroy()` after the element was dropped | none needed; timers are still released |
//!
//! Zero-size surfaces are not errors: the frame is skipped and the schedule
//! continues.

use std::fmt;

use neonfx_render::{EffectKind, SurfaceCaps};

/// One invalid configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    pub(crate) fn new(
        field: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised by effect construction and teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FxError {
    /// Options failed validation. Carries every violation, not just the first.
    InvalidConfig(Vec<ConfigError>),
    /// The surface lacks drawing operations the effect needs.
    UnsupportedSurface { missing: SurfaceCaps },
    /// Rain was configured but no surface was supplied.
    MissingSurface,
    /// The element already hosts an effect of this kind.
    AlreadyAttached(EffectKind),
    /// The element was dropped before the effect was destroyed.
    TargetReleased(EffectKind),
}

impl fmt::Display for FxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(errors) => {
                write!(f, "invalid effect configuration: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
            Self::UnsupportedSurface { missing } => {
                write!(f, "surface does not support required operations: {missing:?}")
            }
            Self::MissingSurface => write!(f, "rain effect configured without a surface"),
            Self::AlreadyAttached(kind) => {
                write!(f, "element already hosts a {kind} effect")
            }
            Self::TargetReleased(kind) => {
                write!(f, "{kind} effect target was released before teardown")
            }
        }
    }
}

impl std::error::Error for FxError {}

impl From<Vec<ConfigError>> for FxError {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self::InvalidConfig(errors)
    }
}

/// Every sub-effect teardown that failed during a combined teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownError {
    pub failures: Vec<(EffectKind, FxError)>,
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} effect teardown(s) failed", self.failures.len())?;
        for (kind, err) in &self.failures {
            write!(f, "; {kind}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownError {}

/// Collect validation output into `Result`.
pub(crate) fn finish_validation(errors: Vec<ConfigError>) -> Result<(), Vec<ConfigError>> {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
