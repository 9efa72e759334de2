//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// Errors raised by `rpl-core` primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A value that must be a probability fell outside `[0, 1]`.
    #[error("probability `{name}` out of range: {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `rpl-core`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Tolerance for floating-point noise around the `[0, 1]` bounds.
const PROBABILITY_EPSILON: f64 = 1e-9;

/// Check that `value` is a probability and return it clamped to `[0, 1]`.
///
/// Values within floating-point noise of the bounds are clamped; anything
/// further out (or NaN) is a contract violation.
pub fn check_probability(name: &'static str, value: f64) -> CoreResult<f64> {
    if value.is_nan() || value < -PROBABILITY_EPSILON || value > 1.0 + PROBABILITY_EPSILON {
        return Err(CoreError::ProbabilityOutOfRange { name, value });
    }
    Ok(value.clamp(0.0, 1.0))
}
