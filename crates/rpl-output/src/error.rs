//! Error types for rpl-output.

use rpl_core::CoreError;
use thiserror::Error;

/// Errors that can occur when writing simulation output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;

/// Surfaces through `EventLog::flush`, which speaks `CoreError`.
impl From<OutputError> for CoreError {
    fn from(e: OutputError) -> Self {
        match e {
            OutputError::Io(io) => CoreError::Io(io),
            OutputError::Csv(csv) => CoreError::Io(std::io::Error::other(csv)),
        }
    }
}
