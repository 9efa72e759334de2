use rpl_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrickleError {
    #[error("trickle configuration error: {0}")]
    Config(String),

    /// A derived statistic left `[0, 1]`; see [`rpl_core::check_probability`].
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type TrickleResult<T> = Result<T, TrickleError>;
