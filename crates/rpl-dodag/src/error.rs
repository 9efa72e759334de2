use rpl_core::CoreError;
use rpl_trickle::TrickleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RplError {
    #[error("rpl configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Trickle(#[from] TrickleError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type RplResult<T> = Result<T, RplError>;
