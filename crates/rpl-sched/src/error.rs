use rpl_core::Tick;
use thiserror::Error;

/// Boxed error returned by a [`Dispatch`][crate::Dispatch] implementation.
pub type DispatchError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SchedError {
    /// Strict placement asked for a tick that is not in the future.
    #[error("cannot schedule at {requested}: current tick is {now}")]
    PastOrPresentTick { requested: Tick, now: Tick },

    #[error("event dispatch failed at {tick}: {source}")]
    Dispatch {
        tick:   Tick,
        #[source]
        source: DispatchError,
    },

    #[error("event panicked at {tick}: {message}")]
    Panicked { tick: Tick, message: String },
}

impl SchedError {
    /// The tick at which the run loop aborted, if this error came from it.
    pub fn tick(&self) -> Option<Tick> {
        match self {
            SchedError::PastOrPresentTick { .. } => None,
            SchedError::Dispatch { tick, .. } | SchedError::Panicked { tick, .. } => Some(*tick),
        }
    }
}

pub type SchedResult<T> = Result<T, SchedError>;
