use std::fmt;

use rpl_core::{CoreError, Settings, Tick};
use rpl_dodag::RplError;
use rpl_sched::SchedError;
use thiserror::Error;

/// What an aborted run leaves behind for the operator.
#[derive(Debug)]
pub struct CrashReport {
    /// Last simulated tick.
    pub tick:     Tick,
    pub settings: Settings,
    pub error:    SchedError,
}

impl fmt::Display for CrashReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "simulation crashed at {} (seed {}, variant {:?}): {}",
            self.tick, self.settings.seed, self.settings.trickle_variant, self.error
        )
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Rpl(#[from] RplError),

    #[error("{0}")]
    Crashed(Box<CrashReport>),

    /// The run already crashed; its state is partial and is not resumed.
    #[error("simulation aborted at {tick}; state after a crash is not usable")]
    Aborted { tick: Tick },

    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("simulation thread panicked outside the event loop")]
    WorkerPanicked,
}

impl SimError {
    /// The crash report, if the run aborted inside the event loop.
    pub fn crash_report(&self) -> Option<&CrashReport> {
        match self {
            SimError::Crashed(report) => Some(report),
            _ => None,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
