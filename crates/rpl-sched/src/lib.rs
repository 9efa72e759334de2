//! `rpl-sched` — the simulation's notion of time and ordering.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`scheduler`] | `Scheduler<T, A>`, `SubOrder`, `Placement`                |
//! | [`run`]       | `Dispatch` trait, drain loop, `RunOutcome`, `StopReason`  |
//! | [`error`]     | `SchedError`, `SchedResult<T>`                            |
//!
//! # Event model (summary)
//!
//! ```text
//! event      = (tick, sub_order, tag, action)
//! ordering   = tick, then sub_order (Admin < Stack), then registration order
//! identity   = tag; registering an existing tag replaces its event
//! ```
//!
//! Actions are plain data (continuation objects), not closures.  The
//! dispatcher owns all mutable simulation state and interprets each action
//! when it fires.

pub mod error;
pub mod run;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use error::{DispatchError, SchedError, SchedResult};
pub use run::{Dispatch, RunOutcome, StopReason};
pub use scheduler::{Placement, Scheduler, SubOrder};
