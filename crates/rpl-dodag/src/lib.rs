//! `rpl-dodag` — RPL routing on top of the Trickle timer.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                     |
//! |----------------|--------------------------------------------------------------|
//! | [`manager`]    | `DodagManager`, `RplTimer`, `RplTimers`, `RplEnv`, `RplCounters` |
//! | [`objective`]  | `ObjectiveFunction`, `OfNone`, `Of0`, `ParentOutcome`        |
//! | [`neighbor`]   | `NeighborTable`, `NeighborRecord`, `CellKind`                |
//! | [`rank`]       | Rank constants and ETX → rank-increase arithmetic            |
//! | [`message`]    | `Dis`, `Dio`, `Dao`, `Message`, `Outgoing`                   |
//! | [`routes`]     | `SourceRoutes` (root-side DAO parent map)                    |
//! | [`error`]      | `RplError`, `RplResult<T>`                                   |
//!
//! Losing a parent, an unusable link or a looping DAO chain are ordinary
//! outcomes here, reported through `ParentOutcome` or `None`.  Only
//! configuration problems and Trickle contract violations are errors.

pub mod error;
pub mod manager;
pub mod message;
pub mod neighbor;
pub mod objective;
pub mod rank;
pub mod routes;


pub use error::{RplError, RplResult};
pub use manager::{DodagConfig, DodagManager, NodeRplState, RplCounters, RplEnv, RplTimer, RplTimers};
pub use message::{Dao, Dio, Dis, Message, Outgoing};
pub use neighbor::{CellKind, NeighborRecord, NeighborTable};
pub use objective::{ObjectiveFunction, Of0, Of0Config, OfNone, ParentOutcome};
pub use routes::SourceRoutes;
