//! `rpl-core` — foundational types for the RPL/Trickle simulator.
//!
//! Every other `rpl-*` crate depends on this one.  It has no `rpl-*`
//! dependencies of its own.
//!
//! # What lives here
//!
//! | Module           | Contents                                               |
//! |------------------|--------------------------------------------------------|
//! | [`ids`]          | `NodeId`, `NeighborId`, `LinkAddr`, IPv6 addressing    |
//! | [`time`]         | `Tick`, `SlotClock`                                    |
//! | [`rng`]          | `NodeRng` (per-node), `SimRng` (harness)               |
//! | [`settings`]     | `Settings`, `TrickleVariant`, `DisMode`                |
//! | [`log`]          | `EventLog` sink trait, `LogRecord`, in-memory sinks    |
//! | [`capability`]   | `NeighborSource`, `ChannelProbe`                       |
//! | [`error`]        | `CoreError`, `CoreResult`, `check_probability`         |

pub mod capability;
pub mod error;
pub mod ids;
pub mod log;
pub mod rng;
pub mod settings;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use capability::{neighbor_count, ChannelProbe, NeighborSource};
pub use error::{check_probability, CoreError, CoreResult};
pub use ids::{
    global_addr, link_local_addr, link_of, Address, LinkAddr, NeighborId, NodeId, ALL_RPL_NODES,
};
pub use log::{DioKind, EventLog, IntervalStats, LogEntry, LogRecord, MemoryLog, NullLog, ResetCause};
pub use rng::{NodeRng, SimRng};
pub use settings::{DisMode, Settings, TrickleVariant};
pub use time::{SlotClock, Tick};
