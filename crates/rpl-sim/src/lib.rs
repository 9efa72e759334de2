//! `rpl-sim` — harness running one RPL stack per node over a static
//! topology.
//!
//! # Event flow
//!
//! ```text
//! tick 1          Boot(node)        root creates the DODAG, others send DIS
//! timer fires     Timer(node, t)    Trickle / DIS / DAO timers of one node
//! after dispatch  outbox drained    DIO/DIS → shared cell, each neighbor
//!                                   receives with the link PDR
//!                                   DAO → dedicated cell, one hop, the
//!                                   sender gets ack feedback
//! next tick       Deliver(frame)    on_dio / on_dis / on_dao at the receiver
//! end_tick        run stops
//! ```
//!
//! A handler error or panic aborts the run; [`Sim::run`] returns
//! [`SimError::Crashed`] carrying the last tick and the settings in effect.
//! The crashed sim refuses to run or report again ([`SimError::Aborted`]).
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use rpl_core::{MemoryLog, Settings};
//! use rpl_sim::{SimBuilder, Topology};
//!
//! let mut sim = SimBuilder::new(Settings::default(), Topology::line(4, 1.0)?)
//!     .log(MemoryLog::new())
//!     .build()?;
//! sim.run()?;
//! for report in sim.reports()? {
//!     println!("{} rank {:?}", report.node, report.state.rank);
//! }
//! ```

pub mod builder;
pub mod error;
pub mod event;
pub mod sim;
pub mod topology;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use error::{CrashReport, SimError, SimResult};
pub use event::{Action, EventQueue, Frame, SharedCell, Tag};
pub use sim::{FrameStats, Mote, Network, NodeReport, Sim, SimHandle};
pub use topology::Topology;
