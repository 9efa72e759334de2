//! `rpl-output` — CSV sinks for simulation records.
//!
//! | File                    | Written by               | One row per                   |
//! |-------------------------|--------------------------|-------------------------------|
//! | `events.csv`            | [`CsvEventLog`]          | reset, churn, DIO/DIS/DAO tx/rx |
//! | `trickle_intervals.csv` | [`CsvEventLog`]          | Trickle interval begun        |
//! | `nodes.csv`             | [`write_node_reports`]   | node, at the end of the run   |
//!
//! # Usage
//!
//! ```rust,ignore
//! use rpl_output::{write_node_reports, CsvEventLog};
//!
//! let log = CsvEventLog::new(Path::new("./output"))?;
//! let mut sim = SimBuilder::new(settings, topology).log(log).build()?;
//! sim.run()?;
//! write_node_reports(Path::new("./output"), &sim.reports()?)?;
//! ```

pub mod csv;
pub mod error;
pub mod row;


pub use crate::csv::{write_node_reports, CsvEventLog};
pub use error::{OutputError, OutputResult};
pub use row::{EventRow, IntervalRow, NodeRow, Row};
