//! CSV output backend.
//!
//! [`CsvEventLog`] creates two files in the configured output directory:
//! - `events.csv`
//! - `trickle_intervals.csv`
//!
//! [`write_node_reports`] writes `nodes.csv` after a run.

use std::fs::File;
use std::path::Path;

use csv::{Writer, WriterBuilder};
use rpl_core::{CoreResult, EventLog, LogRecord, Tick};
use rpl_sim::NodeReport;

use crate::row::{EventRow, IntervalRow, NodeRow, Row};
use crate::{OutputError, OutputResult};

/// Open `path` for headerless serialization and write `header` by hand, so
/// the header is present even when no row follows.
fn open(path: &Path, header: &[&str]) -> OutputResult<Writer<File>> {
    let mut w = WriterBuilder::new().has_headers(false).from_path(path)?;
    w.write_record(header)?;
    Ok(w)
}

/// An [`EventLog`] writing every record to CSV.
///
/// `record` cannot fail, so write errors are stored and the first one is
/// returned from [`flush`][EventLog::flush] (or [`take_error`][Self::take_error]).
/// Records arriving after an error are dropped.
pub struct CsvEventLog {
    events:     Writer<File>,
    intervals:  Writer<File>,
    last_error: Option<OutputError>,
    written:    u64,
}

impl CsvEventLog {
    /// Create (or truncate) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        Ok(Self {
            events:     open(&dir.join("events.csv"), &EventRow::HEADER)?,
            intervals:  open(&dir.join("trickle_intervals.csv"), &IntervalRow::HEADER)?,
            last_error: None,
            written:    0,
        })
    }

    /// Rows written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Take the stored write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    fn write(&mut self, tick: Tick, record: &LogRecord) -> OutputResult<()> {
        match Row::from_record(tick, record) {
            Row::Event(row) => self.events.serialize(row)?,
            Row::Interval(row) => self.intervals.serialize(row)?,
        }
        self.written += 1;
        Ok(())
    }
}

impl EventLog for CsvEventLog {
    fn record(&mut self, tick: Tick, record: LogRecord) {
        if self.last_error.is_some() {
            return;
        }
        if let Err(e) = self.write(tick, &record) {
            tracing::warn!(error = %e, %tick, "CSV event log write failed; further records dropped");
            self.last_error = Some(e);
        }
    }

    fn flush(&mut self) -> CoreResult<()> {
        if let Some(e) = self.last_error.take() {
            return Err(e.into());
        }
        self.events.flush()?;
        self.intervals.flush()?;
        Ok(())
    }
}

/// Write one row per node to `dir/nodes.csv`.
pub fn write_node_reports(dir: &Path, reports: &[NodeReport]) -> OutputResult<()> {
    let mut w = open(&dir.join("nodes.csv"), &NodeRow::HEADER)?;
    for report in reports {
        w.serialize(NodeRow::from(report))?;
    }
    w.flush()?;
    Ok(())
}
