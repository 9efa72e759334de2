//! Append-only structured event log.
//!
//! The protocol layers call [`EventLog::record`] at fixed points (interval
//! statistics, Trickle resets, parent churn, control-message tx/rx).  What is
//! recorded and when is part of the observable contract; where it ends up is
//! the sink's business (`MemoryLog` for tests, the CSV sink in `rpl-output`
//! for experiments).

use std::fmt;

use serde::Serialize;

use crate::{Address, CoreResult, LinkAddr, NodeId, Tick};

// ── Record payloads ───────────────────────────────────────────────────────────

/// Why a Trickle timer was (re)started.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCause {
    Start,
    NewRank,
    DisReceived,
    InfiniteRank,
    JoinedDodag,
    External,
}

impl fmt::Display for ResetCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResetCause::Start        => "start",
            ResetCause::NewRank      => "new rank",
            ResetCause::DisReceived  => "receive DIS",
            ResetCause::InfiniteRank => "infinite rank",
            ResetCause::JoinedDodag  => "join rpl",
            ResetCause::External     => "external",
        };
        f.write_str(s)
    }
}

/// Why a DIO was sent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DioKind {
    /// Emitted by the Trickle timer.
    Trickle,
    /// Answer to a DIS.
    DisReply,
    /// Infinite-rank advertisement after losing the last parent.
    NoParent,
}

/// Statistics snapshot emitted when a Trickle interval begins.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IntervalStats {
    /// Intervals begun so far (including this one).
    pub state:          u64,
    /// Doublings since the last reset.
    pub doublings:      u32,
    pub interval_ms:    u64,
    pub redundancy:     u32,
    /// Consistent receptions counted in the interval that just ended.
    pub counter:        u32,
    pub transmitted:    u64,
    pub suppressed:     u64,
    pub resets:         u64,
    pub p_reset:        f64,
    pub p_stable:       f64,
    pub p_transmit:     f64,
    pub p_busy:         f64,
    pub p_free:         f64,
    /// Transmission instant drawn for this interval, relative to its start.
    pub t_ms:           f64,
    /// Time between window start and the transmission instant.
    pub listen_ms:      f64,
    pub window_cells:   u64,
    pub used_cells:     u64,
    pub neighbors:      usize,
    pub epsilon:        f64,
    pub average_reward: f64,
}

/// One structured event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogRecord {
    TrickleInterval { node: NodeId, stats: IntervalStats },
    TrickleReset    { node: NodeId, cause: ResetCause },
    ParentChange    { node: NodeId, rank: Option<u32>, parent: Option<LinkAddr> },
    LocalRepair     { node: NodeId },
    Joined          { node: NodeId, dodag_id: Address },
    DioTx           { node: NodeId, dst: Address, rank: u32, dodag_id: Address, kind: DioKind },
    DioRx           { node: NodeId, src: LinkAddr, rank: u32, dodag_id: Address },
    DisTx           { node: NodeId, dst: Address },
    DisRx           { node: NodeId, src: LinkAddr, dst: Address },
    DaoTx           { node: NodeId, parent: Address },
    DaoRx           { node: NodeId, child: Address, parent: Address },
}

impl LogRecord {
    /// The node that emitted the record.
    pub fn node(&self) -> NodeId {
        match *self {
            LogRecord::TrickleInterval { node, .. }
            | LogRecord::TrickleReset { node, .. }
            | LogRecord::ParentChange { node, .. }
            | LogRecord::LocalRepair { node }
            | LogRecord::Joined { node, .. }
            | LogRecord::DioTx { node, .. }
            | LogRecord::DioRx { node, .. }
            | LogRecord::DisTx { node, .. }
            | LogRecord::DisRx { node, .. }
            | LogRecord::DaoTx { node, .. }
            | LogRecord::DaoRx { node, .. } => node,
        }
    }

    /// Short snake_case name of the record kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LogRecord::TrickleInterval { .. } => "trickle_interval",
            LogRecord::TrickleReset { .. }    => "trickle_reset",
            LogRecord::ParentChange { .. }    => "parent_change",
            LogRecord::LocalRepair { .. }     => "local_repair",
            LogRecord::Joined { .. }          => "joined",
            LogRecord::DioTx { .. }           => "dio_tx",
            LogRecord::DioRx { .. }           => "dio_rx",
            LogRecord::DisTx { .. }           => "dis_tx",
            LogRecord::DisRx { .. }           => "dis_rx",
            LogRecord::DaoTx { .. }           => "dao_tx",
            LogRecord::DaoRx { .. }           => "dao_rx",
        }
    }
}

/// A record stamped with the tick it was emitted at.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub tick:   Tick,
    pub record: LogRecord,
}

// ── Sink trait ────────────────────────────────────────────────────────────────

/// Append-only sink for structured records.
///
/// `record` is infallible from the caller's side; sinks that can fail keep
/// the first error and surface it from `flush`.
pub trait EventLog {
    fn record(&mut self, tick: Tick, record: LogRecord);

    /// Push buffered records to their destination.  Idempotent.
    fn flush(&mut self) -> CoreResult<()> {
        Ok(())
    }
}

/// A sink that drops everything.
#[derive(Debug, Default)]
pub struct NullLog;

impl EventLog for NullLog {
    #[inline]
    fn record(&mut self, _tick: Tick, _record: LogRecord) {}
}

/// A sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Vec<LogEntry>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }

    /// Entries emitted by `node`, in order.
    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.record.node() == node)
    }

    /// Number of entries of the given kind (see [`LogRecord::kind`]).
    pub fn count_kind(&self, kind: &str) -> usize {
        self.entries.iter().filter(|e| e.record.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EventLog for MemoryLog {
    fn record(&mut self, tick: Tick, record: LogRecord) {
        self.entries.push(LogEntry { tick, record });
    }
}

impl<L: EventLog + ?Sized> EventLog for Box<L> {
    fn record(&mut self, tick: Tick, record: LogRecord) {
        (**self).record(tick, record);
    }

    fn flush(&mut self) -> CoreResult<()> {
        (**self).flush()
    }
}
