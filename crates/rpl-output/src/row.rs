//! Plain data row types written by the CSV sinks.

use rpl_core::{DioKind, IntervalStats, LogRecord, ResetCause, Tick};
use rpl_sim::NodeReport;
use serde::Serialize;

/// One protocol event other than a Trickle interval.
///
/// Columns that do not apply to the event are left empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub tick:     u64,
    pub node:     u32,
    pub event:    &'static str,
    pub cause:    Option<ResetCause>,
    pub rank:     Option<u32>,
    /// Preferred parent (link address) or reported DAO parent (IPv6).
    pub parent:   Option<String>,
    /// Source or destination of the control message.
    pub peer:     Option<String>,
    pub dodag_id: Option<String>,
    pub dio_kind: Option<DioKind>,
}

impl EventRow {
    pub const HEADER: [&'static str; 9] =
        ["tick", "node", "event", "cause", "rank", "parent", "peer", "dodag_id", "dio_kind"];

    fn empty(tick: Tick, record: &LogRecord) -> Self {
        Self {
            tick:     tick.0,
            node:     record.node().0,
            event:    record.kind(),
            cause:    None,
            rank:     None,
            parent:   None,
            peer:     None,
            dodag_id: None,
            dio_kind: None,
        }
    }
}

/// Statistics of one Trickle interval, as it began.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRow {
    pub tick:           u64,
    pub node:           u32,
    pub state:          u64,
    pub doublings:      u32,
    pub interval_ms:    u64,
    pub redundancy:     u32,
    pub counter:        u32,
    pub transmitted:    u64,
    pub suppressed:     u64,
    pub resets:         u64,
    pub p_reset:        f64,
    pub p_stable:       f64,
    pub p_transmit:     f64,
    pub p_busy:         f64,
    pub p_free:         f64,
    pub t_ms:           f64,
    pub listen_ms:      f64,
    pub window_cells:   u64,
    pub used_cells:     u64,
    pub neighbors:      usize,
    pub epsilon:        f64,
    pub average_reward: f64,
}

impl IntervalRow {
    pub const HEADER: [&'static str; 22] = [
        "tick", "node", "state", "doublings", "interval_ms", "redundancy", "counter",
        "transmitted", "suppressed", "resets", "p_reset", "p_stable", "p_transmit", "p_busy",
        "p_free", "t_ms", "listen_ms", "window_cells", "used_cells", "neighbors", "epsilon",
        "average_reward",
    ];

    fn new(tick: Tick, node: u32, s: &IntervalStats) -> Self {
        Self {
            tick: tick.0,
            node,
            state:          s.state,
            doublings:      s.doublings,
            interval_ms:    s.interval_ms,
            redundancy:     s.redundancy,
            counter:        s.counter,
            transmitted:    s.transmitted,
            suppressed:     s.suppressed,
            resets:         s.resets,
            p_reset:        s.p_reset,
            p_stable:       s.p_stable,
            p_transmit:     s.p_transmit,
            p_busy:         s.p_busy,
            p_free:         s.p_free,
            t_ms:           s.t_ms,
            listen_ms:      s.listen_ms,
            window_cells:   s.window_cells,
            used_cells:     s.used_cells,
            neighbors:      s.neighbors,
            epsilon:        s.epsilon,
            average_reward: s.average_reward,
        }
    }
}

/// A record routed to the file it belongs in.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Event(EventRow),
    Interval(IntervalRow),
}

impl Row {
    pub fn from_record(tick: Tick, record: &LogRecord) -> Self {
        let mut row = EventRow::empty(tick, record);
        match record {
            LogRecord::TrickleInterval { node, stats } => {
                return Row::Interval(IntervalRow::new(tick, node.0, stats));
            }
            LogRecord::TrickleReset { cause, .. } => row.cause = Some(*cause),
            LogRecord::ParentChange { rank, parent, .. } => {
                row.rank = *rank;
                row.parent = parent.map(|p| p.to_string());
            }
            LogRecord::LocalRepair { .. } => {}
            LogRecord::Joined { dodag_id, .. } => row.dodag_id = Some(dodag_id.to_string()),
            LogRecord::DioTx { dst, rank, dodag_id, kind, .. } => {
                row.peer = Some(dst.to_string());
                row.rank = Some(*rank);
                row.dodag_id = Some(dodag_id.to_string());
                row.dio_kind = Some(*kind);
            }
            LogRecord::DioRx { src, rank, dodag_id, .. } => {
                row.peer = Some(src.to_string());
                row.rank = Some(*rank);
                row.dodag_id = Some(dodag_id.to_string());
            }
            LogRecord::DisTx { dst, .. } => row.peer = Some(dst.to_string()),
            LogRecord::DisRx { src, .. } => row.peer = Some(src.to_string()),
            LogRecord::DaoTx { parent, .. } => row.parent = Some(parent.to_string()),
            LogRecord::DaoRx { child, parent, .. } => {
                row.peer = Some(child.to_string());
                row.parent = Some(parent.to_string());
            }
        }
        Row::Event(row)
    }
}

/// End-of-run state of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRow {
    pub node:                u32,
    pub is_root:             bool,
    pub joined:              bool,
    pub rank:                Option<u32>,
    pub dag_rank:            Option<u32>,
    pub parent:              Option<String>,
    pub dio_sent:            u64,
    pub dio_trickle_sent:    u64,
    pub dis_sent:            u64,
    pub dao_sent:            u64,
    pub trickle_transmitted: u64,
    pub trickle_suppressed:  u64,
    pub trickle_resets:      u64,
    pub trickle_intervals:   u64,
    pub interval_ms:         u64,
}

impl NodeRow {
    pub const HEADER: [&'static str; 15] = [
        "node", "is_root", "joined", "rank", "dag_rank", "parent", "dio_sent",
        "dio_trickle_sent", "dis_sent", "dao_sent", "trickle_transmitted", "trickle_suppressed",
        "trickle_resets", "trickle_intervals", "interval_ms",
    ];
}

impl From<&NodeReport> for NodeRow {
    fn from(r: &NodeReport) -> Self {
        Self {
            node:                r.node.0,
            is_root:             r.is_root,
            joined:              r.joined,
            rank:                r.state.rank,
            dag_rank:            r.dag_rank,
            parent:              r.state.preferred_parent.map(|p| p.to_string()),
            dio_sent:            r.counters.dio_sent,
            dio_trickle_sent:    r.counters.dio_trickle_sent,
            dis_sent:            r.counters.dis_sent,
            dao_sent:            r.counters.dao_sent,
            trickle_transmitted: r.trickle.transmitted_count,
            trickle_suppressed:  r.trickle.suppressed_count,
            trickle_resets:      r.trickle.reset_count,
            trickle_intervals:   r.trickle.total_states,
            interval_ms:         r.trickle.interval,
        }
    }
}
