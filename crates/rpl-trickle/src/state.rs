//! Trickle state, derived statistics and the read-only views handed to
//! strategies.

/// Lifecycle of a controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

/// Externally observable RFC 6206 state.
///
/// `min_interval <= interval <= max_interval`; `interval` only changes by
/// doubling (saturating) or by a reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrickleState {
    pub interval:            u64,
    pub min_interval:        u64,
    pub max_interval:        u64,
    pub doublings_max:       u32,
    /// Doublings since the last reset (the interval index `m`).
    pub doublings_count:     u32,
    pub consistency_counter: u32,
    pub redundancy_constant: u32,
    pub run_state:           RunState,
    pub suppressed_count:    u64,
    pub transmitted_count:   u64,
    pub reset_count:         u64,
    /// Intervals begun since start.
    pub total_states:        u64,
}

/// Probabilities measured over past intervals.  Every field lies in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Metrics {
    pub p_reset:    f64,
    pub p_stable:   f64,
    pub p_transmit: f64,
    /// Busy fraction of the shared cell during the last measured window.
    pub p_busy:     f64,
    pub p_free:     f64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self { p_reset: 0.0, p_stable: 1.0, p_transmit: 0.0, p_busy: 0.0, p_free: 1.0 }
    }
}

/// Snapshot of controller state passed to strategies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntervalView {
    pub interval_ms:        u64,
    pub min_interval_ms:    u64,
    pub doublings:          u32,
    pub doublings_max:      u32,
    pub neighbors:          usize,
    pub counter:            u32,
    pub redundancy:         u32,
    pub k_max:              u32,
    pub metrics:            Metrics,
    /// Whether a DIO went out in the previous (possibly cut short) interval.
    pub sent_last_interval: bool,
    pub sent_since_reset:   u32,
    /// The current interval was begun by a reset rather than a doubling.
    pub started_by_reset:   bool,
    pub slotframe_ms:       f64,
}

impl IntervalView {
    #[inline]
    pub fn half_interval_ms(&self) -> f64 {
        self.interval_ms as f64 / 2.0
    }
}

/// What happened in an interval that ran to completion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntervalOutcome {
    pub doublings:     u32,
    pub doublings_max: u32,
    pub transmitted:   bool,
    /// Whether the interval before this one transmitted.
    pub previous_sent: bool,
    /// Free fraction of the shared cell over the listen window.
    pub p_free:        f64,
    /// 1.0 when the interval was begun by a reset, else 0.0.
    pub inconsistency: f64,
}

/// Transmission window relative to interval start, in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Window {
    pub start_ms: f64,
    pub end_ms:   f64,
}

impl Window {
    pub fn new(start_ms: f64, end_ms: f64) -> Self {
        Self { start_ms, end_ms }
    }

    /// RFC 6206 window `[I/2, I)`.
    pub fn second_half(interval_ms: u64) -> Self {
        Self::new(interval_ms as f64 / 2.0, interval_ms as f64)
    }

    /// `0 <= start <= end <= interval`, no NaN.
    pub fn fits(&self, interval_ms: u64) -> bool {
        self.start_ms >= 0.0 && self.start_ms <= self.end_ms && self.end_ms <= interval_ms as f64
    }
}

/// The window chosen for the running interval, resolved to ticks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct PlannedWindow {
    pub window:       Window,
    pub t_ms:         f64,
    pub cells:        u64,
    /// A dedicated window-end event exists (`end < interval`).
    pub separate_end: bool,
}
