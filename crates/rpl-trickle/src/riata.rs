//! RIATA: reinforcement learning on whether to repeat the last interval's
//! choice.
//!
//! State is "did this node send a DIO in the previous interval" and the
//! actions are keep (0) or change (1) that choice.  Reward favours sending
//! after an inconsistency and staying quiet otherwise.

use rpl_core::{NodeRng, ResetCause};

use crate::learning::{Exploration, Learning, QTable};
use crate::{
    Decision, IntervalOutcome, IntervalView, RedundancyStrategy, SuppressionPolicy, Window,
    WindowStrategy,
};

/// Average of the constants assigned since the last reset; `k_max` for the
/// first interval.
#[derive(Clone, Debug)]
pub struct AveragedRedundancy {
    k_max:    u32,
    assigned: u64,
    count:    u32,
}

impl AveragedRedundancy {
    pub fn new(k_max: u32) -> Self {
        Self { k_max, assigned: 0, count: 0 }
    }
}

impl RedundancyStrategy for AveragedRedundancy {
    fn redundancy(&mut self, _view: &IntervalView) -> u32 {
        let k = if self.count == 0 {
            self.k_max
        } else {
            self.assigned.div_ceil(self.count as u64) as u32
        };
        self.assigned += k as u64;
        self.count += 1;
        k
    }

    fn on_reset(&mut self, _cause: ResetCause) {
        self.assigned = 0;
        self.count = 0;
    }
}

/// The `s`-th slice of `I / (m + 1 + inconsistency)`, `s` = DIOs sent since
/// the last reset.  Falls back to the controller's default when the slice
/// runs past the interval.
#[derive(Copy, Clone, Debug, Default)]
pub struct SlicedWindow;

impl WindowStrategy for SlicedWindow {
    fn window(&mut self, view: &IntervalView) -> Window {
        let divisor = view.doublings as f64 + 1.0 + f64::from(u8::from(view.started_by_reset));
        let slice = view.interval_ms as f64 / divisor;
        let s = view.sent_since_reset as f64;
        Window::new(s * slice, (s + 1.0) * slice)
    }
}

pub struct RiataPolicy {
    table:       QTable,
    learning:    Learning,
    exploration: Exploration,
    /// Action taken at the last decision: 1 = changed the previous choice.
    changed:     usize,
}

impl RiataPolicy {
    pub fn new(learning: Learning, exploration: Exploration) -> Self {
        Self { table: QTable::new(2), learning, exploration, changed: 0 }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }
}

impl SuppressionPolicy for RiataPolicy {
    fn decide(&mut self, view: &IntervalView, rng: &mut NodeRng) -> Decision {
        let prev = view.sent_last_interval;
        let send = if rng.random::<f64>() < self.exploration.epsilon() {
            Decision::threshold(view.counter, view.redundancy) == Decision::Transmit
        } else {
            let change = self.table.best_action(usize::from(prev)) == 1;
            prev != change
        };
        self.changed = usize::from(send != prev);
        if send { Decision::Transmit } else { Decision::Suppress }
    }

    fn on_interval_end(&mut self, outcome: &IntervalOutcome) {
        let (prev, sent) = (outcome.previous_sent, outcome.transmitted);
        let reward = if prev { outcome.inconsistency } else { 1.0 - outcome.inconsistency };
        self.table.update(
            usize::from(prev),
            self.changed,
            reward,
            usize::from(sent),
            self.learning,
        );
        self.exploration.observe(reward);
        self.changed = 0;
    }

    fn epsilon(&self) -> f64 {
        self.exploration.epsilon()
    }

    fn average_reward(&self) -> f64 {
        self.exploration.average_reward()
    }
}
