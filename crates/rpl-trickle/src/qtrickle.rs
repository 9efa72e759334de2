//! Q-Trickle: Q-learning over the interval index.
//!
//! The value table has one row per interval index `m` (0..=doublings) and
//! two actions, 0 = suppress and 1 = transmit.  With probability epsilon the
//! node explores by following the threshold rule; otherwise it takes the
//! table's best action for the current `m`.  The reward is the free fraction
//! of the shared cell measured over the window.

use rpl_core::NodeRng;

use crate::learning::{Exploration, Learning, QTable};
use crate::{
    Decision, IntervalOutcome, IntervalView, RedundancyStrategy, SuppressionPolicy, Window,
    WindowStrategy,
};

/// `k = 1 + ceil(min(neighbors, k_max - 1) * p_reset)`.
#[derive(Copy, Clone, Debug)]
pub struct ResetScaledRedundancy {
    pub k_max: u32,
}

impl RedundancyStrategy for ResetScaledRedundancy {
    fn redundancy(&mut self, view: &IntervalView) -> u32 {
        let cap = self.k_max.saturating_sub(1) as f64;
        let n = (view.neighbors as f64).min(cap);
        1 + (n * view.metrics.p_reset).ceil() as u32
    }
}

/// `[I/2 · p_transmit · p_free, I/2 + p_stable · I/2]`.
///
/// A node that has rarely transmitted, or whose channel was busy, may pick
/// an early instant; a node that is often reset keeps its window short.
#[derive(Copy, Clone, Debug, Default)]
pub struct QTrickleWindow;

impl WindowStrategy for QTrickleWindow {
    fn window(&mut self, view: &IntervalView) -> Window {
        let half = view.half_interval_ms();
        let m = &view.metrics;
        Window::new(half * m.p_transmit * m.p_free, half + m.p_stable * half)
    }
}

pub struct QTricklePolicy {
    table:       QTable,
    learning:    Learning,
    exploration: Exploration,
}

impl QTricklePolicy {
    pub fn new(doublings: u32, learning: Learning, exploration: Exploration) -> Self {
        Self {
            table: QTable::new(doublings as usize + 1),
            learning,
            exploration,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }
}

impl SuppressionPolicy for QTricklePolicy {
    fn decide(&mut self, view: &IntervalView, rng: &mut NodeRng) -> Decision {
        if rng.random::<f64>() <= self.exploration.epsilon() {
            Decision::threshold(view.counter, view.redundancy)
        } else if self.table.best_action(view.doublings as usize) == 1 {
            Decision::Transmit
        } else {
            Decision::Suppress
        }
    }

    fn on_interval_end(&mut self, outcome: &IntervalOutcome) {
        let m = outcome.doublings as usize;
        let next = (m + 1).min(outcome.doublings_max as usize);
        let action = usize::from(outcome.transmitted);
        self.table.update(m, action, outcome.p_free, next, self.learning);
        self.exploration.observe(outcome.p_free);
    }

    fn epsilon(&self) -> f64 {
        self.exploration.epsilon()
    }

    fn average_reward(&self) -> f64 {
        self.exploration.average_reward()
    }
}
