//! RFC 6206 building blocks.

use rpl_core::NodeRng;

use crate::{Decision, IntervalView, RedundancyStrategy, SuppressionPolicy, Window, WindowStrategy};

/// `k = min(neighbors + 1, k_max)`.
#[derive(Copy, Clone, Debug)]
pub struct NeighborRedundancy {
    pub k_max: u32,
}

impl RedundancyStrategy for NeighborRedundancy {
    fn redundancy(&mut self, view: &IntervalView) -> u32 {
        let n = u32::try_from(view.neighbors).unwrap_or(u32::MAX);
        n.saturating_add(1).min(self.k_max)
    }
}

/// A constant `k`.
#[derive(Copy, Clone, Debug)]
pub struct FixedRedundancy(pub u32);

impl RedundancyStrategy for FixedRedundancy {
    fn redundancy(&mut self, _view: &IntervalView) -> u32 {
        self.0
    }
}

/// `t` drawn from `[I/2, I)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct HalfIntervalWindow;

impl WindowStrategy for HalfIntervalWindow {
    fn window(&mut self, view: &IntervalView) -> Window {
        Window::second_half(view.interval_ms)
    }
}

/// Transmit iff fewer than `k` consistent messages were heard.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThresholdPolicy;

impl SuppressionPolicy for ThresholdPolicy {
    fn decide(&mut self, view: &IntervalView, _rng: &mut NodeRng) -> Decision {
        Decision::threshold(view.counter, view.redundancy)
    }
}
