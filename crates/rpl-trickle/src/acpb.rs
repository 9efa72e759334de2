//! ACPB: adaptive channel/parameter based Trickle.
//!
//! Windows are computed in shared-cell units (one cell per slotframe).  After
//! suppressions the window moves toward the start of the interval so the node
//! speaks up earlier; after transmissions it moves toward the end.  Resets use
//! [`ResetRule::ResumeFlagged`][crate::ResetRule::ResumeFlagged].

use rpl_core::ResetCause;

use crate::{Decision, IntervalView, RedundancyStrategy, Window, WindowStrategy};

/// `k = min(n + 1, k_max)` in the first interval and the upper half of the
/// doublings, `min(ceil((n + 1) / 2), k_max)` in between.
#[derive(Copy, Clone, Debug)]
pub struct PhaseRedundancy {
    pub k_max: u32,
}

impl RedundancyStrategy for PhaseRedundancy {
    fn redundancy(&mut self, view: &IntervalView) -> u32 {
        let n1 = u32::try_from(view.neighbors).unwrap_or(u32::MAX).saturating_add(1);
        let m = view.doublings as f64;
        let k = if view.doublings > 0 && m <= view.doublings_max as f64 / 2.0 {
            n1.div_ceil(2)
        } else {
            n1
        };
        k.min(self.k_max)
    }
}

/// Cell-based window driven by cumulative transmit/suppress counts.
///
/// The counts survive ordinary resets and are cleared by a DIS-triggered
/// reset.
#[derive(Clone, Debug, Default)]
pub struct CellWindow {
    transmitted: u32,
    suppressed:  u32,
}

impl CellWindow {
    pub fn counts(&self) -> (u32, u32) {
        (self.transmitted, self.suppressed)
    }
}

impl WindowStrategy for CellWindow {
    fn window(&mut self, view: &IntervalView) -> Window {
        let cell_ms = view.slotframe_ms;
        let cells = (view.interval_ms as f64 / cell_ms).floor();
        let half = (cells / 2.0).ceil();
        let n1 = view.neighbors as f64 + 1.0;

        let (start, end) = if view.interval_ms == view.min_interval_ms || self.suppressed > 0 {
            let end = half - (half / n1) * self.suppressed as f64;
            (0.0, end.clamp(0.0, half))
        } else if self.transmitted > 0 && half > 0.0 {
            let start = half + (n1 / half) * self.transmitted as f64;
            (start.clamp(half, cells), cells)
        } else {
            return Window::second_half(view.interval_ms);
        };
        Window::new(start * cell_ms, end * cell_ms)
    }

    fn on_decision(&mut self, decision: Decision) {
        match decision {
            Decision::Transmit => self.transmitted += 1,
            Decision::Suppress => self.suppressed += 1,
        }
    }

    fn on_reset(&mut self, cause: ResetCause) {
        if cause == ResetCause::DisReceived {
            self.transmitted = 0;
            self.suppressed = 0;
        }
    }
}
