//! Unit tests for rpl-trickle.

use rpl_core::{
    ChannelProbe, MemoryLog, NeighborSource, NodeId, NodeRng, ResetCause, SlotClock, Tick,
};

use crate::{
    Decision, Exploration, FixedRedundancy, HalfIntervalWindow, IntervalView, Learning, Metrics,
    ResetRule, Strategies, ThresholdPolicy, TimerOutcome, TrickleConfig, TrickleController,
    TrickleEnv, TrickleTimer, TrickleTimers,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Minimal timer queue: same-tick timers fire in registration order.
#[derive(Default)]
struct FakeTimers {
    now:     Tick,
    seq:     u64,
    pending: Vec<(Tick, u64, TrickleTimer)>,
}

impl TrickleTimers for FakeTimers {
    fn now(&self) -> Tick {
        self.now
    }

    fn schedule(&mut self, at: Tick, timer: TrickleTimer) -> Tick {
        self.cancel(timer);
        let at = if at > self.now { at } else { self.now.next() };
        self.seq += 1;
        self.pending.push((at, self.seq, timer));
        at
    }

    fn cancel(&mut self, timer: TrickleTimer) {
        self.pending.retain(|&(_, _, t)| t != timer);
    }
}

impl FakeTimers {
    fn pop(&mut self) -> Option<TrickleTimer> {
        let idx = (0..self.pending.len()).min_by_key(|&i| (self.pending[i].0, self.pending[i].1))?;
        let (tick, _, timer) = self.pending.remove(idx);
        self.now = tick;
        Some(timer)
    }

    fn is_pending(&self, timer: TrickleTimer) -> bool {
        self.pending.iter().any(|&(_, _, t)| t == timer)
    }
}

struct Neighbors(usize);

impl NeighborSource for Neighbors {
    fn neighbor_count(&self) -> usize {
        self.0
    }
}

struct Probe(u64);

impl ChannelProbe for Probe {
    fn shared_cell_ops(&self) -> Option<u64> {
        Some(self.0)
    }
}

struct Bench {
    ctrl:      TrickleController,
    timers:    FakeTimers,
    rng:       NodeRng,
    log:       MemoryLog,
    neighbors: Option<Neighbors>,
    probe:     Option<Probe>,
}

impl Bench {
    fn new(config: TrickleConfig, strategies: Strategies) -> Self {
        Self {
            ctrl:      TrickleController::new(config, strategies).unwrap(),
            timers:    FakeTimers::default(),
            rng:       NodeRng::new(7, NodeId(0)),
            log:       MemoryLog::new(),
            neighbors: None,
            probe:     None,
        }
    }

    fn with_env<R>(
        &mut self,
        f: impl FnOnce(&mut TrickleController, &mut TrickleEnv<'_>) -> R,
    ) -> R {
        let mut env = TrickleEnv {
            node:      NodeId(0),
            timers:    &mut self.timers,
            rng:       &mut self.rng,
            neighbors: self.neighbors.as_ref().map(|n| n as &dyn NeighborSource),
            probe:     self.probe.as_ref().map(|p| p as &dyn ChannelProbe),
            log:       &mut self.log,
        };
        f(&mut self.ctrl, &mut env)
    }

    fn start(&mut self) {
        self.with_env(|c, env| c.start(env)).unwrap();
    }

    fn reset(&mut self, cause: ResetCause) -> bool {
        self.with_env(|c, env| c.reset(cause, env)).unwrap()
    }

    /// Fire the next pending timer.
    fn step(&mut self) -> (TrickleTimer, TimerOutcome) {
        let timer = self.timers.pop().expect("no pending timer");
        let outcome = self.with_env(|c, env| c.on_timer(timer, env)).unwrap();
        (timer, outcome)
    }

    /// Fire timers up to and including the next `target`.
    fn step_until(&mut self, target: TrickleTimer) -> TimerOutcome {
        loop {
            let (timer, outcome) = self.step();
            if timer == target {
                return outcome;
            }
        }
    }
}

fn slot() -> SlotClock {
    SlotClock::new(10, 101)
}

/// Imin = 100 ms, Imax = 400 ms, k = 2, RFC 6206 window and decision.
fn fixed_k_bench() -> Bench {
    let strategies = Strategies {
        redundancy: Box::new(FixedRedundancy(2)),
        window:     Box::new(HalfIntervalWindow),
        policy:     Box::new(ThresholdPolicy),
        reset_rule: ResetRule::ToMinimum,
    };
    Bench::new(TrickleConfig::new(100, 2, 10, slot()), strategies)
}

fn view(interval_ms: u64, doublings: u32, neighbors: usize) -> IntervalView {
    IntervalView {
        interval_ms,
        min_interval_ms: 100,
        doublings,
        doublings_max: 4,
        neighbors,
        counter: 0,
        redundancy: 1,
        k_max: 10,
        metrics: Metrics::default(),
        sent_last_interval: false,
        sent_since_reset: 0,
        started_by_reset: false,
        slotframe_ms: 1010.0,
    }
}

fn learning() -> Learning {
    Learning { alpha: 0.5, beta: 0.9 }
}

// ── Controller lifecycle ──────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;

    #[test]
    fn suppress_double_then_reset() {
        let mut b = fixed_k_bench();
        b.start();
        assert_eq!(b.ctrl.state().interval, 100);
        assert!(b.ctrl.is_running());

        b.ctrl.increment_consistency();
        b.ctrl.increment_consistency();
        assert_eq!(b.step_until(TrickleTimer::Transmit), TimerOutcome::Idle);
        assert_eq!(b.ctrl.state().suppressed_count, 1);
        assert_eq!(b.ctrl.state().transmitted_count, 0);

        b.step_until(TrickleTimer::IntervalEnd);
        assert_eq!(b.ctrl.state().interval, 200);
        assert_eq!(b.ctrl.state().consistency_counter, 0);

        assert!(b.reset(ResetCause::NewRank));
        assert_eq!(b.ctrl.state().interval, 100);
        assert_eq!(b.ctrl.state().reset_count, 1);
    }

    #[test]
    fn transmits_when_counter_below_k() {
        let mut b = fixed_k_bench();
        b.start();
        b.ctrl.increment_consistency();
        assert_eq!(b.step_until(TrickleTimer::Transmit), TimerOutcome::Transmit);
        assert_eq!(b.ctrl.state().transmitted_count, 1);
    }

    #[test]
    fn doubling_saturates_at_max() {
        let mut b = fixed_k_bench();
        b.start();
        let mut seen = Vec::new();
        for _ in 0..6 {
            b.step_until(TrickleTimer::IntervalEnd);
            let s = b.ctrl.state();
            assert!(s.interval <= s.max_interval);
            seen.push(s.interval);
        }
        assert_eq!(seen, vec![200, 400, 400, 400, 400, 400]);
        assert_eq!(b.ctrl.state().doublings_count, 2);
        assert_eq!(b.ctrl.state().total_states, 7);
    }

    #[test]
    fn reset_at_min_is_noop() {
        let mut b = fixed_k_bench();
        b.start();
        assert!(!b.reset(ResetCause::DisReceived));
        assert_eq!(b.ctrl.state().interval, 100);
        assert_eq!(b.ctrl.state().reset_count, 0);
    }

    #[test]
    fn reset_while_stopped_is_noop() {
        let mut b = fixed_k_bench();
        assert!(!b.reset(ResetCause::NewRank));
        assert!(!b.ctrl.is_running());
    }

    #[test]
    fn stop_cancels_everything_and_is_idempotent() {
        let mut b = fixed_k_bench();
        b.start();
        assert!(!b.timers.pending.is_empty());
        b.ctrl.stop(&mut b.timers);
        b.ctrl.stop(&mut b.timers);
        assert!(b.timers.pending.is_empty());
        assert!(!b.ctrl.is_running());

        // A stale timer delivered after stop does nothing.
        let out = b.with_env(|c, env| c.on_timer(TrickleTimer::Transmit, env)).unwrap();
        assert_eq!(out, TimerOutcome::Idle);
        assert_eq!(b.ctrl.state().suppressed_count, 0);
    }

    #[test]
    fn increment_ignored_while_stopped() {
        let mut b = fixed_k_bench();
        b.ctrl.increment_consistency();
        assert_eq!(b.ctrl.state().consistency_counter, 0);
    }

    #[test]
    fn start_logs_reset_and_interval() {
        let mut b = fixed_k_bench();
        b.start();
        assert_eq!(b.log.count_kind("trickle_reset"), 1);
        assert_eq!(b.log.count_kind("trickle_interval"), 1);
    }

    #[test]
    fn transmission_instant_in_second_half() {
        for seed in 0..200 {
            let mut b = fixed_k_bench();
            b.rng = NodeRng::new(seed, NodeId(3));
            b.start();
            let (window, t) = b.ctrl.window().unwrap();
            assert_eq!(window.start_ms, 50.0);
            assert_eq!(window.end_ms, 100.0);
            // Half-open: never at the interval end itself.
            assert!((50.0..100.0).contains(&t), "t = {t}");
        }
    }

    #[test]
    fn randomized_start_stays_on_doubling_grid() {
        for seed in 0..20 {
            let mut config = TrickleConfig::new(100, 3, 10, slot());
            config.randomize_start = true;
            let mut b = Bench::new(config, Strategies::classic(10));
            b.rng = NodeRng::new(seed, NodeId(0));
            b.start();
            let s = b.ctrl.state();
            assert_eq!(s.interval, 100 << s.doublings_count);
            assert!(s.interval <= 800);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TrickleConfig::new(0, 2, 10, slot());
        assert!(TrickleController::new(config, Strategies::classic(10)).is_err());
    }
}

// ── Window events and channel measurement ─────────────────────────────────────

#[cfg(test)]
mod window_events {
    use super::*;

    #[test]
    fn full_window_has_no_separate_end_event() {
        let mut b = fixed_k_bench();
        b.start();
        assert!(b.timers.is_pending(TrickleTimer::WindowStart));
        assert!(!b.timers.is_pending(TrickleTimer::WindowEnd));
        assert!(b.timers.is_pending(TrickleTimer::IntervalEnd));
    }

    #[test]
    fn short_window_gets_its_own_end_event() {
        let strategies = Strategies::qtrickle(10, 2, learning(), Exploration::fixed(0.1));
        let mut b = Bench::new(TrickleConfig::new(100, 2, 10, slot()), strategies);
        b.start();
        // p_stable = 1 on the first interval: the window reaches I.
        assert!(!b.timers.is_pending(TrickleTimer::WindowEnd));

        b.step_until(TrickleTimer::IntervalEnd);
        assert!(b.reset(ResetCause::NewRank));
        // After one reset in three states p_stable < 1: the window ends early.
        assert!(b.ctrl.metrics().p_stable < 1.0);
        assert!(b.timers.is_pending(TrickleTimer::WindowEnd));
    }

    #[test]
    fn busy_fraction_excludes_own_transmission() {
        let mut b = Bench::new(TrickleConfig::new(100, 2, 10, slot()), Strategies::classic(10));
        b.probe = Some(Probe(5));
        b.start();
        assert_eq!(b.step().0, TrickleTimer::WindowStart);
        b.probe = Some(Probe(7));
        assert_eq!(b.step_until(TrickleTimer::Transmit), TimerOutcome::Transmit);
        b.step_until(TrickleTimer::IntervalEnd);

        // Two ops seen, one of them ours, one cell in the window.
        let m = b.ctrl.metrics();
        assert_eq!(m.p_busy, 1.0);
        assert_eq!(m.p_free, 0.0);
    }

    #[test]
    fn no_probe_leaves_channel_free() {
        let mut b = fixed_k_bench();
        b.start();
        b.step_until(TrickleTimer::IntervalEnd);
        assert_eq!(b.ctrl.metrics().p_free, 1.0);
        assert!((b.ctrl.metrics().p_transmit - 1.0).abs() < 1e-12);
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod strategies {
    use super::*;
    use crate::acpb::{CellWindow, PhaseRedundancy};
    use crate::classic::NeighborRedundancy;
    use crate::qtrickle::{QTrickleWindow, ResetScaledRedundancy};
    use crate::riata::{AveragedRedundancy, RiataPolicy, SlicedWindow};
    use crate::{RedundancyStrategy, SuppressionPolicy, WindowStrategy};

    #[test]
    fn threshold_is_exclusive() {
        for c in 0..12 {
            for k in 0..12 {
                let d = Decision::threshold(c, k);
                assert_eq!(d == Decision::Transmit, c < k);
            }
        }
    }

    #[test]
    fn neighbor_redundancy_caps_at_k_max() {
        let mut s = NeighborRedundancy { k_max: 10 };
        assert_eq!(s.redundancy(&view(100, 0, 0)), 1);
        assert_eq!(s.redundancy(&view(100, 0, 3)), 4);
        assert_eq!(s.redundancy(&view(100, 0, 20)), 10);
    }

    #[test]
    fn reset_scaled_redundancy() {
        let mut s = ResetScaledRedundancy { k_max: 10 };
        let mut v = view(100, 0, 5);
        assert_eq!(s.redundancy(&v), 1);
        v.metrics.p_reset = 0.5;
        assert_eq!(s.redundancy(&v), 4);
        v.neighbors = 30;
        v.metrics.p_reset = 1.0;
        assert_eq!(s.redundancy(&v), 10);
    }

    #[test]
    fn phase_redundancy_halves_in_early_doublings() {
        let mut s = PhaseRedundancy { k_max: 10 };
        assert_eq!(s.redundancy(&view(100, 0, 5)), 6);
        assert_eq!(s.redundancy(&view(200, 1, 5)), 3);
        assert_eq!(s.redundancy(&view(400, 2, 5)), 3);
        assert_eq!(s.redundancy(&view(800, 3, 5)), 6);
        assert_eq!(s.redundancy(&view(800, 3, 50)), 10);
    }

    #[test]
    fn averaged_redundancy_restarts_on_reset() {
        let mut s = AveragedRedundancy::new(6);
        let v = view(100, 0, 0);
        assert_eq!(s.redundancy(&v), 6);
        assert_eq!(s.redundancy(&v), 6);
        s.on_reset(ResetCause::NewRank);
        assert_eq!(s.redundancy(&v), 6);
    }

    #[test]
    fn qtrickle_window_tracks_metrics() {
        let mut w = QTrickleWindow;
        let mut v = view(1000, 0, 0);
        assert_eq!(w.window(&v), crate::Window::new(0.0, 1000.0));
        v.metrics.p_transmit = 0.5;
        v.metrics.p_free = 0.5;
        v.metrics.p_stable = 0.5;
        assert_eq!(w.window(&v), crate::Window::new(125.0, 750.0));
    }

    #[test]
    fn sliced_window_walks_through_the_interval() {
        let mut w = SlicedWindow;
        let mut v = view(1000, 0, 0);
        v.started_by_reset = true;
        assert_eq!(w.window(&v), crate::Window::new(0.0, 500.0));
        v.sent_since_reset = 1;
        assert_eq!(w.window(&v), crate::Window::new(500.0, 1000.0));
        v.sent_since_reset = 2;
        assert!(!w.window(&v).fits(1000));
    }

    #[test]
    fn cell_window_moves_with_decisions() {
        let mut w = CellWindow::default();
        // 8 cells of 1010 ms, half = 4, two neighbors.
        let v = view(8080, 3, 2);
        assert_eq!(w.window(&v), crate::Window::second_half(8080));

        w.on_decision(Decision::Transmit);
        let win = w.window(&v);
        assert!(win.start_ms > 4.0 * 1010.0 - 1e-9 && win.end_ms == 8.0 * 1010.0);

        w.on_decision(Decision::Suppress);
        let win = w.window(&v);
        assert_eq!(win.start_ms, 0.0);
        assert!(win.end_ms < 4.0 * 1010.0);

        w.on_reset(ResetCause::DisReceived);
        assert_eq!(w.counts(), (0, 0));
    }

    #[test]
    fn riata_exploits_keep_by_default() {
        let mut p = RiataPolicy::new(learning(), Exploration::fixed(0.0));
        let mut rng = NodeRng::new(1, NodeId(0));
        let mut v = view(100, 0, 0);
        assert_eq!(p.decide(&v, &mut rng), Decision::Suppress);
        v.sent_last_interval = true;
        assert_eq!(p.decide(&v, &mut rng), Decision::Transmit);
    }
}

// ── Flagged reset ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod flagged_reset {
    use super::*;

    fn acpb_bench() -> Bench {
        Bench::new(TrickleConfig::new(100, 4, 10, slot()), Strategies::acpb(10))
    }

    #[test]
    fn dis_reset_remembers_index_and_next_reset_resumes() {
        let mut b = acpb_bench();
        b.start();
        b.step_until(TrickleTimer::IntervalEnd);
        b.step_until(TrickleTimer::IntervalEnd);
        assert_eq!(b.ctrl.state().interval, 400);

        assert!(b.reset(ResetCause::DisReceived));
        assert_eq!(b.ctrl.state().interval, 100);

        assert!(b.reset(ResetCause::NewRank));
        assert_eq!(b.ctrl.state().interval, 400);
        assert_eq!(b.ctrl.state().doublings_count, 2);
        assert_eq!(b.ctrl.state().reset_count, 2);

        // Flag consumed: an ordinary reset goes back to Imin.
        assert!(b.reset(ResetCause::NewRank));
        assert_eq!(b.ctrl.state().interval, 100);
    }

    #[test]
    fn dis_reset_at_min_does_not_set_flag() {
        let mut b = acpb_bench();
        b.start();
        assert!(!b.reset(ResetCause::DisReceived));
        assert!(!b.reset(ResetCause::NewRank));
        assert_eq!(b.ctrl.state().reset_count, 0);
    }
}

// ── Learning ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod learning_rules {
    use super::*;
    use crate::QTable;

    #[test]
    fn td_update() {
        let mut q = QTable::new(3);
        let v = q.update(0, 1, 1.0, 1, learning());
        assert!((v - 0.5).abs() < 1e-12);
        assert_eq!(q.best_action(0), 1);

        let v = q.update(0, 1, 1.0, 0, learning());
        // 0.5·0.5 + 0.5·(1 + 0.9·0.5 − 0.5)
        assert!((v - 0.725).abs() < 1e-12, "got {v}");
    }

    #[test]
    fn ties_choose_first_action() {
        let q = QTable::new(2);
        assert_eq!(q.best_action(1), 0);
        assert_eq!(q.max_value(1), 0.0);
    }

    #[test]
    fn annealing_moves_against_average() {
        let mut e = Exploration::annealed(0.3, 0.1, 0.1, 0.5);
        e.observe(1.0);
        assert!((e.epsilon() - 0.2).abs() < 1e-12);
        e.observe(0.0);
        assert!((e.epsilon() - 0.3).abs() < 1e-12);
        assert!((e.average_reward() - 0.5).abs() < 1e-12);

        let mut f = Exploration::fixed(0.25);
        f.observe(1.0);
        assert_eq!(f.epsilon(), 0.25);
    }

    #[test]
    fn qtrickle_learns_across_intervals() {
        let strategies = Strategies::qtrickle(10, 2, learning(), Exploration::fixed(1.0));
        let mut b = Bench::new(TrickleConfig::new(100, 2, 10, slot()), strategies);
        b.start();
        for _ in 0..4 {
            b.step_until(TrickleTimer::IntervalEnd);
        }
        assert_eq!(b.ctrl.state().total_states, 5);
        assert!(b.ctrl.state().transmitted_count >= 1);
        assert!((0.0..=1.0).contains(&b.ctrl.metrics().p_transmit));
    }
}
