//! The RFC 6206 state machine.
//!
//! # Interval lifecycle
//!
//! ```text
//! begin_interval:  c = 0, k = redundancy(view), [t0, t1] = window(view),
//!                  t ~ U(t0, t1)
//!                  schedule WindowStart @ t0, Transmit @ t,
//!                           WindowEnd @ t1 (only if t1 < I), IntervalEnd @ I
//! Transmit:        policy.decide(view) -> Transmit | Suppress
//! IntervalEnd:     sample window end if it had no event of its own,
//!                  measure p_busy, policy.on_interval_end,
//!                  I = min(2I, Imax), m = min(m + 1, doublings), begin_interval
//! ```
//!
//! The controller never touches the scheduler directly.  Timers go through
//! [`TrickleTimers`], implemented by whoever owns the event queue, and come
//! back in through [`TrickleController::on_timer`].

use rpl_core::{
    check_probability, neighbor_count, ChannelProbe, EventLog, IntervalStats, LogRecord,
    NeighborSource, NodeId, NodeRng, ResetCause, Settings, Tick,
};

use crate::state::PlannedWindow;
use crate::{
    Decision, IntervalOutcome, IntervalView, Metrics, ResetRule, RunState, Strategies,
    TrickleConfig, TrickleResult, TrickleState, Window,
};

// ── Timer plumbing ────────────────────────────────────────────────────────────

/// The four events one controller can have pending.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrickleTimer {
    WindowStart,
    Transmit,
    WindowEnd,
    IntervalEnd,
}

impl TrickleTimer {
    pub const ALL: [TrickleTimer; 4] = [
        TrickleTimer::WindowStart,
        TrickleTimer::Transmit,
        TrickleTimer::WindowEnd,
        TrickleTimer::IntervalEnd,
    ];
}

/// Event-queue access for one controller.
///
/// Each `TrickleTimer` is a distinct tag: scheduling one that is already
/// pending replaces it.
pub trait TrickleTimers {
    fn now(&self) -> Tick;

    /// Register `timer` at `at`.  A tick that is not in the future lands on
    /// `now + 1`.  Returns the tick used.
    fn schedule(&mut self, at: Tick, timer: TrickleTimer) -> Tick;

    fn cancel(&mut self, timer: TrickleTimer);
}

/// Everything a controller borrows from its owner for one call.
pub struct TrickleEnv<'a> {
    pub node:      NodeId,
    pub timers:    &'a mut dyn TrickleTimers,
    pub rng:       &'a mut NodeRng,
    pub neighbors: Option<&'a dyn NeighborSource>,
    pub probe:     Option<&'a dyn ChannelProbe>,
    pub log:       &'a mut dyn EventLog,
}

/// Result of handling a timer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerOutcome {
    Idle,
    /// The owner must send its message now.
    Transmit,
}

// ── Controller ────────────────────────────────────────────────────────────────

pub struct TrickleController {
    config:             TrickleConfig,
    state:              TrickleState,
    metrics:            Metrics,
    strategies:         Strategies,
    plan:               Option<PlannedWindow>,
    start_ops:          Option<u64>,
    end_ops:            Option<u64>,
    used_cells:         u64,
    last_counter:       u32,
    sent_this_interval: bool,
    sent_last_interval: bool,
    sent_since_reset:   u32,
    started_by_reset:   bool,
    /// Interval index remembered by a flagged reset.
    flag:               Option<u32>,
}

impl TrickleController {
    pub fn new(config: TrickleConfig, strategies: Strategies) -> TrickleResult<Self> {
        config.validate()?;
        let state = TrickleState {
            interval:            config.min_interval_ms,
            min_interval:        config.min_interval_ms,
            max_interval:        config.max_interval_ms(),
            doublings_max:       config.doublings,
            doublings_count:     0,
            consistency_counter: 0,
            redundancy_constant: config.k_default,
            run_state:           RunState::Stopped,
            suppressed_count:    0,
            transmitted_count:   0,
            reset_count:         0,
            total_states:        0,
        };
        Ok(Self {
            config,
            state,
            metrics: Metrics::default(),
            strategies,
            plan: None,
            start_ops: None,
            end_ops: None,
            used_cells: 0,
            last_counter: 0,
            sent_this_interval: false,
            sent_last_interval: false,
            sent_since_reset: 0,
            started_by_reset: false,
            flag: None,
        })
    }

    /// Controller for the variant selected in `settings`.
    pub fn from_settings(settings: &Settings) -> TrickleResult<Self> {
        Self::new(TrickleConfig::from_settings(settings), Strategies::for_settings(settings))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> &TrickleState {
        &self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn config(&self) -> &TrickleConfig {
        &self.config
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state.run_state == RunState::Running
    }

    /// The window and transmission instant of the running interval (ms).
    pub fn window(&self) -> Option<(Window, f64)> {
        self.plan.map(|p| (p.window, p.t_ms))
    }

    // ── Operations ────────────────────────────────────────────────────────

    /// Stopped → Running.  No-op when already running.
    pub fn start(&mut self, env: &mut TrickleEnv<'_>) -> TrickleResult<()> {
        if self.is_running() {
            return Ok(());
        }
        self.state.run_state = RunState::Running;
        self.state.consistency_counter = 0;
        self.state.suppressed_count = 0;
        self.state.transmitted_count = 0;
        self.state.reset_count = 0;
        self.state.total_states = 0;
        self.metrics = Metrics::default();
        self.last_counter = 0;
        self.used_cells = 0;
        self.sent_this_interval = false;
        self.sent_since_reset = 0;
        self.started_by_reset = false;
        self.flag = None;

        let m = if self.config.randomize_start {
            env.rng.between(0, self.config.doublings)
        } else {
            0
        };
        self.state.doublings_count = m;
        self.state.interval = self.config.min_interval_ms << m;

        self.strategies.redundancy.on_reset(ResetCause::Start);
        self.strategies.window.on_reset(ResetCause::Start);
        env.log.record(
            env.timers.now(),
            LogRecord::TrickleReset { node: env.node, cause: ResetCause::Start },
        );
        tracing::debug!(node = %env.node, interval_ms = self.state.interval, "trickle started");
        self.begin_interval(env)
    }

    /// Cancel every pending timer and go to Stopped.  Idempotent.
    pub fn stop(&mut self, timers: &mut dyn TrickleTimers) {
        for timer in TrickleTimer::ALL {
            timers.cancel(timer);
        }
        self.state.run_state = RunState::Stopped;
        self.plan = None;
    }

    /// Restart from a shorter interval after an inconsistency or external
    /// event.  Returns whether anything changed.
    ///
    /// Under [`ResetRule::ToMinimum`] a reset at Imin does nothing.  Under
    /// [`ResetRule::ResumeFlagged`] a remembered index takes precedence.
    pub fn reset(&mut self, cause: ResetCause, env: &mut TrickleEnv<'_>) -> TrickleResult<bool> {
        if !self.is_running() {
            return Ok(false);
        }
        let min = self.config.min_interval_ms;
        let above_min = self.state.interval > min;
        let target = match self.strategies.reset_rule {
            ResetRule::ResumeFlagged if cause == ResetCause::DisReceived => {
                if above_min {
                    self.flag = Some(self.state.doublings_count);
                }
                above_min.then_some(0)
            }
            ResetRule::ResumeFlagged if self.flag.is_some() => self.flag.take(),
            _ => above_min.then_some(0),
        };
        let Some(m) = target else {
            tracing::trace!(node = %env.node, %cause, "trickle reset ignored at Imin");
            return Ok(false);
        };

        self.state.reset_count += 1;
        self.state.doublings_count = m;
        self.state.interval = min << m;
        self.started_by_reset = true;
        self.sent_since_reset = 0;
        self.strategies.redundancy.on_reset(cause);
        self.strategies.window.on_reset(cause);

        env.log.record(env.timers.now(), LogRecord::TrickleReset { node: env.node, cause });
        tracing::debug!(
            node = %env.node,
            %cause,
            interval_ms = self.state.interval,
            resets = self.state.reset_count,
            "trickle reset"
        );
        self.begin_interval(env)?;
        Ok(true)
    }

    /// Count one consistent reception.  Ignored while stopped.
    pub fn increment_consistency(&mut self) {
        if self.is_running() {
            self.state.consistency_counter += 1;
        }
    }

    /// Handle a fired timer.  Stale timers of a stopped controller are
    /// ignored.
    pub fn on_timer(
        &mut self,
        timer: TrickleTimer,
        env:   &mut TrickleEnv<'_>,
    ) -> TrickleResult<TimerOutcome> {
        if !self.is_running() {
            return Ok(TimerOutcome::Idle);
        }
        match timer {
            TrickleTimer::WindowStart => {
                self.start_ops = shared_cell_ops(env.probe);
                Ok(TimerOutcome::Idle)
            }
            TrickleTimer::WindowEnd => {
                self.end_ops = shared_cell_ops(env.probe);
                Ok(TimerOutcome::Idle)
            }
            TrickleTimer::Transmit => Ok(self.decide(env)),
            TrickleTimer::IntervalEnd => {
                self.end_interval(env)?;
                Ok(TimerOutcome::Idle)
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn view(&self, neighbors: Option<&dyn NeighborSource>) -> IntervalView {
        IntervalView {
            interval_ms:        self.state.interval,
            min_interval_ms:    self.state.min_interval,
            doublings:          self.state.doublings_count,
            doublings_max:      self.state.doublings_max,
            neighbors:          neighbor_count(neighbors),
            counter:            self.state.consistency_counter,
            redundancy:         self.state.redundancy_constant,
            k_max:              self.config.k_max,
            metrics:            self.metrics,
            sent_last_interval: self.sent_last_interval,
            sent_since_reset:   self.sent_since_reset,
            started_by_reset:   self.started_by_reset,
            slotframe_ms:       self.config.slot.slotframe_ms(),
        }
    }

    fn begin_interval(&mut self, env: &mut TrickleEnv<'_>) -> TrickleResult<()> {
        let now = env.timers.now();
        self.last_counter = self.state.consistency_counter;
        self.state.consistency_counter = 0;
        self.state.total_states += 1;
        self.sent_last_interval = std::mem::take(&mut self.sent_this_interval);
        self.start_ops = None;
        self.end_ops = None;

        let p_reset = check_probability(
            "p_reset",
            self.state.reset_count as f64 / self.state.total_states as f64,
        )?;
        self.metrics.p_reset = p_reset;
        self.metrics.p_stable = 1.0 - p_reset;

        let view = self.view(env.neighbors);
        let k = self.strategies.redundancy.redundancy(&view).max(1);
        self.state.redundancy_constant = k;
        let view = IntervalView { redundancy: k, ..view };

        let interval = self.state.interval;
        let mut window = self.strategies.window.window(&view);
        if !window.fits(interval) {
            tracing::warn!(
                node = %env.node,
                start_ms = window.start_ms,
                end_ms = window.end_ms,
                interval_ms = interval,
                "window outside interval; using [I/2, I]"
            );
            window = Window::second_half(interval);
        }
        let t_ms = env.rng.uniform(window.start_ms, window.end_ms);
        let slot = self.config.slot;
        let cells = ((window.end_ms - window.start_ms) / slot.slotframe_ms()).ceil() as u64;
        let separate_end = window.end_ms < interval as f64;

        env.timers.schedule(now + slot.ticks_for_ms(window.start_ms), TrickleTimer::WindowStart);
        env.timers.schedule(now + slot.ticks_for_ms(t_ms), TrickleTimer::Transmit);
        if separate_end {
            env.timers.schedule(now + slot.ticks_for_ms(window.end_ms), TrickleTimer::WindowEnd);
        } else {
            env.timers.cancel(TrickleTimer::WindowEnd);
        }
        env.timers.schedule(now + slot.ticks_for_ms(interval as f64), TrickleTimer::IntervalEnd);

        self.plan = Some(PlannedWindow { window, t_ms, cells, separate_end });

        let stats = self.interval_stats(view.neighbors);
        tracing::trace!(
            node = %env.node,
            state = stats.state,
            interval_ms = interval,
            k,
            t_ms,
            "trickle interval"
        );
        env.log.record(now, LogRecord::TrickleInterval { node: env.node, stats });
        Ok(())
    }

    fn decide(&mut self, env: &mut TrickleEnv<'_>) -> TimerOutcome {
        let view = self.view(env.neighbors);
        let decision = self.strategies.policy.decide(&view, env.rng);
        self.strategies.window.on_decision(decision);
        match decision {
            Decision::Transmit => {
                self.state.transmitted_count += 1;
                self.sent_this_interval = true;
                self.sent_since_reset += 1;
                tracing::debug!(node = %env.node, c = view.counter, k = view.redundancy, "trickle transmit");
                TimerOutcome::Transmit
            }
            Decision::Suppress => {
                self.state.suppressed_count += 1;
                tracing::debug!(node = %env.node, c = view.counter, k = view.redundancy, "trickle suppress");
                TimerOutcome::Idle
            }
        }
    }

    fn end_interval(&mut self, env: &mut TrickleEnv<'_>) -> TrickleResult<()> {
        let Some(plan) = self.plan else {
            return Ok(());
        };
        if !plan.separate_end {
            self.end_ops = shared_cell_ops(env.probe);
        }
        self.measure_channel(plan.cells)?;
        self.metrics.p_transmit = check_probability(
            "p_transmit",
            self.state.transmitted_count as f64 / self.state.total_states as f64,
        )?;

        let outcome = IntervalOutcome {
            doublings:     self.state.doublings_count,
            doublings_max: self.state.doublings_max,
            transmitted:   self.sent_this_interval,
            previous_sent: self.sent_last_interval,
            p_free:        self.metrics.p_free,
            inconsistency: if self.started_by_reset { 1.0 } else { 0.0 },
        };
        self.strategies.policy.on_interval_end(&outcome);

        self.state.interval = self.state.interval.saturating_mul(2).min(self.state.max_interval);
        self.state.doublings_count = (self.state.doublings_count + 1).min(self.state.doublings_max);
        self.started_by_reset = false;
        self.begin_interval(env)
    }

    /// Busy fraction of the shared cell between window start and end,
    /// excluding this node's own transmission.
    fn measure_channel(&mut self, cells: u64) -> TrickleResult<()> {
        let (Some(start), Some(end)) = (self.start_ops, self.end_ops) else {
            return Ok(());
        };
        let mut used = end.saturating_sub(start);
        if self.sent_this_interval {
            used = used.saturating_sub(1);
        }
        let cells = cells.max(used);
        if cells == 0 {
            return Ok(());
        }
        let busy = check_probability("p_busy", used as f64 / cells as f64)?;
        self.metrics.p_busy = busy;
        self.metrics.p_free = 1.0 - busy;
        self.used_cells = used;
        Ok(())
    }

    fn interval_stats(&self, neighbors: usize) -> IntervalStats {
        let (t_ms, listen_ms, window_cells) = match self.plan {
            Some(p) => (p.t_ms, p.t_ms - p.window.start_ms, p.cells),
            None => (0.0, 0.0, 0),
        };
        IntervalStats {
            state: self.state.total_states,
            doublings: self.state.doublings_count,
            interval_ms: self.state.interval,
            redundancy: self.state.redundancy_constant,
            counter: self.last_counter,
            transmitted: self.state.transmitted_count,
            suppressed: self.state.suppressed_count,
            resets: self.state.reset_count,
            p_reset: self.metrics.p_reset,
            p_stable: self.metrics.p_stable,
            p_transmit: self.metrics.p_transmit,
            p_busy: self.metrics.p_busy,
            p_free: self.metrics.p_free,
            t_ms,
            listen_ms,
            window_cells,
            used_cells: self.used_cells,
            neighbors,
            epsilon: self.strategies.policy.epsilon(),
            average_reward: self.strategies.policy.average_reward(),
        }
    }
}

impl std::fmt::Debug for TrickleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrickleController")
            .field("state", &self.state)
            .field("metrics", &self.metrics)
            .field("reset_rule", &self.strategies.reset_rule)
            .finish_non_exhaustive()
    }
}

#[inline]
fn shared_cell_ops(probe: Option<&dyn ChannelProbe>) -> Option<u64> {
    probe.and_then(|p| p.shared_cell_ops())
}
