//! The `Sim` struct, its event dispatch and the worker-thread runner.

use std::thread::JoinHandle;

use rpl_core::{EventLog, LinkAddr, NodeId, NodeRng, Settings, SimRng, Tick};
use rpl_dodag::{
    CellKind, DodagManager, Message, NodeRplState, Outgoing, RplCounters, RplEnv, RplResult,
};
use rpl_sched::{Dispatch, DispatchError, RunOutcome, SchedError, SchedResult, SubOrder};
use rpl_trickle::TrickleState;

use crate::event::{Action, EventQueue, Frame, NodeTimers, SharedCell, Tag};
use crate::{CrashReport, SimError, SimResult, Topology};

// ── Nodes ─────────────────────────────────────────────────────────────────────

/// One simulated node.
pub struct Mote {
    pub id:     NodeId,
    pub rpl:    DodagManager,
    pub rng:    NodeRng,
    pub shared: SharedCell,
}

/// Frames handed to the radio so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// One per (sender, receiver) pair; a broadcast counts once per neighbor.
    pub sent:      u64,
    pub delivered: u64,
    pub lost:      u64,
}

/// End-of-run summary for one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeReport {
    pub node:     NodeId,
    pub is_root:  bool,
    pub state:    NodeRplState,
    pub dag_rank: Option<u32>,
    pub joined:   bool,
    pub counters: RplCounters,
    pub trickle:  TrickleState,
}

// ── Network ───────────────────────────────────────────────────────────────────

/// Everything the event handlers mutate.  Split from the queue so the run
/// loop can borrow both at once.
pub struct Network<L: EventLog> {
    pub settings: Settings,
    pub topology: Topology,
    pub motes:    Vec<Mote>,
    pub log:      L,
    pub frames:   FrameStats,
    pub(crate) rng:        SimRng,
    pub(crate) next_frame: u64,
    pub(crate) outbox:     Vec<Outgoing>,
}

impl<L: EventLog> Network<L> {
    fn with_node(
        &mut self,
        queue: &mut EventQueue,
        node:  NodeId,
        f:     impl FnOnce(&mut DodagManager, &mut RplEnv<'_>) -> RplResult<()>,
    ) -> SimResult<()> {
        let mote = self
            .motes
            .get_mut(node.index())
            .ok_or_else(|| SimError::Config(format!("event for unknown node {node}")))?;
        let mut timers = NodeTimers { node, queue };
        let mut env = RplEnv {
            timers: &mut timers,
            rng:    &mut mote.rng,
            probe:  Some(&mote.shared),
            log:    &mut self.log,
            outbox: &mut self.outbox,
        };
        f(&mut mote.rpl, &mut env)?;
        Ok(())
    }

    fn deliver(&mut self, queue: &mut EventQueue, frame: Frame) -> SimResult<()> {
        self.frames.delivered += 1;
        let src = LinkAddr::of(frame.from);
        self.with_node(queue, frame.to, |m, env| match frame.message {
            Message::Dio(dio) => m.on_dio_received(src, &dio, env),
            Message::Dis(dis) => m.on_dis_received(src, &dis, env),
            Message::Dao(dao) => m.on_dao_received(&dao, env),
        })
    }

    /// Send everything `from` queued.  Link feedback may queue more.
    fn transmit(&mut self, queue: &mut EventQueue, from: NodeId) -> SimResult<()> {
        while !self.outbox.is_empty() {
            for out in std::mem::take(&mut self.outbox) {
                match out.message {
                    Message::Dao(_) => self.send_dedicated(queue, from, out)?,
                    Message::Dis(_) | Message::Dio(_) => self.send_shared(queue, from, out),
                }
            }
        }
        Ok(())
    }

    /// Control traffic on the shared cell.  Every node in range hears the
    /// cell busy whether or not it decodes the frame.
    fn send_shared(&mut self, queue: &mut EventQueue, from: NodeId, out: Outgoing) {
        self.bump_shared(from);
        let receivers: Vec<NodeId> = if out.next_hop == LinkAddr::BROADCAST {
            self.topology.neighbors(from).to_vec()
        } else {
            match out.next_hop.node() {
                Some(to) if self.topology.pdr(from, to) > 0.0 => vec![to],
                _ => {
                    tracing::trace!(node = %from, next_hop = %out.next_hop, "unicast out of range dropped");
                    Vec::new()
                }
            }
        };
        for to in receivers {
            self.bump_shared(to);
            self.send_frame(queue, Frame { from, to, message: out.message });
        }
    }

    /// DAO on a dedicated cell: one attempt, acknowledged iff delivered.
    fn send_dedicated(&mut self, queue: &mut EventQueue, from: NodeId, out: Outgoing) -> SimResult<()> {
        let Some(to) = out.next_hop.node() else {
            tracing::trace!(node = %from, next_hop = %out.next_hop, "DAO to unknown link dropped");
            return Ok(());
        };
        let acked = self.send_frame(queue, Frame { from, to, message: out.message });
        self.with_node(queue, from, |m, env| {
            m.on_tx_result(out.next_hop, CellKind::Dedicated, acked, env)
        })
    }

    /// Draw the loss and, on success, deliver on the next tick.
    fn send_frame(&mut self, queue: &mut EventQueue, frame: Frame) -> bool {
        self.frames.sent += 1;
        if !self.rng.gen_bool(self.topology.pdr(frame.from, frame.to)) {
            self.frames.lost += 1;
            return false;
        }
        let seq = self.next_frame;
        self.next_frame += 1;
        queue.schedule_in(0, Tag::Frame(seq), SubOrder::Stack, Action::Deliver(frame));
        true
    }

    fn bump_shared(&mut self, node: NodeId) {
        if let Some(mote) = self.motes.get_mut(node.index()) {
            mote.shared.ops += 1;
        }
    }
}

impl<L: EventLog> Dispatch<Tag, Action> for Network<L> {
    fn dispatch(
        &mut self,
        queue:  &mut EventQueue,
        _tag:   Tag,
        action: Action,
    ) -> Result<(), DispatchError> {
        let node = match action {
            Action::Boot(node) => {
                self.with_node(queue, node, |m, env| m.start(env))?;
                node
            }
            Action::Timer(node, timer) => {
                self.with_node(queue, node, |m, env| m.on_timer(timer, env))?;
                node
            }
            Action::Deliver(frame) => {
                self.deliver(queue, frame)?;
                frame.to
            }
        };
        self.transmit(queue, node)?;
        Ok(())
    }
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// A ready-to-run simulation.
///
/// Create via [`SimBuilder`][crate::SimBuilder].  Every node boots on tick 1
/// and the run terminates at `settings.end_tick()`.
///
/// Once a run crashes the sim is poisoned: further runs and reports return
/// [`SimError::Aborted`].
pub struct Sim<L: EventLog> {
    pub queue: EventQueue,
    pub net:   Network<L>,
    pub(crate) crashed: Option<Tick>,
}

impl<L: EventLog> Sim<L> {
    #[inline]
    pub fn now(&self) -> Tick {
        self.queue.now()
    }

    pub fn settings(&self) -> &Settings {
        &self.net.settings
    }

    pub fn mote(&self, node: NodeId) -> Option<&Mote> {
        self.net.motes.get(node.index())
    }

    pub fn log(&self) -> &L {
        &self.net.log
    }

    pub fn into_log(self) -> L {
        self.net.log
    }

    /// Run until the termination tick or until no event is left.
    pub fn run(&mut self) -> SimResult<RunOutcome> {
        self.ensure_intact()?;
        let result = self.queue.run(&mut self.net);
        self.finish(result)
    }

    /// Run every tick up to and including `limit`.
    pub fn run_until(&mut self, limit: Tick) -> SimResult<RunOutcome> {
        self.ensure_intact()?;
        let result = self.queue.run_until(limit, &mut self.net);
        self.finish(result)
    }

    /// Tick of the crash that poisoned this sim, if any.
    pub fn crashed_at(&self) -> Option<Tick> {
        self.crashed
    }

    fn ensure_intact(&self) -> SimResult<()> {
        match self.crashed {
            Some(tick) => Err(SimError::Aborted { tick }),
            None => Ok(()),
        }
    }

    fn finish(&mut self, result: SchedResult<RunOutcome>) -> SimResult<RunOutcome> {
        match result {
            Ok(outcome) => {
                self.net.log.flush()?;
                tracing::info!(
                    tick = %outcome.last_tick,
                    reason = ?outcome.reason,
                    events = self.queue.dispatched(),
                    joined = self.joined_count(),
                    "run stopped"
                );
                Ok(outcome)
            }
            Err(error) => Err(self.crash(error)),
        }
    }

    fn crash(&mut self, error: SchedError) -> SimError {
        let tick = error.tick().unwrap_or_else(|| self.queue.now());
        self.crashed = Some(tick);
        tracing::error!(
            %tick,
            seed = self.net.settings.seed,
            variant = ?self.net.settings.trickle_variant,
            %error,
            "simulation crashed"
        );
        if let Err(flush) = self.net.log.flush() {
            tracing::warn!(error = %flush, "event log flush after crash failed");
        }
        SimError::Crashed(Box::new(CrashReport { tick, settings: self.net.settings.clone(), error }))
    }

    /// Reset one node's Trickle timer between runs, as an operator would.
    pub fn reset_trickle(&mut self, node: NodeId) -> SimResult<bool> {
        self.ensure_intact()?;
        let mut restarted = false;
        self.net.with_node(&mut self.queue, node, |m, env| {
            restarted = m.reset_trickle(env)?;
            Ok(())
        })?;
        self.net.transmit(&mut self.queue, node)?;
        Ok(restarted)
    }

    /// Nodes currently inside a DODAG (the root included).
    pub fn joined_count(&self) -> usize {
        self.net.motes.iter().filter(|m| m.rpl.dodag_id().is_some()).count()
    }

    /// End-of-run summary per node.  Refused after a crash.
    pub fn reports(&self) -> SimResult<Vec<NodeReport>> {
        self.ensure_intact()?;
        Ok(self
            .net
            .motes
            .iter()
            .map(|m| NodeReport {
                node:     m.id,
                is_root:  m.rpl.is_root(),
                state:    m.rpl.state(),
                dag_rank: m.rpl.dag_rank(),
                joined:   m.rpl.has_joined(),
                counters: m.rpl.counters(),
                trickle:  m.rpl.trickle().state().clone(),
            })
            .collect())
    }
}

impl<L: EventLog + Send + 'static> Sim<L> {
    /// Move the simulation onto its own thread and run it there.
    pub fn spawn(self) -> SimResult<SimHandle<L>> {
        let handle = std::thread::Builder::new()
            .name("rpl-sim".into())
            .spawn(move || {
                let mut sim = self;
                let result = sim.run();
                (sim, result)
            })
            .map_err(SimError::Spawn)?;
        Ok(SimHandle { handle })
    }
}

/// A simulation running on a worker thread.
pub struct SimHandle<L: EventLog> {
    handle: JoinHandle<(Sim<L>, SimResult<RunOutcome>)>,
}

impl<L: EventLog> SimHandle<L> {
    /// Wait for the run to end.  A crashed run yields its error and the
    /// partial state is dropped.
    pub fn join(self) -> SimResult<(Sim<L>, RunOutcome)> {
        let (sim, result) = self.handle.join().map_err(|_| SimError::WorkerPanicked)?;
        result.map(|outcome| (sim, outcome))
    }
}
