//! Per-node RPL control plane: DODAG membership, DIS/DIO/DAO handling and
//! the node's Trickle timer.
//!
//! The manager owns the objective function and the Trickle controller.  It
//! never touches the scheduler or the radio directly: timers go through
//! [`RplTimers`], outgoing messages are pushed onto the caller's outbox, and
//! structured records go to the injected [`EventLog`].

use rpl_core::{
    global_addr, link_local_addr, link_of, Address, ChannelProbe, DioKind, DisMode, EventLog,
    LinkAddr, LogRecord, NeighborId, NodeId, NodeRng, ResetCause, Settings, SlotClock, Tick,
    ALL_RPL_NODES,
};
use rpl_trickle::{TimerOutcome, TrickleController, TrickleEnv, TrickleTimer, TrickleTimers};
use rustc_hash::FxHashMap;

use crate::message::{Dao, Dio, Dis, Message, Outgoing};
use crate::neighbor::CellKind;
use crate::objective::{ObjectiveFunction, Of0, Of0Config, OfNone, ParentOutcome};
use crate::rank::{self, INFINITE_RANK, MIN_HOP_RANK_INCREASE};
use crate::routes::SourceRoutes;
use crate::RplResult;

// ── Timer plumbing ────────────────────────────────────────────────────────────

/// Every timer one node's RPL layer can have pending.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RplTimer {
    Trickle(TrickleTimer),
    /// Periodic DIS while not joined.
    Dis,
    /// Next DAO to the root.
    Dao,
}

/// Event-queue access for one node.  Scheduling a pending timer replaces
/// it; ticks that are not in the future land on `now + 1`.
pub trait RplTimers {
    fn now(&self) -> Tick;
    fn schedule(&mut self, at: Tick, timer: RplTimer) -> Tick;
    fn cancel(&mut self, timer: RplTimer);
}

/// Lends an [`RplTimers`] to the Trickle controller.
struct TrickleTimersOf<'t, 'a>(&'t mut (dyn RplTimers + 'a));

impl TrickleTimers for TrickleTimersOf<'_, '_> {
    fn now(&self) -> Tick {
        self.0.now()
    }

    fn schedule(&mut self, at: Tick, timer: TrickleTimer) -> Tick {
        self.0.schedule(at, RplTimer::Trickle(timer))
    }

    fn cancel(&mut self, timer: TrickleTimer) {
        self.0.cancel(RplTimer::Trickle(timer));
    }
}

/// Everything the manager borrows from the harness for one call.
pub struct RplEnv<'a> {
    pub timers: &'a mut dyn RplTimers,
    pub rng:    &'a mut NodeRng,
    pub probe:  Option<&'a dyn ChannelProbe>,
    pub log:    &'a mut dyn EventLog,
    pub outbox: &'a mut Vec<Outgoing>,
}

// ── Configuration and state ───────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DodagConfig {
    pub node:                NodeId,
    pub is_root:             bool,
    pub dis_mode:            DisMode,
    pub dis_period_ms:       u64,
    /// `0` disables DAOs.
    pub dao_period_ms:       u64,
    pub dis_reset_threshold: u32,
    pub dio_answers_request: bool,
    pub slot:                SlotClock,
}

impl DodagConfig {
    pub fn from_settings(node: NodeId, is_root: bool, settings: &Settings) -> Self {
        Self {
            node,
            is_root,
            dis_mode:            settings.dis_mode,
            dis_period_ms:       settings.dis_period_ms,
            dao_period_ms:       settings.dao_period_ms,
            dis_reset_threshold: settings.dis_reset_threshold,
            dio_answers_request: settings.dio_answers_request,
            slot:                settings.slot_clock(),
        }
    }
}

/// Control messages sent so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RplCounters {
    /// Multicast DIOs of any kind.
    pub dio_sent:         u64,
    pub dio_trickle_sent: u64,
    pub dis_sent:         u64,
    pub dao_sent:         u64,
}

/// Snapshot of a node's routing state.  `rank == None` means infinite rank.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NodeRplState {
    pub dodag_id:         Option<Address>,
    pub rank:             Option<u32>,
    pub preferred_parent: Option<LinkAddr>,
}

// ── Manager ───────────────────────────────────────────────────────────────────

pub struct DodagManager {
    config:     DodagConfig,
    of:         Box<dyn ObjectiveFunction>,
    trickle:    TrickleController,
    dodag_id:   Option<Address>,
    /// Neighbor a unicast DIS goes to before joining.
    join_proxy: Option<LinkAddr>,
    joined:     bool,
    /// Broadcast DIS received per neighbor since the last DIS reset.
    dis_from:   FxHashMap<LinkAddr, u32>,
    routes:     SourceRoutes,
    counters:   RplCounters,
}

impl DodagManager {
    pub fn new(
        config:  DodagConfig,
        of:      Box<dyn ObjectiveFunction>,
        trickle: TrickleController,
    ) -> Self {
        Self {
            config,
            of,
            trickle,
            dodag_id: None,
            join_proxy: None,
            joined: false,
            dis_from: FxHashMap::default(),
            routes: SourceRoutes::new(),
            counters: RplCounters::default(),
        }
    }

    /// Manager with OF0 (non-root) or a fixed-rank objective (root) and the
    /// Trickle variant selected in `settings`.
    pub fn from_settings(node: NodeId, is_root: bool, settings: &Settings) -> RplResult<Self> {
        let of: Box<dyn ObjectiveFunction> = if is_root {
            Box::new(OfNone::default())
        } else {
            Box::new(Of0::new(Of0Config::from_settings(settings))?)
        };
        let trickle = TrickleController::from_settings(settings)?;
        Ok(Self::new(DodagConfig::from_settings(node, is_root, settings), of, trickle))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &DodagConfig {
        &self.config
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.config.node
    }

    #[inline]
    pub fn link(&self) -> LinkAddr {
        LinkAddr::of(self.config.node)
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.config.is_root
    }

    pub fn dodag_id(&self) -> Option<Address> {
        self.dodag_id
    }

    pub fn rank(&self) -> Option<u32> {
        self.of.rank()
    }

    pub fn dag_rank(&self) -> Option<u32> {
        self.of.rank().map(rank::dag_rank)
    }

    pub fn preferred_parent(&self) -> Option<NeighborId> {
        self.of.preferred_parent()
    }

    pub fn preferred_parent_link(&self) -> Option<LinkAddr> {
        self.of.parent_link()
    }

    pub fn state(&self) -> NodeRplState {
        NodeRplState {
            dodag_id:         self.dodag_id,
            rank:             self.of.rank(),
            preferred_parent: self.of.parent_link(),
        }
    }

    pub fn objective(&self) -> &dyn ObjectiveFunction {
        self.of.as_ref()
    }

    pub fn trickle(&self) -> &TrickleController {
        &self.trickle
    }

    pub fn counters(&self) -> RplCounters {
        self.counters
    }

    pub fn routes(&self) -> &SourceRoutes {
        &self.routes
    }

    /// Whether this node has joined a DODAG at least once.
    pub fn has_joined(&self) -> bool {
        self.joined
    }

    pub fn set_join_proxy(&mut self, proxy: Option<LinkAddr>) {
        self.join_proxy = proxy;
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Root: create the DODAG and start Trickle.  Non-root: solicit DIOs.
    pub fn start(&mut self, env: &mut RplEnv<'_>) -> RplResult<()> {
        if self.config.is_root {
            self.dodag_id = Some(global_addr(self.link()));
            self.of = Box::new(OfNone::with_rank(MIN_HOP_RANK_INCREASE));
            tracing::info!(node = %self.config.node, "DODAG root started");
            return self.start_or_reset_trickle(ResetCause::Start, env);
        }
        if self.config.dis_mode == DisMode::Disabled {
            return Ok(());
        }
        let dst = match (self.config.dis_mode, self.join_proxy) {
            (DisMode::Unicast, Some(proxy)) => link_local_addr(proxy),
            (DisMode::Unicast, None) => {
                tracing::warn!(node = %self.config.node, "no join proxy for unicast DIS; broadcasting");
                ALL_RPL_NODES
            }
            _ => ALL_RPL_NODES,
        };
        self.send_dis(dst, env);
        self.start_dis_timer(env);
        Ok(())
    }

    /// Leave the DODAG and cancel every timer.
    pub fn stop(&mut self, env: &mut RplEnv<'_>) {
        self.dodag_id = None;
        self.trickle.stop(&mut TrickleTimersOf(&mut *env.timers));
        env.timers.cancel(RplTimer::Dis);
        env.timers.cancel(RplTimer::Dao);
    }

    pub fn on_timer(&mut self, timer: RplTimer, env: &mut RplEnv<'_>) -> RplResult<()> {
        match timer {
            RplTimer::Trickle(t) => {
                let outcome = self.with_trickle(env, |c, e| c.on_timer(t, e))?;
                if outcome == TimerOutcome::Transmit {
                    self.send_dio(None, DioKind::Trickle, env);
                }
            }
            RplTimer::Dis => {
                self.send_dis(ALL_RPL_NODES, env);
                self.start_dis_timer(env);
            }
            RplTimer::Dao => {
                if self.of.parent_link().is_some() {
                    self.send_dao(env);
                    self.schedule_dao(false, env);
                }
            }
        }
        Ok(())
    }

    // ── Reception ─────────────────────────────────────────────────────────

    pub fn on_dio_received(
        &mut self,
        src: LinkAddr,
        dio: &Dio,
        env: &mut RplEnv<'_>,
    ) -> RplResult<()> {
        if self.config.is_root {
            return Ok(());
        }
        env.log.record(
            env.timers.now(),
            LogRecord::DioRx {
                node:     self.config.node,
                src,
                rank:     dio.rank,
                dodag_id: dio.dodag_id,
            },
        );

        if rank::is_infinite(dio.rank) {
            if self.dodag_id.is_none() {
                return Ok(());
            }
            self.start_or_reset_trickle(ResetCause::InfiniteRank, env)?;
        }

        if self.of.advertised_rank(src) == Some(dio.rank) {
            self.trickle.increment_consistency();
        }

        let outcome = self.of.update(src, dio.rank);
        self.apply(outcome, env)?;

        if self.of.preferred_parent().is_some() && self.dodag_id != Some(dio.dodag_id) {
            self.join_dodag(dio.dodag_id, env)?;
        }
        Ok(())
    }

    pub fn on_dis_received(
        &mut self,
        src: LinkAddr,
        dis: &Dis,
        env: &mut RplEnv<'_>,
    ) -> RplResult<()> {
        env.log.record(
            env.timers.now(),
            LogRecord::DisRx { node: self.config.node, src, dst: dis.dst },
        );
        if self.dodag_id.is_none() {
            return Ok(());
        }

        let own = self.link();
        if dis.dst == link_local_addr(own) || dis.dst == global_addr(own) {
            self.send_dio(Some(dis.src), DioKind::DisReply, env);
        } else if dis.dst == ALL_RPL_NODES {
            self.send_dio(None, DioKind::DisReply, env);
            let count = self.dis_from.entry(src).or_insert(0);
            *count += 1;
            if *count >= self.config.dis_reset_threshold {
                self.dis_from.clear();
                self.start_or_reset_trickle(ResetCause::DisReceived, env)?;
            }
        } else {
            tracing::trace!(node = %self.config.node, dst = %dis.dst, "DIS for another node ignored");
        }
        Ok(())
    }

    /// Root: record the child → parent relation.  Others: forward towards
    /// the root through the preferred parent.
    pub fn on_dao_received(&mut self, dao: &Dao, env: &mut RplEnv<'_>) -> RplResult<()> {
        if self.config.is_root {
            env.log.record(
                env.timers.now(),
                LogRecord::DaoRx { node: self.config.node, child: dao.src, parent: dao.parent },
            );
            self.routes.insert(dao.src, dao.parent);
        } else if let Some(parent) = self.of.parent_link() {
            env.outbox.push(Outgoing { next_hop: parent, message: Message::Dao(*dao) });
        } else {
            tracing::trace!(node = %self.config.node, child = %dao.src, "DAO dropped: no parent");
        }
        Ok(())
    }

    /// Link-layer feedback for a unicast frame sent to `dst`.
    pub fn on_tx_result(
        &mut self,
        dst:   LinkAddr,
        cell:  CellKind,
        acked: bool,
        env:   &mut RplEnv<'_>,
    ) -> RplResult<()> {
        let outcome = self.of.on_tx_result(dst, cell, acked);
        self.apply(outcome, env)
    }

    /// Stop using `link` as a parent candidate.
    pub fn poison_parent(&mut self, link: LinkAddr, env: &mut RplEnv<'_>) -> RplResult<()> {
        let outcome = self.of.poison(link);
        self.apply(outcome, env)
    }

    /// Reset Trickle on the owner's request (cause `External`).  Returns
    /// whether an interval was restarted; ignored outside a DODAG.
    pub fn reset_trickle(&mut self, env: &mut RplEnv<'_>) -> RplResult<bool> {
        if self.dodag_id.is_none() {
            return Ok(false);
        }
        Ok(self.with_trickle(env, |c, e| c.reset(ResetCause::External, e))?)
    }

    /// Source route from the root to `dst` (root excluded, `dst` last).
    /// Only the root knows routes.
    pub fn compute_source_route(&self, dst: Address) -> Option<Vec<Address>> {
        if !self.config.is_root {
            return None;
        }
        self.routes.route(global_addr(self.link()), dst)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn with_trickle<R>(
        &mut self,
        env: &mut RplEnv<'_>,
        f:   impl FnOnce(&mut TrickleController, &mut TrickleEnv<'_>) -> R,
    ) -> R {
        let mut timers = TrickleTimersOf(&mut *env.timers);
        let mut trickle_env = TrickleEnv {
            node:      self.config.node,
            timers:    &mut timers,
            rng:       &mut *env.rng,
            neighbors: self.of.neighbor_source(),
            probe:     env.probe,
            log:       &mut *env.log,
        };
        f(&mut self.trickle, &mut trickle_env)
    }

    /// Start Trickle, or reset it if already running.  Only inside a DODAG.
    fn start_or_reset_trickle(&mut self, cause: ResetCause, env: &mut RplEnv<'_>) -> RplResult<()> {
        if self.dodag_id.is_none() {
            return Ok(());
        }
        if self.trickle.is_running() {
            self.with_trickle(env, |c, e| c.reset(cause, e))?;
        } else {
            self.with_trickle(env, |c, e| c.start(e))?;
        }
        Ok(())
    }

    fn apply(&mut self, outcome: ParentOutcome, env: &mut RplEnv<'_>) -> RplResult<()> {
        match outcome {
            ParentOutcome::Unchanged => Ok(()),
            ParentOutcome::Changed { old, new } => {
                tracing::info!(
                    node = %self.config.node,
                    old = ?old,
                    new = %new,
                    rank = ?self.of.rank(),
                    "preferred parent changed"
                );
                self.parent_changed(Some(new), env)
            }
            ParentOutcome::LocalRepair { old } => {
                self.parent_changed(None, env)?;
                self.local_repair(old, env);
                Ok(())
            }
        }
    }

    fn parent_changed(&mut self, new: Option<LinkAddr>, env: &mut RplEnv<'_>) -> RplResult<()> {
        env.log.record(
            env.timers.now(),
            LogRecord::ParentChange { node: self.config.node, rank: self.of.rank(), parent: new },
        );
        match new {
            Some(_) => {
                self.schedule_dao(true, env);
                self.start_or_reset_trickle(ResetCause::NewRank, env)
            }
            None => {
                env.timers.cancel(RplTimer::Dao);
                self.send_dio(None, DioKind::NoParent, env);
                self.trickle.stop(&mut TrickleTimersOf(&mut *env.timers));
                self.start_dis_timer(env);
                Ok(())
            }
        }
    }

    fn local_repair(&mut self, old: LinkAddr, env: &mut RplEnv<'_>) {
        tracing::warn!(node = %self.config.node, old_parent = %old, "local repair");
        env.log.record(env.timers.now(), LogRecord::LocalRepair { node: self.config.node });
        self.dodag_id = None;
    }

    fn join_dodag(&mut self, dodag_id: Address, env: &mut RplEnv<'_>) -> RplResult<()> {
        self.dodag_id = Some(dodag_id);
        self.start_or_reset_trickle(ResetCause::JoinedDodag, env)?;
        env.timers.cancel(RplTimer::Dis);
        if !self.joined {
            self.joined = true;
            tracing::info!(node = %self.config.node, %dodag_id, rank = ?self.of.rank(), "joined DODAG");
            env.log.record(env.timers.now(), LogRecord::Joined { node: self.config.node, dodag_id });
        }
        Ok(())
    }

    fn start_dis_timer(&mut self, env: &mut RplEnv<'_>) {
        if self.config.dis_mode == DisMode::Disabled {
            return;
        }
        let delay = self.config.slot.ticks_for_ms(self.config.dis_period_ms as f64);
        let now = env.timers.now();
        env.timers.schedule(now + delay, RplTimer::Dis);
    }

    /// The first DAO goes out on the next tick; later ones every
    /// `dao_period_ms * U(0.8, 1.2)`.
    fn schedule_dao(&mut self, first: bool, env: &mut RplEnv<'_>) {
        if self.config.dao_period_ms == 0 {
            return;
        }
        let delay = if first {
            1
        } else {
            let period = self.config.dao_period_ms as f64;
            self.config.slot.ticks_for_ms(env.rng.uniform(0.8 * period, 1.2 * period))
        };
        let now = env.timers.now();
        env.timers.schedule(now + delay, RplTimer::Dao);
    }

    fn send_dis(&mut self, dst: Address, env: &mut RplEnv<'_>) {
        let dis = Dis { src: link_local_addr(self.link()), dst };
        env.log.record(env.timers.now(), LogRecord::DisTx { node: self.config.node, dst });
        self.counters.dis_sent += 1;
        let next_hop = if dst.is_multicast() { LinkAddr::BROADCAST } else { link_of(&dst) };
        env.outbox.push(Outgoing { next_hop, message: Message::Dis(dis) });
    }

    /// Send a DIO to `dst` (multicast when `None`).  Nothing is sent outside
    /// a DODAG.
    fn send_dio(&mut self, dst: Option<Address>, kind: DioKind, env: &mut RplEnv<'_>) {
        let Some(dodag_id) = self.dodag_id else {
            return;
        };
        let dst = dst.unwrap_or(ALL_RPL_NODES);
        let rank = self.of.rank().unwrap_or(INFINITE_RANK);
        let multicast = dst.is_multicast();
        if multicast {
            self.counters.dio_sent += 1;
        }
        if kind == DioKind::Trickle {
            self.counters.dio_trickle_sent += 1;
        }

        let dio = Dio {
            src: link_local_addr(self.link()),
            dst,
            rank,
            dodag_id,
            kind,
            answers_request: kind == DioKind::DisReply && self.config.dio_answers_request,
        };
        env.log.record(
            env.timers.now(),
            LogRecord::DioTx { node: self.config.node, dst, rank, dodag_id, kind },
        );
        let next_hop = if multicast { LinkAddr::BROADCAST } else { link_of(&dst) };
        env.outbox.push(Outgoing { next_hop, message: Message::Dio(dio) });
    }

    fn send_dao(&mut self, env: &mut RplEnv<'_>) {
        let (Some(dodag_id), Some(parent)) = (self.dodag_id, self.of.parent_link()) else {
            return;
        };
        let dao = Dao { src: global_addr(self.link()), dst: dodag_id, parent: global_addr(parent) };
        env.log.record(
            env.timers.now(),
            LogRecord::DaoTx { node: self.config.node, parent: dao.parent },
        );
        self.counters.dao_sent += 1;
        env.outbox.push(Outgoing { next_hop: parent, message: Message::Dao(dao) });
    }
}

impl std::fmt::Debug for DodagManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DodagManager")
            .field("node", &self.config.node)
            .field("root", &self.config.is_root)
            .field("dodag_id", &self.dodag_id)
            .field("rank", &self.of.rank())
            .field("parent", &self.of.parent_link())
            .field("trickle", &self.trickle)
            .finish_non_exhaustive()
    }
}
