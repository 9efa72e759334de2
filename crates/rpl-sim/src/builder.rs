//! Fluent builder for constructing a [`Sim`].

use rpl_core::{DisMode, EventLog, LinkAddr, NodeId, NodeRng, NullLog, Settings, SimRng, Tick};
use rpl_dodag::DodagManager;
use rpl_sched::SubOrder;

use crate::event::{Action, EventQueue, SharedCell, Tag};
use crate::sim::{FrameStats, Mote, Network};
use crate::{Sim, SimError, SimResult, Topology};

/// Fluent builder for [`Sim<L>`].
///
/// # Optional inputs (have defaults)
///
/// | Method        | Default      |
/// |---------------|--------------|
/// | `.root(id)`   | `NodeId(0)`  |
/// | `.log(sink)`  | `NullLog`    |
///
/// # Example
///
/// ```rust,ignore
/// let topology = Topology::line(5, 0.9)?;
/// let mut sim = SimBuilder::new(settings, topology).log(MemoryLog::new()).build()?;
/// sim.run()?;
/// ```
pub struct SimBuilder<L: EventLog> {
    settings: Settings,
    topology: Topology,
    root:     NodeId,
    log:      L,
}

impl SimBuilder<NullLog> {
    pub fn new(settings: Settings, topology: Topology) -> Self {
        Self { settings, topology, root: NodeId(0), log: NullLog }
    }
}

impl<L: EventLog> SimBuilder<L> {
    pub fn root(mut self, root: NodeId) -> Self {
        self.root = root;
        self
    }

    /// Replace the structured event sink.
    pub fn log<M: EventLog>(self, log: M) -> SimBuilder<M> {
        SimBuilder { settings: self.settings, topology: self.topology, root: self.root, log }
    }

    /// Validate inputs, create one RPL stack per node and queue the boots.
    pub fn build(self) -> SimResult<Sim<L>> {
        self.settings.validate()?;
        let n = self.topology.len();
        if n == 0 {
            return Err(SimError::Config("topology has no nodes".into()));
        }
        if self.root.index() >= n {
            return Err(SimError::Config(format!(
                "root {} outside a {n}-node topology",
                self.root
            )));
        }

        let mut motes = Vec::with_capacity(n);
        for i in 0..n {
            let id = NodeId(i as u32);
            let is_root = id == self.root;
            let mut rpl = DodagManager::from_settings(id, is_root, &self.settings)?;
            if !is_root && self.settings.dis_mode == DisMode::Unicast {
                let proxy = self.topology.neighbors(id).first().map(|&nb| LinkAddr::of(nb));
                rpl.set_join_proxy(proxy);
            }
            motes.push(Mote {
                id,
                rpl,
                rng: NodeRng::new(self.settings.seed, id),
                shared: SharedCell::default(),
            });
        }

        // ── Boot order: root first, then ascending id ─────────────────────
        let mut queue = EventQueue::new();
        let order = std::iter::once(self.root).chain(motes.iter().map(|m| m.id).filter(|&id| id != self.root));
        for id in order {
            queue.schedule_at_or_next(Tick::ZERO, Tag::Boot(id), SubOrder::Admin, Action::Boot(id));
        }
        queue.terminate_at(self.settings.end_tick());

        tracing::info!(
            nodes = n,
            links = self.topology.link_count(),
            root = %self.root,
            variant = ?self.settings.trickle_variant,
            end = %self.settings.end_tick(),
            "simulation built"
        );

        let rng = SimRng::new(self.settings.seed).child(u64::from(u32::MAX));
        Ok(Sim {
            queue,
            net: Network {
                settings: self.settings,
                topology: self.topology,
                motes,
                log: self.log,
                frames: FrameStats::default(),
                rng,
                next_frame: 0,
                outbox: Vec::new(),
            },
            crashed: None,
        })
    }
}
