//! Static radio connectivity.
//!
//! Each directed link carries a packet delivery ratio (PDR): the
//! probability that one frame sent from `a` is received by `b`.  Links are
//! fixed for the whole run; there is no propagation model.

use rpl_core::{check_probability, NodeId};
use rustc_hash::FxHashMap;

use crate::{SimError, SimResult};

#[derive(Clone, Debug, Default)]
pub struct Topology {
    /// Outgoing neighbors per node, in insertion order.
    neighbors: Vec<Vec<NodeId>>,
    pdr:       FxHashMap<(NodeId, NodeId), f64>,
}

impl Topology {
    /// `n` nodes, no links.
    pub fn new(n: usize) -> Self {
        Self { neighbors: vec![Vec::new(); n], pdr: FxHashMap::default() }
    }

    /// Nodes `0 - 1 - ... - n-1`, every link symmetric with the same PDR.
    pub fn line(n: usize, pdr: f64) -> SimResult<Self> {
        let mut t = Self::new(n);
        for i in 1..n {
            t.connect(node(i - 1), node(i), pdr)?;
        }
        Ok(t)
    }

    /// Every node hears every other node with the same PDR.
    pub fn full_mesh(n: usize, pdr: f64) -> SimResult<Self> {
        let mut t = Self::new(n);
        for a in 0..n {
            for b in a + 1..n {
                t.connect(node(a), node(b), pdr)?;
            }
        }
        Ok(t)
    }

    /// Add (or overwrite) the directed link `from → to`.
    pub fn add_link(&mut self, from: NodeId, to: NodeId, pdr: f64) -> SimResult<()> {
        if from == to {
            return Err(SimError::Config(format!("self-link on {from}")));
        }
        let n = self.neighbors.len();
        if from.index() >= n || to.index() >= n {
            return Err(SimError::Config(format!(
                "link {from} -> {to} outside a {n}-node topology"
            )));
        }
        let pdr = check_probability("pdr", pdr)?;
        if self.pdr.insert((from, to), pdr).is_none() {
            self.neighbors[from.index()].push(to);
        }
        Ok(())
    }

    /// Add both directions with the same PDR.
    pub fn connect(&mut self, a: NodeId, b: NodeId, pdr: f64) -> SimResult<()> {
        self.add_link(a, b, pdr)?;
        self.add_link(b, a, pdr)
    }

    /// Delivery ratio of `from → to`; `0.0` when there is no link.
    #[inline]
    pub fn pdr(&self, from: NodeId, to: NodeId) -> f64 {
        self.pdr.get(&(from, to)).copied().unwrap_or(0.0)
    }

    /// Nodes that can hear `node`.
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.neighbors.get(node.index()).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn link_count(&self) -> usize {
        self.pdr.len()
    }
}

#[inline]
fn node(i: usize) -> NodeId {
    NodeId(i as u32)
}
