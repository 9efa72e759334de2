//! Optional capabilities a component may expose to its collaborators.
//!
//! Not every objective function tracks neighbors and not every harness can
//! observe the shared control cell.  Consumers receive these as
//! `Option<&dyn Trait>` and treat `None` as "zero neighbors" / "no
//! measurement", never as an error.

/// Exposes the current neighbor count.
pub trait NeighborSource {
    fn neighbor_count(&self) -> usize;
}

/// Observes the shared (minimal) control cell of the node's MAC layer.
pub trait ChannelProbe {
    /// Cumulative number of operations (tx or rx) seen on the shared cell,
    /// or `None` if the node has no shared cell.
    fn shared_cell_ops(&self) -> Option<u64>;
}

/// Neighbor count seen through an optional capability.
#[inline]
pub fn neighbor_count(source: Option<&dyn NeighborSource>) -> usize {
    source.map_or(0, |s| s.neighbor_count())
}
