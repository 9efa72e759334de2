//! Per-node neighbor table.
//!
//! Records live in an arena indexed by [`NeighborId`] and are looked up by
//! link-layer address.  A record is created on the first DIO from a neighbor
//! and never removed; a departed neighbor is recognised by its infinite
//! advertised rank.  Callers hold ids, never references, across callbacks.

use rpl_core::{LinkAddr, NeighborId, NeighborSource};
use rustc_hash::FxHashMap;

use crate::rank;

/// The kind of TSCH cell a frame went out on.  Only dedicated cells feed
/// the ETX estimate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    Dedicated,
    Shared,
    Autonomous,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NeighborRecord {
    pub link:            LinkAddr,
    pub advertised_rank: Option<u32>,
    /// `None` while the link's ETX is above the acceptable limit.
    pub rank_increase:   Option<u32>,
    pub etx:             f64,
    /// Transmissions since the last ETX computation.
    pub tx_count:        u32,
    pub tx_ack_count:    u32,
}

impl NeighborRecord {
    fn new(link: LinkAddr, etx: f64) -> Self {
        Self {
            link,
            advertised_rank: None,
            rank_increase: rank::rank_increase(etx),
            etx,
            tx_count: 0,
            tx_ack_count: 0,
        }
    }

    /// Rank through this neighbor, if it is usable at all.
    #[inline]
    pub fn candidate_rank(&self) -> Option<u32> {
        rank::candidate_rank(self.advertised_rank, self.rank_increase)
    }
}

#[derive(Clone, Debug, Default)]
pub struct NeighborTable {
    records: Vec<NeighborRecord>,
    by_link: FxHashMap<LinkAddr, NeighborId>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn find(&self, link: LinkAddr) -> Option<NeighborId> {
        self.by_link.get(&link).copied()
    }

    /// Id of the record for `link`, creating it with `etx` if absent.
    pub fn find_or_insert(&mut self, link: LinkAddr, etx: f64) -> NeighborId {
        if let Some(id) = self.find(link) {
            return id;
        }
        let id = NeighborId(self.records.len() as u32);
        self.records.push(NeighborRecord::new(link, etx));
        self.by_link.insert(link, id);
        id
    }

    #[inline]
    pub fn get(&self, id: NeighborId) -> Option<&NeighborRecord> {
        self.records.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: NeighborId) -> Option<&mut NeighborRecord> {
        self.records.get_mut(id.index())
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NeighborId, &NeighborRecord)> {
        self.records.iter().enumerate().map(|(i, r)| (NeighborId(i as u32), r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NeighborSource for NeighborTable {
    fn neighbor_count(&self) -> usize {
        self.records.len()
    }
}
