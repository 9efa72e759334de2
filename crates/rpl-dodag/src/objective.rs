//! Objective functions: rank computation and preferred-parent selection.
//!
//! # Parent selection (OF0 with ETX, RFC 8180 §5.1.1)
//!
//! ```text
//! eligible(n)   = candidate(n) is some
//!                 and (own rank unknown or own rank - advertised(n) >= MinHopRankIncrease)
//! candidate(n)  = min(advertised(n) + rank_increase(n), INFINITE_RANK)
//! keep parent   if own rank is known, parent.advertised - rank < PARENT_SWITCH_RANK_THRESHOLD
//!               and parent.rank_increase < PARENT_SWITCH_RANK_INCREASE_THRESHOLD
//! switch        to argmin candidate if own rank is unknown
//!               or rank - best > PARENT_SWITCH_RANK_THRESHOLD
//! local repair  when no candidate is eligible but a parent was set
//! ```

use rpl_core::{LinkAddr, NeighborId, NeighborSource, Settings};

use crate::neighbor::{CellKind, NeighborTable};
use crate::rank::{
    self, INFINITE_RANK, INVALID_ETX, MIN_HOP_RANK_INCREASE, PARENT_SWITCH_RANK_INCREASE_THRESHOLD,
    PARENT_SWITCH_RANK_THRESHOLD,
};
use crate::{RplError, RplResult};

/// What a call into the objective function did to the preferred parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParentOutcome {
    Unchanged,
    Changed { old: Option<LinkAddr>, new: LinkAddr },
    /// The last eligible parent is gone.  Rank and parent have been cleared.
    LocalRepair { old: LinkAddr },
}

/// Pluggable rank/parent policy.
///
/// Only [`rank`][Self::rank] is required; objective functions that do not
/// track neighbors keep the defaults, which never change anything.
pub trait ObjectiveFunction: Send {
    fn rank(&self) -> Option<u32>;

    fn preferred_parent(&self) -> Option<NeighborId> {
        None
    }

    fn parent_link(&self) -> Option<LinkAddr> {
        None
    }

    /// Rank last advertised by `link`, if it is a known neighbor.
    fn advertised_rank(&self, _link: LinkAddr) -> Option<u32> {
        None
    }

    /// Feed a received DIO.
    fn update(&mut self, _src: LinkAddr, _advertised_rank: u32) -> ParentOutcome {
        ParentOutcome::Unchanged
    }

    /// Feed the result of a unicast transmission to `dst`.
    fn on_tx_result(&mut self, _dst: LinkAddr, _cell: CellKind, _acked: bool) -> ParentOutcome {
        ParentOutcome::Unchanged
    }

    /// Treat `link` as advertising infinite rank and re-select.
    fn poison(&mut self, _link: LinkAddr) -> ParentOutcome {
        ParentOutcome::Unchanged
    }

    /// Neighbor count capability, when the objective function has one.
    fn neighbor_source(&self) -> Option<&dyn NeighborSource> {
        None
    }
}

// ── OfNone ────────────────────────────────────────────────────────────────────

/// Fixed rank and parent, set from outside.  Used by the DODAG root.
#[derive(Clone, Debug, Default)]
pub struct OfNone {
    rank:   Option<u32>,
    parent: Option<LinkAddr>,
}

impl OfNone {
    pub fn with_rank(rank: u32) -> Self {
        Self { rank: Some(rank), parent: None }
    }
}

impl ObjectiveFunction for OfNone {
    fn rank(&self) -> Option<u32> {
        self.rank
    }

    fn parent_link(&self) -> Option<LinkAddr> {
        self.parent
    }
}

// ── OF0 ───────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Of0Config {
    /// ETX assumed for a neighbor before any measurement.
    pub etx_default:  f64,
    /// Transmissions accumulated before ETX is recomputed.
    pub tx_cutoff:    u32,
    /// Unacknowledged transmissions in a row after which the link is
    /// declared unusable.
    pub max_failures: u32,
}

impl Default for Of0Config {
    fn default() -> Self {
        Self {
            etx_default:  rank::UPPER_LIMIT_ACCEPTABLE_ETX,
            tx_cutoff:    100,
            max_failures: 10,
        }
    }
}

impl Of0Config {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            etx_default:  settings.etx_default,
            tx_cutoff:    settings.etx_tx_cutoff,
            max_failures: settings.max_consecutive_failures,
        }
    }

    pub fn validate(&self) -> RplResult<()> {
        if !(self.etx_default >= 1.0) {
            return Err(RplError::Config(format!(
                "etx_default must be at least 1, got {}",
                self.etx_default
            )));
        }
        if self.tx_cutoff == 0 {
            return Err(RplError::Config("tx_cutoff must be positive".into()));
        }
        Ok(())
    }
}

/// Objective Function Zero with the ETX-based step of rank.
#[derive(Clone, Debug)]
pub struct Of0 {
    config:    Of0Config,
    neighbors: NeighborTable,
    rank:      Option<u32>,
    parent:    Option<NeighborId>,
}

impl Of0 {
    pub fn new(config: Of0Config) -> RplResult<Self> {
        config.validate()?;
        Ok(Self { config, neighbors: NeighborTable::new(), rank: None, parent: None })
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    fn link(&self, id: NeighborId) -> Option<LinkAddr> {
        self.neighbors.get(id).map(|r| r.link)
    }

    fn update_rank_increase(&mut self, id: NeighborId) {
        let Some(record) = self.neighbors.get_mut(id) else {
            return;
        };
        record.rank_increase = rank::rank_increase(record.etx);
        let candidate = record.candidate_rank();
        if self.parent == Some(id) {
            self.rank = candidate;
        }
    }

    /// The current parent still looks good enough to stay with.
    fn keeps_parent(&self) -> bool {
        let (Some(parent), Some(own)) = (self.parent, self.rank) else {
            return false;
        };
        let Some(record) = self.neighbors.get(parent) else {
            return false;
        };
        match (record.advertised_rank, record.rank_increase) {
            (Some(advertised), Some(increase)) => {
                (advertised as i64 - own as i64) < PARENT_SWITCH_RANK_THRESHOLD as i64
                    && increase < PARENT_SWITCH_RANK_INCREASE_THRESHOLD
            }
            _ => false,
        }
    }

    /// Eligible neighbor with the lowest candidate rank; the earliest-added
    /// one wins ties.
    fn best_candidate(&self) -> Option<(NeighborId, u32)> {
        self.neighbors
            .iter()
            .filter_map(|(id, r)| {
                let candidate = r.candidate_rank()?;
                let eligible = match (self.rank, r.advertised_rank) {
                    (None, _) => true,
                    (Some(own), Some(advertised)) => {
                        own as i64 - advertised as i64 >= MIN_HOP_RANK_INCREASE as i64
                    }
                    (Some(_), None) => false,
                };
                eligible.then_some((id, candidate))
            })
            .min_by_key(|&(_, candidate)| candidate)
    }

    fn select_parent(&mut self) -> ParentOutcome {
        if self.keeps_parent() {
            return ParentOutcome::Unchanged;
        }

        let new_parent = match (self.best_candidate(), self.rank) {
            (None, _) => None,
            (Some((id, candidate)), None) => {
                self.rank = Some(candidate);
                Some(id)
            }
            (Some((id, candidate)), Some(own)) => {
                if own as i64 - candidate as i64 > PARENT_SWITCH_RANK_THRESHOLD as i64 {
                    self.rank = Some(candidate);
                    Some(id)
                } else {
                    self.parent
                }
            }
        };

        match (new_parent, self.parent) {
            (Some(new), old) if Some(new) != old => {
                let old = old.and_then(|id| self.link(id));
                self.parent = Some(new);
                match self.link(new) {
                    Some(new) => ParentOutcome::Changed { old, new },
                    None => ParentOutcome::Unchanged,
                }
            }
            (None, Some(old)) => {
                self.rank = None;
                self.parent = None;
                match self.link(old) {
                    Some(old) => ParentOutcome::LocalRepair { old },
                    None => ParentOutcome::Unchanged,
                }
            }
            _ => ParentOutcome::Unchanged,
        }
    }
}

impl ObjectiveFunction for Of0 {
    fn rank(&self) -> Option<u32> {
        self.rank
    }

    fn preferred_parent(&self) -> Option<NeighborId> {
        self.parent
    }

    fn parent_link(&self) -> Option<LinkAddr> {
        self.parent.and_then(|id| self.link(id))
    }

    fn advertised_rank(&self, link: LinkAddr) -> Option<u32> {
        self.neighbors.find(link).and_then(|id| self.neighbors.get(id)?.advertised_rank)
    }

    fn update(&mut self, src: LinkAddr, advertised_rank: u32) -> ParentOutcome {
        let id = self.neighbors.find_or_insert(src, self.config.etx_default);
        if let Some(record) = self.neighbors.get_mut(id) {
            record.advertised_rank = Some(advertised_rank.min(INFINITE_RANK));
        }
        if self.parent == Some(id) && rank::is_infinite(advertised_rank) {
            self.rank = None;
        }
        self.select_parent()
    }

    fn on_tx_result(&mut self, dst: LinkAddr, cell: CellKind, acked: bool) -> ParentOutcome {
        if cell != CellKind::Dedicated {
            return ParentOutcome::Unchanged;
        }
        let Some(id) = self.neighbors.find(dst) else {
            return ParentOutcome::Unchanged;
        };
        let (cutoff, max_failures) = (self.config.tx_cutoff, self.config.max_failures);
        if let Some(r) = self.neighbors.get_mut(id) {
            r.tx_count += 1;
            if acked {
                r.tx_ack_count += 1;
            }
            if r.tx_count >= cutoff {
                r.etx = if r.tx_ack_count > 0 {
                    r.tx_count as f64 / r.tx_ack_count as f64
                } else {
                    INVALID_ETX
                };
                r.tx_count = 0;
                r.tx_ack_count = 0;
            } else if r.tx_ack_count == 0 && r.tx_count >= max_failures {
                r.etx = INVALID_ETX;
            }
        }
        self.update_rank_increase(id);
        self.select_parent()
    }

    fn poison(&mut self, link: LinkAddr) -> ParentOutcome {
        let Some(id) = self.neighbors.find(link) else {
            return ParentOutcome::Unchanged;
        };
        if let Some(record) = self.neighbors.get_mut(id) {
            record.advertised_rank = Some(INFINITE_RANK);
        }
        self.rank = None;
        self.select_parent()
    }

    fn neighbor_source(&self) -> Option<&dyn NeighborSource> {
        Some(&self.neighbors)
    }
}
