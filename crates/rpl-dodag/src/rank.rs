//! Rank arithmetic (RFC 6550, RFC 6552, RFC 8180).
//!
//! Ranks are `u32` but never exceed [`INFINITE_RANK`]; every sum is clamped
//! to it.  `None` in a rank position means "no rank".

/// Rank advertised by a node with no usable path to the root.
pub const INFINITE_RANK: u32 = 65_535;

/// Minimum rank difference between a node and any of its parents.  Also the
/// root's rank.
pub const MIN_HOP_RANK_INCREASE: u32 = 256;

/// A better candidate must improve the rank by more than this to replace the
/// current parent.
pub const PARENT_SWITCH_RANK_THRESHOLD: u32 = 640;

/// Links with a higher ETX are not used for parent selection.
pub const UPPER_LIMIT_ACCEPTABLE_ETX: f64 = 3.0;

pub const MIN_STEP_OF_RANK: u32 = 1;
pub const MAX_STEP_OF_RANK: u32 = 7;

/// ETX at or below which the link to the current parent counts as good.
pub const ETX_GOOD_LINK: f64 = 2.0;

/// Rank increase of a good link: `(3 * ETX_GOOD_LINK - 2) * MIN_HOP_RANK_INCREASE`.
pub const PARENT_SWITCH_RANK_INCREASE_THRESHOLD: u32 = 4 * MIN_HOP_RANK_INCREASE;

/// ETX forced onto a link that keeps failing.
pub const INVALID_ETX: f64 = UPPER_LIMIT_ACCEPTABLE_ETX + 1.0;

#[inline]
pub fn is_infinite(rank: u32) -> bool {
    rank >= INFINITE_RANK
}

/// `step = 3 * etx - 2` truncated and clamped to `[1, 7]`; `None` above the
/// acceptable ETX (and for NaN).
pub fn step_of_rank(etx: f64) -> Option<u32> {
    if !(etx <= UPPER_LIMIT_ACCEPTABLE_ETX) {
        return None;
    }
    let step = (3.0 * etx - 2.0).trunc() as i64;
    Some(step.clamp(MIN_STEP_OF_RANK as i64, MAX_STEP_OF_RANK as i64) as u32)
}

/// Rank increase contributed by a link of the given ETX.
#[inline]
pub fn rank_increase(etx: f64) -> Option<u32> {
    step_of_rank(etx).map(|step| step * MIN_HOP_RANK_INCREASE)
}

/// Rank this node would have through a neighbor.
///
/// `None` when either part is unknown or the neighbor advertises infinite
/// rank.  Sums past the sentinel clamp to [`INFINITE_RANK`].
pub fn candidate_rank(advertised: Option<u32>, increase: Option<u32>) -> Option<u32> {
    let (advertised, increase) = (advertised?, increase?);
    if is_infinite(advertised) {
        return None;
    }
    Some(advertised.saturating_add(increase).min(INFINITE_RANK))
}

/// Integer DAG rank (`rank / MinHopRankIncrease`).
#[inline]
pub fn dag_rank(rank: u32) -> u32 {
    rank / MIN_HOP_RANK_INCREASE
}
