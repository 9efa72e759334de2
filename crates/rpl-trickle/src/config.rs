//! Timer constants of one Trickle instance.

use rpl_core::{Settings, SlotClock};

use crate::{TrickleError, TrickleResult};

/// Interval bounds and redundancy limits.
///
/// `max_interval_ms = min_interval_ms * 2^doublings`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrickleConfig {
    pub min_interval_ms: u64,
    pub doublings:       u32,
    /// Redundancy constant reported before the first interval computes one.
    pub k_default:       u32,
    pub k_max:           u32,
    /// Start at `Imin * 2^j` for a uniformly drawn `j` instead of at Imin.
    pub randomize_start: bool,
    pub slot:            SlotClock,
}

impl TrickleConfig {
    pub fn new(min_interval_ms: u64, doublings: u32, k_max: u32, slot: SlotClock) -> Self {
        Self {
            min_interval_ms,
            doublings,
            k_default: k_max,
            k_max,
            randomize_start: false,
            slot,
        }
    }

    /// Derive from run settings.  Randomized starts only apply to the
    /// classic variant.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_interval_ms: settings.min_interval_ms(),
            doublings:       settings.dio_interval_doublings,
            k_default:       settings.k_default,
            k_max:           settings.k_max,
            randomize_start: settings.randomize_first_interval
                && settings.trickle_variant == rpl_core::TrickleVariant::Classic,
            slot:            settings.slot_clock(),
        }
    }

    #[inline]
    pub fn max_interval_ms(&self) -> u64 {
        self.min_interval_ms << self.doublings
    }

    pub fn validate(&self) -> TrickleResult<()> {
        if self.min_interval_ms == 0 {
            return Err(TrickleError::Config("min_interval_ms must be positive".into()));
        }
        if self.doublings >= 63 || self.max_interval_ms() >> self.doublings != self.min_interval_ms {
            return Err(TrickleError::Config(format!(
                "{} ms doubled {} times overflows",
                self.min_interval_ms, self.doublings
            )));
        }
        if self.k_max == 0 {
            return Err(TrickleError::Config("k_max must be at least 1".into()));
        }
        Ok(())
    }
}
