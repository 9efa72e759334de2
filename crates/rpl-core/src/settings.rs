//! Read-only simulation settings.
//!
//! Typically loaded from a JSON file by the application and handed to the
//! simulation builder, which copies it into every component that needs it.
//! Missing fields take the defaults below, so a config file only lists what
//! it changes:
//!
//! ```json
//! { "seed": 7, "trickle_variant": "qtrickle", "epsilon": 0.2 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, SlotClock, Tick};

/// Which Trickle strategy bundle every node runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrickleVariant {
    /// RFC 6206 with the fixed-threshold suppression rule.
    #[default]
    Classic,
    /// Q-learning over the interval index.
    QTrickle,
    /// Reinforcement-learning with inconsistency-driven reward.
    Riata,
    /// Adaptive channel/parameter based window and redundancy.
    Acpb,
}

/// How a non-root node solicits DIOs before joining.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisMode {
    Disabled,
    /// Unicast DIS to a known neighbor (the first one heard).
    Unicast,
    /// DIS to the all-RPL-nodes multicast address.
    #[default]
    Broadcast,
}

/// Top-level simulation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master RNG seed.  The same seed always produces identical runs.
    pub seed: u64,

    // ── Slot clock ────────────────────────────────────────────────────────
    /// Duration of one slot (= one tick) in milliseconds.
    pub slot_duration_ms: u32,
    /// Slots per scheduling frame.
    pub slotframe_length: u32,
    /// Run length in slotframes; the run terminates at
    /// `total_slotframes * slotframe_length`.
    pub total_slotframes: u64,

    // ── Trickle ───────────────────────────────────────────────────────────
    /// Imin = 2^exp milliseconds.
    pub dio_interval_min_exp: u32,
    /// Imax = Imin * 2^doublings.
    pub dio_interval_doublings: u32,
    /// Redundancy constant used by fixed-k strategies.
    pub k_default: u32,
    /// Upper bound for adaptive redundancy constants.
    pub k_max: u32,
    pub trickle_variant: TrickleVariant,
    /// Draw the first interval from `[Imin, Imax]` instead of using Imin.
    pub randomize_first_interval: bool,

    // ── Learning-based suppression ────────────────────────────────────────
    pub learning_rate: f64,
    pub discount_factor: f64,
    /// Exploration rate: probability of following the threshold rule instead
    /// of the learned value table.
    pub epsilon: f64,
    pub epsilon_min: f64,
    pub epsilon_max: f64,
    /// Annealing step; `0.0` keeps epsilon fixed.
    pub epsilon_step: f64,

    // ── RPL ───────────────────────────────────────────────────────────────
    pub dis_mode: DisMode,
    pub dis_period_ms: u64,
    /// Mean DAO period; each DAO is jittered by U(0.8, 1.2).
    pub dao_period_ms: u64,
    /// Broadcast DIS needed from the same neighbor before Trickle resets.
    pub dis_reset_threshold: u32,
    /// Flag DIOs sent in answer to a DIS as request responses.
    pub dio_answers_request: bool,

    // ── Objective function ────────────────────────────────────────────────
    /// ETX assumed for a neighbor before any measurement.
    pub etx_default: f64,
    /// Transmissions accumulated before ETX is recomputed.
    pub etx_tx_cutoff: u32,
    /// Unacknowledged transmissions in a row after which ETX is forced
    /// above the acceptable limit.
    pub max_consecutive_failures: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed:                     0,
            slot_duration_ms:         10,
            slotframe_length:         101,
            total_slotframes:         1_000,
            dio_interval_min_exp:     14,
            dio_interval_doublings:   8,
            k_default:                10,
            k_max:                    10,
            trickle_variant:          TrickleVariant::Classic,
            randomize_first_interval: false,
            learning_rate:            0.5,
            discount_factor:          0.9,
            epsilon:                  0.1,
            epsilon_min:              0.01,
            epsilon_max:              0.5,
            epsilon_step:             0.0,
            dis_mode:                 DisMode::Broadcast,
            dis_period_ms:            60_000,
            dao_period_ms:            60_000,
            dis_reset_threshold:      1,
            dio_answers_request:      false,
            etx_default:              3.0,
            etx_tx_cutoff:            100,
            max_consecutive_failures: 10,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON string and validate them.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file and validate them.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> CoreResult<()> {
        if self.slot_duration_ms == 0 || self.slotframe_length == 0 {
            return Err(CoreError::Config(
                "slot_duration_ms and slotframe_length must be positive".into(),
            ));
        }
        if self.dio_interval_min_exp > 32 || self.dio_interval_doublings > 24 {
            return Err(CoreError::Config(format!(
                "trickle interval 2^{} ms with {} doublings is out of range",
                self.dio_interval_min_exp, self.dio_interval_doublings
            )));
        }
        if self.k_max == 0 {
            return Err(CoreError::Config("k_max must be at least 1".into()));
        }
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("discount_factor", self.discount_factor),
            ("epsilon", self.epsilon),
            ("epsilon_min", self.epsilon_min),
            ("epsilon_max", self.epsilon_max),
            ("epsilon_step", self.epsilon_step),
        ] {
            crate::check_probability(name, value)
                .map_err(|_| CoreError::Config(format!("{name} must lie in [0, 1], got {value}")))?;
        }
        if self.epsilon_min > self.epsilon_max {
            return Err(CoreError::Config(format!(
                "epsilon_min {} exceeds epsilon_max {}",
                self.epsilon_min, self.epsilon_max
            )));
        }
        if self.etx_default < 1.0 {
            return Err(CoreError::Config(format!(
                "etx_default must be at least 1, got {}",
                self.etx_default
            )));
        }
        if self.etx_tx_cutoff == 0 {
            return Err(CoreError::Config("etx_tx_cutoff must be positive".into()));
        }
        if self.dis_reset_threshold == 0 {
            return Err(CoreError::Config("dis_reset_threshold must be at least 1".into()));
        }
        Ok(())
    }

    /// Slot clock derived from the slot settings.
    #[inline]
    pub fn slot_clock(&self) -> SlotClock {
        SlotClock::new(self.slot_duration_ms, self.slotframe_length)
    }

    /// Imin in milliseconds.
    #[inline]
    pub fn min_interval_ms(&self) -> u64 {
        1u64 << self.dio_interval_min_exp
    }

    /// The tick at which the run terminates.
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.total_slotframes * self.slotframe_length as u64)
    }
}
