//! The three seams of the controller and the bundle that fills them.
//!
//! Every variant is one combination of a [`RedundancyStrategy`] (what `k` is
//! this interval), a [`WindowStrategy`] (where the transmission instant may
//! fall) and a [`SuppressionPolicy`] (transmit or stay quiet at that
//! instant), plus a [`ResetRule`].  Hooks have default no-op implementations
//! so each strategy only overrides what it keeps state for.

use rpl_core::{NodeRng, ResetCause, Settings, TrickleVariant};

use crate::acpb::{CellWindow, PhaseRedundancy};
use crate::classic::{HalfIntervalWindow, NeighborRedundancy, ThresholdPolicy};
use crate::learning::{Exploration, Learning};
use crate::qtrickle::{QTricklePolicy, QTrickleWindow, ResetScaledRedundancy};
use crate::riata::{AveragedRedundancy, RiataPolicy, SlicedWindow};
use crate::{IntervalOutcome, IntervalView, Window};

/// Outcome of the suppression decision at the transmission instant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Transmit,
    Suppress,
}

impl Decision {
    /// The RFC 6206 rule: transmit iff `c < k`.
    #[inline]
    pub fn threshold(counter: u32, redundancy: u32) -> Decision {
        if counter < redundancy { Decision::Transmit } else { Decision::Suppress }
    }
}

/// How `reset` picks the interval to restart from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ResetRule {
    /// Back to Imin; no-op when already at Imin.
    #[default]
    ToMinimum,
    /// A DIS-triggered reset above Imin remembers the interval index; the
    /// next reset for any other cause resumes at `Imin * 2^index`.
    ResumeFlagged,
}

pub trait RedundancyStrategy: Send {
    /// Redundancy constant for the interval being begun.
    fn redundancy(&mut self, view: &IntervalView) -> u32;

    fn on_reset(&mut self, _cause: ResetCause) {}
}

pub trait WindowStrategy: Send {
    /// Window for the interval being begun.  Windows that do not fit inside
    /// the interval are replaced with `[I/2, I]` by the controller.
    fn window(&mut self, view: &IntervalView) -> Window;

    fn on_decision(&mut self, _decision: Decision) {}

    fn on_reset(&mut self, _cause: ResetCause) {}
}

pub trait SuppressionPolicy: Send {
    fn decide(&mut self, view: &IntervalView, rng: &mut NodeRng) -> Decision;

    /// Called when an interval runs to completion (not when cut by a reset).
    fn on_interval_end(&mut self, _outcome: &IntervalOutcome) {}

    /// Current exploration rate, for statistics.
    fn epsilon(&self) -> f64 {
        0.0
    }

    /// Running average of the rewards observed so far, for statistics.
    fn average_reward(&self) -> f64 {
        0.0
    }
}

/// A full strategy set for one controller.
pub struct Strategies {
    pub redundancy: Box<dyn RedundancyStrategy>,
    pub window:     Box<dyn WindowStrategy>,
    pub policy:     Box<dyn SuppressionPolicy>,
    pub reset_rule: ResetRule,
}

impl Strategies {
    /// RFC 6206 with `k = min(neighbors + 1, k_max)`.
    pub fn classic(k_max: u32) -> Self {
        Self {
            redundancy: Box::new(NeighborRedundancy { k_max }),
            window:     Box::new(HalfIntervalWindow),
            policy:     Box::new(ThresholdPolicy),
            reset_rule: ResetRule::ToMinimum,
        }
    }

    pub fn qtrickle(k_max: u32, doublings: u32, learning: Learning, exploration: Exploration) -> Self {
        Self {
            redundancy: Box::new(ResetScaledRedundancy { k_max }),
            window:     Box::new(QTrickleWindow),
            policy:     Box::new(QTricklePolicy::new(doublings, learning, exploration)),
            reset_rule: ResetRule::ToMinimum,
        }
    }

    pub fn riata(k_max: u32, learning: Learning, exploration: Exploration) -> Self {
        Self {
            redundancy: Box::new(AveragedRedundancy::new(k_max)),
            window:     Box::new(SlicedWindow),
            policy:     Box::new(RiataPolicy::new(learning, exploration)),
            reset_rule: ResetRule::ToMinimum,
        }
    }

    pub fn acpb(k_max: u32) -> Self {
        Self {
            redundancy: Box::new(PhaseRedundancy { k_max }),
            window:     Box::new(CellWindow::default()),
            policy:     Box::new(ThresholdPolicy),
            reset_rule: ResetRule::ResumeFlagged,
        }
    }

    /// The bundle selected by `settings.trickle_variant`.
    pub fn for_settings(settings: &Settings) -> Self {
        let learning = Learning::from_settings(settings);
        let exploration = Exploration::from_settings(settings);
        match settings.trickle_variant {
            TrickleVariant::Classic => Self::classic(settings.k_max),
            TrickleVariant::QTrickle => {
                Self::qtrickle(settings.k_max, settings.dio_interval_doublings, learning, exploration)
            }
            TrickleVariant::Riata => Self::riata(settings.k_max, learning, exploration),
            TrickleVariant::Acpb => Self::acpb(settings.k_max),
        }
    }
}
