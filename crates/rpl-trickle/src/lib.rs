//! `rpl-trickle` — the RFC 6206 Trickle timer as one controller with three
//! pluggable strategies.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`controller`]  | `TrickleController`, `TrickleTimer`, `TrickleTimers`, `TrickleEnv` |
//! | [`strategy`]    | `RedundancyStrategy`, `WindowStrategy`, `SuppressionPolicy`, `Strategies`, `ResetRule` |
//! | [`state`]       | `TrickleState`, `Metrics`, `IntervalView`, `IntervalOutcome`, `Window` |
//! | [`config`]      | `TrickleConfig`                                            |
//! | [`learning`]    | `QTable`, `Learning`, `Exploration`                        |
//! | [`classic`]     | RFC 6206 strategies                                        |
//! | [`qtrickle`]    | Q-learning over the interval index                         |
//! | [`riata`]       | Keep/change learning with inconsistency reward             |
//! | [`acpb`]        | Cell-based windows with flagged reset resumption           |
//! | [`error`]       | `TrickleError`, `TrickleResult<T>`                         |
//!
//! # Variants
//!
//! | Variant   | Redundancy `k`                          | Window                               | Decision            |
//! |-----------|-----------------------------------------|--------------------------------------|---------------------|
//! | classic   | `min(n + 1, k_max)`                     | `[I/2, I)`                           | `c < k`             |
//! | qtrickle  | `1 + ceil(min(n, k_max-1) · p_reset)`   | `[I/2·p_tx·p_free, I/2 + p_stable·I/2]` | ε-greedy on `m`  |
//! | riata     | running average, `k_max` first          | `s`-th slice of `I/(m+1+inc)`        | ε-greedy keep/change |
//! | acpb      | `n + 1` or `ceil((n+1)/2)` by phase     | early after suppressions, late after transmissions | `c < k` |

pub mod acpb;
pub mod classic;
pub mod config;
pub mod controller;
pub mod error;
pub mod learning;
pub mod qtrickle;
pub mod riata;
pub mod state;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use classic::{FixedRedundancy, HalfIntervalWindow, NeighborRedundancy, ThresholdPolicy};
pub use config::TrickleConfig;
pub use controller::{TimerOutcome, TrickleController, TrickleEnv, TrickleTimer, TrickleTimers};
pub use error::{TrickleError, TrickleResult};
pub use learning::{Exploration, Learning, QTable};
pub use state::{IntervalOutcome, IntervalView, Metrics, RunState, TrickleState, Window};
pub use strategy::{
    Decision, RedundancyStrategy, ResetRule, Strategies, SuppressionPolicy, WindowStrategy,
};
