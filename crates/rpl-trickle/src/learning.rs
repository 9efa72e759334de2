//! Tabular Q-learning shared by the learning-based suppression policies.

use rpl_core::Settings;

/// Learning rate and discount factor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Learning {
    pub alpha: f64,
    pub beta:  f64,
}

impl Learning {
    pub fn from_settings(settings: &Settings) -> Self {
        Self { alpha: settings.learning_rate, beta: settings.discount_factor }
    }
}

/// Value table over `states x 2` actions, zero-initialised.
#[derive(Clone, Debug, PartialEq)]
pub struct QTable {
    values: Vec<[f64; 2]>,
}

impl QTable {
    pub fn new(states: usize) -> Self {
        Self { values: vec![[0.0; 2]; states.max(1)] }
    }

    pub fn states(&self) -> usize {
        self.values.len()
    }

    #[inline]
    fn row(&self, state: usize) -> &[f64; 2] {
        &self.values[state.min(self.values.len() - 1)]
    }

    pub fn value(&self, state: usize, action: usize) -> f64 {
        self.row(state)[action.min(1)]
    }

    /// Index of the best action; ties go to action 0.
    pub fn best_action(&self, state: usize) -> usize {
        let row = self.row(state);
        if row[1] > row[0] { 1 } else { 0 }
    }

    pub fn max_value(&self, state: usize) -> f64 {
        let row = self.row(state);
        row[0].max(row[1])
    }

    /// Temporal-difference update; returns the new value.
    ///
    /// `new = (1 - α)·old + α·(reward + β·max(next) − old)`
    pub fn update(
        &mut self,
        state:    usize,
        action:   usize,
        reward:   f64,
        next:     usize,
        learning: Learning,
    ) -> f64 {
        let old = self.value(state, action);
        let target = reward + learning.beta * self.max_value(next) - old;
        let new = (1.0 - learning.alpha) * old + learning.alpha * target;
        let last = self.values.len() - 1;
        self.values[state.min(last)][action.min(1)] = new;
        new
    }
}

/// Exploration rate, optionally annealed by reward.
///
/// With a non-zero `step`, every observed reward moves epsilon down by
/// `step` (floored at `min`) if it beat the running average of earlier
/// rewards, otherwise up (capped at `max`).
#[derive(Clone, Debug, PartialEq)]
pub struct Exploration {
    epsilon:      f64,
    step:         f64,
    min:          f64,
    max:          f64,
    total_reward: f64,
    updates:      u64,
}

impl Exploration {
    pub fn fixed(epsilon: f64) -> Self {
        Self::annealed(epsilon, 0.0, epsilon, epsilon)
    }

    pub fn annealed(epsilon: f64, step: f64, min: f64, max: f64) -> Self {
        Self { epsilon, step, min, max, total_reward: 0.0, updates: 0 }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        if settings.epsilon_step > 0.0 {
            Self::annealed(
                settings.epsilon,
                settings.epsilon_step,
                settings.epsilon_min,
                settings.epsilon_max,
            )
        } else {
            Self::fixed(settings.epsilon)
        }
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn average_reward(&self) -> f64 {
        if self.updates == 0 { 0.0 } else { self.total_reward / self.updates as f64 }
    }

    pub fn observe(&mut self, reward: f64) {
        let beat_average = reward > self.average_reward();
        self.total_reward += reward;
        self.updates += 1;
        if self.step > 0.0 {
            self.epsilon = if beat_average {
                (self.epsilon - self.step).max(self.min)
            } else {
                (self.epsilon + self.step).min(self.max)
            };
        }
    }
}
