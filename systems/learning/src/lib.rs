#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tabular Q-learning engine.
//!
//! The [`QTable`] maps [`EncodedState`] keys to one value per [`Action`]. Rows
//! are created lazily: [`QTable::update`] materializes every row it touches,
//! while [`QTable::explore_or_exploit`] and [`QTable::greedy`] only read, so
//! evaluation never grows the table.

mod artifact;
mod random;

use std::collections::HashMap;

use tile_quest_core::{Action, ActionValues, EncodedState, RandomSource, ACTION_COUNT};
use tracing::trace;

pub use artifact::TableError;
pub use random::SeededRandom;

const ZERO_ROW: [f64; ACTION_COUNT] = [0.0; ACTION_COUNT];

/// Learning rate used when none is provided.
pub const DEFAULT_ALPHA: f64 = 0.1;
/// Discount factor used when none is provided.
pub const DEFAULT_GAMMA: f64 = 0.95;
/// Exploration rate used when none is provided.
pub const DEFAULT_EPSILON: f64 = 1.0;

/// Hyperparameters stored alongside the learned values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hyperparameters {
    /// Number of actions per row.
    pub n_actions: usize,
    /// Learning rate applied by every update.
    pub alpha: f64,
    /// Discount factor applied to the bootstrapped successor value.
    pub gamma: f64,
    /// Default exploration rate.
    pub epsilon: f64,
}

/// Lazily grown table of action values.
#[derive(Clone, Debug)]
pub struct QTable {
    rows: HashMap<EncodedState, [f64; ACTION_COUNT]>,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
}

impl Default for QTable {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA, DEFAULT_GAMMA, DEFAULT_EPSILON)
    }
}

impl QTable {
    /// Creates an empty table with fixed learning and discount rates.
    #[must_use]
    pub fn new(alpha: f64, gamma: f64, epsilon: f64) -> Self {
        Self {
            rows: HashMap::new(),
            alpha,
            gamma,
            epsilon,
        }
    }

    /// Learning rate fixed at construction.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Discount factor fixed at construction.
    #[must_use]
    pub const fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Default exploration rate carried with the table.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Replaces the default exploration rate.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Snapshot of every hyperparameter.
    #[must_use]
    pub const fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            n_actions: ACTION_COUNT,
            alpha: self.alpha,
            gamma: self.gamma,
            epsilon: self.epsilon,
        }
    }

    /// Number of materialized rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Reports whether no row has been materialized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Action values recorded for the state, without materializing it.
    #[must_use]
    pub fn values(&self, state: &EncodedState) -> Option<&[f64; ACTION_COUNT]> {
        self.rows.get(state)
    }

    /// Epsilon-greedy action selection.
    ///
    /// A uniform draw below `epsilon` explores with a random action. Otherwise
    /// the first maximal action of the state's row is returned; unknown states
    /// and rows whose values are all equal fall back to a random action so that
    /// untried states are not biased toward a fixed move. Never creates rows.
    pub fn explore_or_exploit<R>(&self, state: &EncodedState, epsilon: f64, rng: &mut R) -> Action
    where
        R: RandomSource + ?Sized,
    {
        if rng.next_unit() < epsilon {
            return rng.next_action();
        }

        match self.rows.get(state).and_then(best_action) {
            Some(action) => action,
            None => rng.next_action(),
        }
    }

    /// Greedy action selection used during evaluation.
    ///
    /// Returns the rounded action values alongside the choice when a genuine
    /// best action exists, and `None` when the choice was random because the
    /// state is unknown or its values are tied. Never creates rows.
    pub fn greedy<R>(&self, state: &EncodedState, rng: &mut R) -> (Action, Option<ActionValues>)
    where
        R: RandomSource + ?Sized,
    {
        let Some(row) = self.rows.get(state) else {
            trace!("greedy lookup missed; choosing at random");
            return (rng.next_action(), None);
        };

        match best_action(row) {
            Some(action) => (action, Some(ActionValues::rounded(row))),
            None => {
                trace!("greedy lookup tied; choosing at random");
                (rng.next_action(), None)
            }
        }
    }

    /// Temporal-difference update.
    ///
    /// `state` is materialized before `next_state`, both zero-initialized, and
    /// then `Q[s][a] += alpha * (reward + gamma * Q[s'][a'] - Q[s][a])`. When
    /// both rows were new this reduces to `Q[s][a] += alpha * reward`.
    pub fn update(
        &mut self,
        state: &EncodedState,
        action: Action,
        reward: f64,
        next_state: &EncodedState,
        next_action: Action,
    ) {
        self.materialize(state);
        self.materialize(next_state);

        let successor = self
            .rows
            .get(next_state)
            .map_or(0.0, |row| row[next_action.index()]);
        let (alpha, gamma) = (self.alpha, self.gamma);

        if let Some(row) = self.rows.get_mut(state) {
            let current = row[action.index()];
            row[action.index()] = current + alpha * (reward + gamma * successor - current);
        }
    }

    fn materialize(&mut self, state: &EncodedState) {
        if self.rows.contains_key(state) {
            return;
        }
        trace!(size = self.rows.len() + 1, "materializing table row");
        let _ = self.rows.insert(state.clone(), ZERO_ROW);
    }
}

/// First maximal action of a row, or `None` when every value is equal.
fn best_action(row: &[f64; ACTION_COUNT]) -> Option<Action> {
    let first = row[0];
    if row.iter().all(|value| *value == first) {
        return None;
    }

    let mut best = 0;
    for (index, value) in row.iter().enumerate().skip(1) {
        if *value > row[best] {
            best = index;
        }
    }
    Action::from_index(best)
}
