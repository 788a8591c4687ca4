#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tile Quest engine.
//!
//! This crate defines the vocabulary that connects the level world, the
//! learning systems and adapters. The world produces [`EncodedState`] keys and
//! [`LevelStatus`] classifications, the learning system maps encoded states to
//! [`Action`] values, and the training and evaluation drivers report their
//! progress through [`EpisodeSummary`] and [`TickReport`] values. Randomness is
//! injected through [`RandomSource`] so every consumer can be driven by a
//! scripted sequence under test.

use serde::{Deserialize, Serialize};

/// Number of discrete actions available to the agent.
pub const ACTION_COUNT: usize = 4;

/// Unit moves the agent may take on the level grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Movement toward increasing x.
    PositiveX,
    /// Movement toward decreasing x.
    NegativeX,
    /// Movement toward increasing y.
    PositiveY,
    /// Movement toward decreasing y.
    NegativeY,
}

impl Action {
    /// Every action in table index order.
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::PositiveX,
        Action::NegativeX,
        Action::PositiveY,
        Action::NegativeY,
    ];

    /// Index of the action inside an action-value row.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::PositiveX => 0,
            Self::NegativeX => 1,
            Self::PositiveY => 2,
            Self::NegativeY => 3,
        }
    }

    /// Resolves an action-value row index back into an action.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::PositiveX),
            1 => Some(Self::NegativeX),
            2 => Some(Self::PositiveY),
            3 => Some(Self::NegativeY),
            _ => None,
        }
    }

    /// Unit displacement applied to the player along the x and y axes.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::PositiveX => (1, 0),
            Self::NegativeX => (-1, 0),
            Self::PositiveY => (0, 1),
            Self::NegativeY => (0, -1),
        }
    }

    /// Display variant the player sprite adopts while performing the action.
    #[must_use]
    pub const fn player_variant(self) -> &'static str {
        match self {
            Self::PositiveX => "robot-1",
            Self::NegativeX => "robot-4",
            Self::PositiveY => "robot-2",
            Self::NegativeY => "robot-3",
        }
    }
}

/// Display variant applied to a checkpoint once it has been claimed.
pub const CLAIMED_CHECKPOINT_VARIANT: &str = "checkpoint-2";

/// Rounds a continuous coordinate onto the tile grid.
///
/// Ties are resolved toward the even neighbour, so `0.5` maps to `0` and `1.5`
/// maps to `2`. Every floor, goal and checkpoint test as well as the state
/// encoder goes through this function.
#[must_use]
pub fn round_to_tile(coordinate: f32) -> i32 {
    coordinate.round_ties_even() as i32
}

/// Integer location of a tile within a level's three-dimensional grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    x: i32,
    y: i32,
    z: i32,
}

impl TilePosition {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Rounds each component of a continuous position onto the grid.
    #[must_use]
    pub fn rounded(x: f32, y: f32, z: f32) -> Self {
        Self::new(round_to_tile(x), round_to_tile(y), round_to_tile(z))
    }

    /// Column of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Layer of the tile.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Tile on the ground layer directly beneath this position.
    #[must_use]
    pub const fn ground(&self) -> Self {
        Self::new(self.x, self.y, 0)
    }
}

/// Discrete key derived from a level snapshot and used to index the Q-table.
///
/// Two snapshots with identical rounded object positions, step counts and level
/// numbers always produce equal keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedState {
    positions: Vec<TilePosition>,
    step_count: u32,
    level_index: u32,
}

impl EncodedState {
    /// Creates a key from object positions listed in the encoder's stable order.
    #[must_use]
    pub fn new(positions: Vec<TilePosition>, step_count: u32, level_index: u32) -> Self {
        Self {
            positions,
            step_count,
            level_index,
        }
    }

    /// Rounded object positions in the encoder's stable order.
    #[must_use]
    pub fn positions(&self) -> &[TilePosition] {
        &self.positions
    }

    /// Number of moves simulated in the level when the key was captured.
    #[must_use]
    pub const fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Level number the key was captured in.
    #[must_use]
    pub const fn level_index(&self) -> u32 {
        self.level_index
    }
}

/// Outcome classification of a level after the player moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelStatus {
    /// The player stands somewhere safe and the level continues.
    InProgress,
    /// The player reached the goal with every precondition satisfied.
    GoalReached,
    /// The player claimed the level's checkpoint on this move.
    CheckpointReached,
    /// The player stepped off the floor.
    Failed,
}

/// Action-value row rounded for display, reported alongside greedy decisions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionValues([f64; ACTION_COUNT]);

impl ActionValues {
    /// Rounds the provided row to two decimal places.
    #[must_use]
    pub fn rounded(values: &[f64; ACTION_COUNT]) -> Self {
        Self(values.map(|value| (value * 100.0).round() / 100.0))
    }

    /// Rounded values indexed by [`Action::index`].
    #[must_use]
    pub const fn values(&self) -> &[f64; ACTION_COUNT] {
        &self.0
    }

    /// Rounded value recorded for the provided action.
    #[must_use]
    pub const fn get(&self, action: Action) -> f64 {
        self.0[action.index()]
    }
}

/// Source of uniform random draws consumed by the learning policies.
pub trait RandomSource {
    /// Draws a value uniformly from `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Draws an index uniformly from `[0, upper)`.
    fn next_index(&mut self, upper: usize) -> usize;

    /// Draws an action uniformly from [`Action::ALL`].
    fn next_action(&mut self) -> Action {
        let index = self.next_index(ACTION_COUNT) % ACTION_COUNT;
        Action::ALL[index]
    }
}

/// Signal from the presentation layer describing whether simulation may advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SimulationGate {
    /// No transition animation owns the visual state.
    #[default]
    Open,
    /// A transition animation is playing and stepping must wait.
    TransitionActive,
}

/// Result of a single evaluation tick, consumed by the presentation layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// The current level was completed on this tick.
    pub level_completed: bool,
    /// No further decisions will be made.
    pub game_over: bool,
    /// Action chosen on this tick, if any.
    pub action: Option<Action>,
    /// Action values backing the choice when a genuine best action existed.
    pub diagnostic: Option<ActionValues>,
}

/// Advisory diagnostics emitted after each training episode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeSummary {
    /// Zero-based episode number.
    pub episode: u32,
    /// Level number the episode ended in.
    pub level_reached: u32,
    /// The agent cleared the final level of the campaign.
    pub campaign_completed: bool,
    /// Steps recorded by the final level of the episode.
    pub steps_taken: u32,
    /// Sum of every reward granted during the episode.
    pub total_reward: f64,
    /// Number of rows held by the Q-table after the episode.
    pub table_size: usize,
}
