#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for Tile Quest.
//!
//! A [`Level`] owns the mutable half of a level attempt: object positions,
//! display variants, the step counter and the checkpoint flag. The immutable
//! half (tile grid, occupied-tile set and goal) lives in a shared
//! [`LevelGeometry`] so that restarting a level never rebuilds it.

mod campaign;
pub mod encoding;

use std::{
    collections::{BTreeMap, HashSet},
    ops::Bound,
    sync::Arc,
};

use glam::Vec3;
use thiserror::Error;
use tile_quest_core::{Action, LevelStatus, TilePosition};

pub use campaign::{Campaign, LevelAsset, ObjectAsset};

/// Reserved object name of the agent.
pub const PLAYER: &str = "player";
/// Reserved object name of the optional checkpoint.
pub const CHECKPOINT: &str = "checkpoint";
/// Tile code marking the goal tile.
pub const GOAL_TILE: u8 = 2;

/// Failures raised while reading or validating level data.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The level does not define a `player` object.
    #[error("level {level} does not define a `player` object")]
    MissingPlayer {
        /// Level number that failed validation.
        level: u32,
    },
    /// The level does not contain a goal tile.
    #[error("level {level} does not contain a goal tile")]
    MissingGoal {
        /// Level number that failed validation.
        level: u32,
    },
    /// The campaign file did not list any levels.
    #[error("campaign does not contain any levels")]
    EmptyCampaign,
    /// The level file could not be read.
    #[error("failed to read level file {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The level file is not valid TOML or does not match the level schema.
    #[error("failed to parse level data: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Immutable tile geometry of a level, shared between attempts.
#[derive(Debug)]
pub struct LevelGeometry {
    tiles: Vec<Vec<Vec<u8>>>,
    tile_set: HashSet<TilePosition>,
    goal: TilePosition,
}

impl LevelGeometry {
    /// Builds the geometry from a `[z][y][x]` grid of tile codes.
    ///
    /// Every non-zero code occupies its coordinate. When several goal tiles
    /// are present the last one in scan order is used.
    pub fn from_tiles(tiles: Vec<Vec<Vec<u8>>>, level: u32) -> Result<Self, LevelError> {
        let mut tile_set = HashSet::new();
        let mut goal = None;

        for (z, layer) in tiles.iter().enumerate() {
            for (y, row) in layer.iter().enumerate() {
                for (x, &tile) in row.iter().enumerate() {
                    if tile == 0 {
                        continue;
                    }
                    let position = TilePosition::new(x as i32, y as i32, z as i32);
                    if tile == GOAL_TILE {
                        goal = Some(position);
                    }
                    let _ = tile_set.insert(position);
                }
            }
        }

        let goal = goal.ok_or(LevelError::MissingGoal { level })?;
        Ok(Self {
            tiles,
            tile_set,
            goal,
        })
    }

    /// Raw tile codes indexed `[z][y][x]`.
    #[must_use]
    pub fn tiles(&self) -> &[Vec<Vec<u8>>] {
        &self.tiles
    }

    /// Reports whether the provided coordinate holds a tile.
    #[must_use]
    pub fn is_occupied(&self, position: TilePosition) -> bool {
        self.tile_set.contains(&position)
    }

    /// Number of occupied coordinates.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.tile_set.len()
    }

    /// Coordinate of the goal tile.
    #[must_use]
    pub const fn goal(&self) -> TilePosition {
        self.goal
    }
}

/// Movable object placed in a level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelObject {
    position: Vec3,
    display_variant: String,
}

impl LevelObject {
    /// Creates an object at the provided position with the given display variant.
    #[must_use]
    pub fn new(position: Vec3, display_variant: impl Into<String>) -> Self {
        Self {
            position,
            display_variant: display_variant.into(),
        }
    }

    /// Continuous position of the object.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Position rounded onto the tile grid.
    #[must_use]
    pub fn tile(&self) -> TilePosition {
        TilePosition::rounded(self.position.x, self.position.y, self.position.z)
    }

    /// Identifier of the sprite variant the presentation layer should draw.
    #[must_use]
    pub fn display_variant(&self) -> &str {
        &self.display_variant
    }
}

/// Mutable state of a single level attempt.
#[derive(Clone, Debug)]
pub struct Level {
    geometry: Arc<LevelGeometry>,
    player: LevelObject,
    objects: BTreeMap<String, LevelObject>,
    has_checkpoint: bool,
    checkpoint_claimed: bool,
    step_count: u32,
    level_index: u32,
}

impl Level {
    /// Creates a level attempt from its geometry and named objects.
    ///
    /// Fails when no object is named [`PLAYER`].
    pub fn new(
        geometry: Arc<LevelGeometry>,
        objects: impl IntoIterator<Item = (String, LevelObject)>,
        level_index: u32,
    ) -> Result<Self, LevelError> {
        let mut objects: BTreeMap<String, LevelObject> = objects.into_iter().collect();
        let player = objects
            .remove(PLAYER)
            .ok_or(LevelError::MissingPlayer { level: level_index })?;
        let has_checkpoint = objects.contains_key(CHECKPOINT);

        Ok(Self {
            geometry,
            player,
            objects,
            has_checkpoint,
            checkpoint_claimed: false,
            step_count: 0,
            level_index,
        })
    }

    /// Shared geometry of the level.
    #[must_use]
    pub fn geometry(&self) -> &LevelGeometry {
        &self.geometry
    }

    /// The agent controlled by the learning systems.
    #[must_use]
    pub const fn player(&self) -> &LevelObject {
        &self.player
    }

    /// Player position rounded onto the tile grid.
    #[must_use]
    pub fn player_tile(&self) -> TilePosition {
        self.player.tile()
    }

    /// The checkpoint object, if the level defines one.
    #[must_use]
    pub fn checkpoint(&self) -> Option<&LevelObject> {
        self.objects.get(CHECKPOINT)
    }

    /// Looks up any object, including the player, by name.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&LevelObject> {
        if name == PLAYER {
            Some(&self.player)
        } else {
            self.objects.get(name)
        }
    }

    /// Iterates every object, including the player, in ascending name order.
    pub fn objects(&self) -> impl Iterator<Item = (&str, &LevelObject)> {
        let before = self
            .objects
            .range::<str, _>((Bound::Unbounded, Bound::Excluded(PLAYER)));
        let after = self
            .objects
            .range::<str, _>((Bound::Excluded(PLAYER), Bound::Unbounded));

        before
            .map(|(name, object)| (name.as_str(), object))
            .chain(std::iter::once((PLAYER, &self.player)))
            .chain(after.map(|(name, object)| (name.as_str(), object)))
    }

    /// Reports whether the level defines a checkpoint.
    #[must_use]
    pub const fn has_checkpoint(&self) -> bool {
        self.has_checkpoint
    }

    /// Reports whether the checkpoint has been claimed during this attempt.
    #[must_use]
    pub const fn checkpoint_claimed(&self) -> bool {
        self.checkpoint_claimed
    }

    /// Number of moves simulated during this attempt.
    #[must_use]
    pub const fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Level number of this attempt within its campaign.
    #[must_use]
    pub const fn level_index(&self) -> u32 {
        self.level_index
    }

    /// Moves the player one whole tile and counts the step.
    pub fn apply_action(&mut self, action: Action) {
        let (dx, dy) = action.delta();
        self.player.position += Vec3::new(dx as f32, dy as f32, 0.0);
        self.count_step();
    }

    /// Counts a step without moving the player.
    ///
    /// Evaluation counts the step when the decision is made and moves the
    /// player over the following frames.
    pub fn count_step(&mut self) {
        self.step_count = self.step_count.saturating_add(1);
    }

    /// Places the player at an exact position without counting a step.
    pub fn place_player(&mut self, position: Vec3) {
        self.player.position = position;
    }

    /// Changes the sprite variant drawn for the player.
    pub fn set_player_variant(&mut self, variant: &str) {
        variant.clone_into(&mut self.player.display_variant);
    }

    /// Changes the sprite variant drawn for the checkpoint, if one exists.
    pub fn set_checkpoint_variant(&mut self, variant: &str) {
        if let Some(checkpoint) = self.objects.get_mut(CHECKPOINT) {
            variant.clone_into(&mut checkpoint.display_variant);
        }
    }

    /// Classifies the player's current position.
    ///
    /// Standing on floor is checked before the checkpoint: any floor tile other
    /// than the goal is safe, and the goal only counts once the checkpoint (if
    /// any) has been claimed. Off the floor, the checkpoint tile is the only
    /// safe spot; claiming it is reported once and never again for this
    /// attempt.
    pub fn classify(&mut self) -> LevelStatus {
        let ground = self.player_tile().ground();

        if self.geometry.is_occupied(ground) {
            if ground != self.geometry.goal() {
                return LevelStatus::InProgress;
            }
            if self.has_checkpoint && !self.checkpoint_claimed {
                return LevelStatus::InProgress;
            }
            return LevelStatus::GoalReached;
        }

        let Some(checkpoint) = self.checkpoint().map(LevelObject::tile) else {
            return LevelStatus::Failed;
        };

        if ground != checkpoint {
            return LevelStatus::Failed;
        }
        if self.checkpoint_claimed {
            return LevelStatus::InProgress;
        }
        self.checkpoint_claimed = true;
        LevelStatus::CheckpointReached
    }
}
