#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Episode driver that trains a Q-table over a campaign of levels.
//!
//! Every episode starts at level 1 and runs until the agent falls off the
//! floor, clears the final level or exhausts its step budget. Rewards follow
//! a fixed schedule with an extra penalty for returning to a tile already
//! visited during the current level attempt.

mod config;

use tile_quest_core::{EncodedState, EpisodeSummary, LevelStatus, RandomSource, TilePosition};
use tile_quest_system_learning::QTable;
use tile_quest_world::{encoding, Campaign, Level};
use tracing::{debug, info};

pub use config::{ConfigError, EpsilonSchedule, TrainingConfig};

/// Reward for reaching the goal of a level.
pub const GOAL_REWARD: f64 = 100.0;
/// Reward for claiming a checkpoint.
pub const CHECKPOINT_REWARD: f64 = 100.0;
/// Reward for stepping off the floor.
pub const FAILURE_REWARD: f64 = -30.0;
/// Reward for any other move.
pub const STEP_REWARD: f64 = -1.0;
/// Extra penalty for revisiting a tile in a level without a checkpoint.
pub const REVISIT_PENALTY: f64 = 10.0;
/// Extra penalty for revisiting a tile in a level with a checkpoint.
pub const CHECKPOINT_REVISIT_PENALTY: f64 = 3.0;

/// Reward granted for a move.
///
/// The revisit penalty stacks with the base reward of the classification.
#[must_use]
pub fn reward(status: LevelStatus, revisited: bool, has_checkpoint: bool) -> f64 {
    let base = match status {
        LevelStatus::GoalReached => GOAL_REWARD,
        LevelStatus::Failed => FAILURE_REWARD,
        LevelStatus::CheckpointReached => CHECKPOINT_REWARD,
        LevelStatus::InProgress => STEP_REWARD,
    };

    match (revisited, has_checkpoint) {
        (false, _) => base,
        (true, false) => base - REVISIT_PENALTY,
        (true, true) => base - CHECKPOINT_REVISIT_PENALTY,
    }
}

/// Drives training episodes over a campaign.
#[derive(Debug)]
pub struct Trainer<'campaign> {
    campaign: &'campaign Campaign,
    config: TrainingConfig,
}

impl<'campaign> Trainer<'campaign> {
    /// Creates a trainer for the provided campaign.
    #[must_use]
    pub fn new(campaign: &'campaign Campaign, config: TrainingConfig) -> Self {
        Self { campaign, config }
    }

    /// Configuration of the run.
    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Runs every configured episode, pushing one summary per episode into `out`.
    ///
    /// The table is owned exclusively for the whole run; summaries are
    /// advisory and never feed back into learning.
    pub fn train<R>(&self, table: &mut QTable, rng: &mut R, out: &mut Vec<EpisodeSummary>)
    where
        R: RandomSource + ?Sized,
    {
        let episodes = self.config.episodes;
        let report_every = (episodes / 10).max(1);
        out.reserve(episodes as usize);

        for episode in 0..episodes {
            let epsilon = self.config.epsilon.value_for(episode);
            table.set_epsilon(epsilon);
            let summary = self.run_episode(episode, epsilon, table, rng);

            debug!(
                episode,
                level = summary.level_reached,
                steps = summary.steps_taken,
                reward = summary.total_reward,
                table_size = summary.table_size,
                "episode finished"
            );
            if (episode + 1) % report_every == 0 {
                info!(
                    episode = episode + 1,
                    episodes,
                    epsilon,
                    level = summary.level_reached,
                    reward = summary.total_reward,
                    table_size = summary.table_size,
                    "training progress"
                );
            }

            out.push(summary);
        }
    }

    /// Runs a single episode with a fixed exploration rate.
    pub fn run_episode<R>(
        &self,
        episode: u32,
        epsilon: f64,
        table: &mut QTable,
        rng: &mut R,
    ) -> EpisodeSummary
    where
        R: RandomSource + ?Sized,
    {
        let mut attempt = Attempt::default();
        let mut level = self.campaign.first();

        let mut state = encoding::encode(&level);
        let mut action = table.explore_or_exploit(&state, epsilon, rng);
        let mut advance = false;

        for _ in 0..self.config.max_steps {
            if advance {
                advance = false;
                attempt.traveled.clear();
                match self.campaign.start(level.level_index() + 1) {
                    Some(next) => {
                        debug!(level = next.level_index(), "advancing to next level");
                        level = next;
                    }
                    None => {
                        attempt.completed = true;
                        break;
                    }
                }
            } else {
                level.apply_action(action);
            }

            let (next_state, status, reward) = attempt.observe(&mut level);
            let next_action = table.explore_or_exploit(&next_state, epsilon, rng);
            table.update(&state, action, reward, &next_state, next_action);

            state = next_state;
            action = next_action;

            match status {
                LevelStatus::Failed => break,
                LevelStatus::GoalReached => advance = true,
                LevelStatus::InProgress | LevelStatus::CheckpointReached => {}
            }
        }

        attempt.summary(episode, level.level_index(), level.step_count(), table)
    }
}

/// Bookkeeping of a single episode.
#[derive(Debug, Default)]
struct Attempt {
    traveled: Vec<TilePosition>,
    total_reward: f64,
    completed: bool,
}

impl Attempt {
    /// Encodes, classifies and rewards the level after a move.
    fn observe(&mut self, level: &mut Level) -> (EncodedState, LevelStatus, f64) {
        let next_state = encoding::encode(level);
        let status = level.classify();
        let tile = level.player_tile();
        let revisited = self.traveled.contains(&tile);
        let reward = reward(status, revisited, level.has_checkpoint());

        self.total_reward += reward;
        self.traveled.push(tile);
        (next_state, status, reward)
    }

    fn summary(
        &self,
        episode: u32,
        level_reached: u32,
        steps_taken: u32,
        table: &QTable,
    ) -> EpisodeSummary {
        EpisodeSummary {
            episode,
            level_reached,
            campaign_completed: self.completed,
            steps_taken,
            total_reward: self.total_reward,
            table_size: table.len(),
        }
    }
}
