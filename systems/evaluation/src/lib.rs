#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Step driver that replays a trained Q-table one decision per tick.
//!
//! Each tick classifies the level, picks the greedy action for the current
//! state and starts a smooth move toward the neighbouring tile. The move is
//! spread over the frames between two ticks by [`Evaluator::advance_frame`].
//! Ticks are ignored while the presentation layer reports an active
//! transition.

use glam::Vec3;
use tile_quest_core::{
    Action, LevelStatus, RandomSource, SimulationGate, TickReport, CLAIMED_CHECKPOINT_VARIANT,
};
use tile_quest_system_learning::QTable;
use tile_quest_world::{encoding, Campaign, Level};
use tracing::{debug, info};

/// Default number of frames rendered between two decisions.
pub const DEFAULT_FRAMES_PER_TICK: u32 = 10;

/// Greedy replay of a campaign driven by the presentation layer's clock.
#[derive(Debug)]
pub struct Evaluator<'campaign> {
    campaign: &'campaign Campaign,
    level: Level,
    frames_per_tick: u32,
    motion: Option<Motion>,
    level_complete: bool,
    game_over: bool,
}

impl<'campaign> Evaluator<'campaign> {
    /// Starts a replay at level 1 of the campaign.
    ///
    /// A `frames_per_tick` of zero is treated as one.
    #[must_use]
    pub fn new(campaign: &'campaign Campaign, frames_per_tick: u32) -> Self {
        Self {
            campaign,
            level: campaign.first(),
            frames_per_tick: frames_per_tick.max(1),
            motion: None,
            level_complete: false,
            game_over: false,
        }
    }

    /// Level currently being replayed.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Frames rendered between two decisions.
    #[must_use]
    pub const fn frames_per_tick(&self) -> u32 {
        self.frames_per_tick
    }

    /// Action of the move currently in flight, if any.
    #[must_use]
    pub fn current_action(&self) -> Option<Action> {
        self.motion.as_ref().map(|motion| motion.action)
    }

    /// Reports whether a level was completed and not yet acknowledged.
    #[must_use]
    pub const fn level_complete(&self) -> bool {
        self.level_complete
    }

    /// Reports whether the replay has ended.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Clears the completion flag once the presentation layer started its
    /// exit transition.
    pub fn acknowledge_level_complete(&mut self) {
        self.level_complete = false;
    }

    /// Makes at most one decision.
    ///
    /// A move still in flight is settled on its target tile before the level
    /// is classified, so every decision starts from a whole tile.
    pub fn tick<R>(&mut self, gate: SimulationGate, table: &QTable, rng: &mut R) -> TickReport
    where
        R: RandomSource + ?Sized,
    {
        if self.game_over || gate == SimulationGate::TransitionActive {
            return TickReport {
                game_over: self.game_over,
                ..TickReport::default()
            };
        }

        self.settle();

        match self.level.classify() {
            LevelStatus::GoalReached => self.complete_level(),
            LevelStatus::Failed => {
                info!(
                    level = self.level.level_index(),
                    steps = self.level.step_count(),
                    "agent fell off the floor"
                );
                self.game_over = true;
                TickReport {
                    game_over: true,
                    ..TickReport::default()
                }
            }
            LevelStatus::InProgress | LevelStatus::CheckpointReached => self.decide(table, rng),
        }
    }

    /// Advances the move in flight by one frame.
    ///
    /// The final frame of a move places the player exactly on the target tile.
    pub fn advance_frame(&mut self) {
        let Some(motion) = self.motion.as_mut() else {
            return;
        };

        motion.frames_elapsed += 1;
        if motion.frames_elapsed >= self.frames_per_tick {
            let target = motion.target();
            self.motion = None;
            self.level.place_player(target);
        } else {
            let fraction = motion.frames_elapsed as f32 / self.frames_per_tick as f32;
            let position = motion.origin + motion.offset() * fraction;
            self.level.place_player(position);
        }
    }

    fn settle(&mut self) {
        if let Some(motion) = self.motion.take() {
            self.level.place_player(motion.target());
        }
    }

    fn complete_level(&mut self) -> TickReport {
        let finished = self.level.level_index();
        info!(
            level = finished,
            steps = self.level.step_count(),
            "level completed"
        );
        self.level_complete = true;

        match self.campaign.start(finished + 1) {
            Some(next) => self.level = next,
            None => {
                info!(levels = self.campaign.len(), "campaign completed");
                self.game_over = true;
            }
        }

        TickReport {
            level_completed: true,
            game_over: self.game_over,
            ..TickReport::default()
        }
    }

    fn decide<R>(&mut self, table: &QTable, rng: &mut R) -> TickReport
    where
        R: RandomSource + ?Sized,
    {
        let state = encoding::encode(&self.level);
        let (action, diagnostic) = table.greedy(&state, rng);
        debug!(
            level = self.level.level_index(),
            step = self.level.step_count(),
            ?action,
            ?diagnostic,
            "decision"
        );

        self.level.set_player_variant(action.player_variant());
        if self.level.checkpoint_claimed() {
            self.level.set_checkpoint_variant(CLAIMED_CHECKPOINT_VARIANT);
        }
        self.level.count_step();
        self.motion = Some(Motion {
            action,
            origin: self.level.player().position(),
            frames_elapsed: 0,
        });

        TickReport {
            action: Some(action),
            diagnostic,
            ..TickReport::default()
        }
    }
}

/// Whole-tile move spread over several frames.
#[derive(Clone, Copy, Debug)]
struct Motion {
    action: Action,
    origin: Vec3,
    frames_elapsed: u32,
}

impl Motion {
    fn offset(&self) -> Vec3 {
        let (dx, dy) = self.action.delta();
        Vec3::new(dx as f32, dy as f32, 0.0)
    }

    fn target(&self) -> Vec3 {
        self.origin + self.offset()
    }
}
