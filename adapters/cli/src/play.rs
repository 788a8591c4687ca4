use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tile_quest_core::{SimulationGate, TickReport};
use tile_quest_system_evaluation::{Evaluator, DEFAULT_FRAMES_PER_TICK};
use tile_quest_system_learning::{QTable, SeededRandom};
use tile_quest_world::Campaign;
use tracing::info;

/// Length of the simulated exit transition, in ticks.
const EXIT_TRANSITION_TICKS: u32 = 2;

/// Arguments of the `play` subcommand.
#[derive(Args, Debug)]
pub(crate) struct PlayArgs {
    /// Campaign file holding the levels to replay.
    #[arg(long, default_value = "assets/levels.toml")]
    levels: PathBuf,

    /// Trained table written by `train`.
    #[arg(long, short = 'm')]
    model: PathBuf,

    /// Frames rendered between two decisions.
    #[arg(long, default_value_t = DEFAULT_FRAMES_PER_TICK)]
    fps: u32,

    /// Seed used to break ties between equally valued actions.
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many ticks even if the replay has not ended.
    #[arg(long, default_value_t = 500)]
    max_ticks: u32,
}

pub(crate) fn run(args: PlayArgs) -> Result<()> {
    let campaign = Campaign::load(&args.levels)
        .with_context(|| format!("failed to load levels from {}", args.levels.display()))?;
    let table = QTable::load(&args.model)
        .with_context(|| format!("failed to load model from {}", args.model.display()))?;
    let mut rng = match args.seed {
        Some(seed) => SeededRandom::seeded(seed),
        None => SeededRandom::from_entropy(),
    };

    let mut evaluator = Evaluator::new(&campaign, args.fps);
    let mut presentation = HeadlessPresentation::default();
    let mut last = TickReport::default();

    for tick in 0..args.max_ticks {
        let level = evaluator.level().level_index();
        let step = evaluator.level().step_count();
        let report = evaluator.tick(presentation.gate(), &table, &mut rng);

        if let Some(action) = report.action {
            match report.diagnostic {
                Some(values) => println!(
                    "tick {tick:>4}  level {level}  step {step:>3}  {action:?}  {:?}",
                    values.values()
                ),
                None => println!(
                    "tick {tick:>4}  level {level}  step {step:>3}  {action:?}  (no preference)"
                ),
            }
        }
        if report.level_completed {
            println!("level {level} completed");
            presentation.start_exit(evaluator.frames_per_tick() * EXIT_TRANSITION_TICKS);
            evaluator.acknowledge_level_complete();
        }
        let game_over = report.game_over;
        last = report;
        if game_over {
            break;
        }

        for _ in 0..evaluator.frames_per_tick() {
            evaluator.advance_frame();
            presentation.advance_frame();
        }
    }

    let outcome = match (last.game_over, last.level_completed) {
        (true, true) => "campaign completed",
        (true, false) => "agent fell off the floor",
        (false, _) => "tick budget exhausted",
    };
    info!(
        level = evaluator.level().level_index(),
        steps = evaluator.level().step_count(),
        outcome,
        "replay finished"
    );
    println!("{outcome}");
    Ok(())
}

/// Stand-in for a renderer: plays an exit transition after each completed
/// level and holds the simulation while it runs.
#[derive(Debug, Default)]
struct HeadlessPresentation {
    transition_frames: u32,
}

impl HeadlessPresentation {
    fn gate(&self) -> SimulationGate {
        if self.transition_frames > 0 {
            SimulationGate::TransitionActive
        } else {
            SimulationGate::Open
        }
    }

    fn start_exit(&mut self, frames: u32) {
        self.transition_frames = frames;
    }

    fn advance_frame(&mut self) {
        self.transition_frames = self.transition_frames.saturating_sub(1);
    }
}
