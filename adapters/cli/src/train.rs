use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args;
use rand::Rng;
use tile_quest_system_learning::SeededRandom;
use tile_quest_system_training::{Trainer, TrainingConfig};
use tile_quest_world::Campaign;
use tracing::info;

/// Arguments of the `train` subcommand.
#[derive(Args, Debug)]
pub(crate) struct TrainArgs {
    /// Campaign file holding the levels to train on.
    #[arg(long, default_value = "assets/levels.toml")]
    levels: PathBuf,

    /// Training configuration; built-in defaults when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the trained table. Defaults to models/model-NNN.bin.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Seed of the exploration random source; overrides the config.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of episodes; overrides the config.
    #[arg(long)]
    episodes: Option<u32>,
}

pub(crate) fn run(args: TrainArgs) -> Result<()> {
    let campaign = Campaign::load(&args.levels)
        .with_context(|| format!("failed to load levels from {}", args.levels.display()))?;

    let mut config = match &args.config {
        Some(path) => TrainingConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        config.episodes = episodes;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let mut rng = match config.seed {
        Some(seed) => SeededRandom::seeded(seed),
        None => SeededRandom::from_entropy(),
    };
    info!(
        levels = campaign.len(),
        episodes = config.episodes,
        max_steps = config.max_steps,
        alpha = config.alpha,
        gamma = config.gamma,
        seed = ?config.seed,
        "training started"
    );

    let trainer = Trainer::new(&campaign, config);
    let mut table = trainer.config().new_table();
    let mut summaries = Vec::new();
    trainer.train(&mut table, &mut rng, &mut summaries);

    let completed = summaries
        .iter()
        .filter(|summary| summary.campaign_completed)
        .count();
    let best_level = summaries
        .iter()
        .map(|summary| summary.level_reached)
        .max()
        .unwrap_or(0);
    info!(
        episodes = summaries.len(),
        completed,
        best_level,
        table_size = table.len(),
        "training finished"
    );

    let output = args
        .output
        .unwrap_or_else(|| default_model_path(&mut rand::thread_rng()));
    ensure_parent(&output)?;
    table
        .save(&output)
        .with_context(|| format!("failed to save model to {}", output.display()))?;
    println!("saved model to {}", output.display());
    Ok(())
}

fn default_model_path<R: Rng>(rng: &mut R) -> PathBuf {
    PathBuf::from(format!("models/model-{:03}.bin", rng.gen_range(100..1000)))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display())),
        _ => Ok(()),
    }
}
