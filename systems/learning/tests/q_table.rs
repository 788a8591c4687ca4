use std::collections::VecDeque;

use tile_quest_core::{Action, EncodedState, RandomSource, TilePosition, ACTION_COUNT};
use tile_quest_system_learning::{QTable, SeededRandom, TableError};

/// Random source replaying a fixed script of draws.
#[derive(Debug, Default)]
struct ScriptedRandom {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
    index_draws: usize,
}

impl ScriptedRandom {
    fn new(units: &[f64], indices: &[usize]) -> Self {
        Self {
            units: units.iter().copied().collect(),
            indices: indices.iter().copied().collect(),
            index_draws: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.units.pop_front().expect("unit draw was not scripted")
    }

    fn next_index(&mut self, upper: usize) -> usize {
        self.index_draws += 1;
        let index = self.indices.pop_front().expect("index draw was not scripted");
        assert!(index < upper);
        index
    }
}

fn state(x: i32, step: u32) -> EncodedState {
    EncodedState::new(vec![TilePosition::new(x, 0, 0)], step, 1)
}

/// Table whose row for `state(0, 0)` prefers `NegativeY`.
fn table_preferring_negative_y() -> QTable {
    let mut table = QTable::new(0.5, 0.9, 0.0);
    table.update(&state(0, 0), Action::NegativeY, 2.0, &state(1, 1), Action::PositiveX);
    table
}

#[test]
fn first_update_touches_only_the_chosen_action() {
    let mut table = QTable::new(0.2, 0.9, 0.05);
    let fresh = state(3, 4);
    table.update(&fresh, Action::PositiveY, -1.0, &state(4, 5), Action::PositiveX);

    let row = table.values(&fresh).expect("row materialized");
    assert_eq!(row[Action::PositiveX.index()], 0.0);
    assert_eq!(row[Action::NegativeX.index()], 0.0);
    assert!((row[Action::PositiveY.index()] - (-0.2)).abs() < 1e-12);
    assert_eq!(row[Action::NegativeY.index()], 0.0);
}

#[test]
fn update_bootstraps_from_existing_successor() {
    let mut table = QTable::new(0.5, 0.9, 0.0);
    let successor = state(1, 1);
    table.update(&successor, Action::PositiveX, 10.0, &state(2, 2), Action::PositiveX);
    assert_eq!(table.values(&successor), Some(&[5.0, 0.0, 0.0, 0.0]));

    let fresh = state(0, 0);
    table.update(&fresh, Action::PositiveX, -1.0, &successor, Action::PositiveX);
    // 0 + 0.5 * (-1 + 0.9 * 5 - 0)
    let value = table.values(&fresh).expect("row")[Action::PositiveX.index()];
    assert!((value - 1.75).abs() < 1e-12);

    table.update(&fresh, Action::PositiveX, -1.0, &successor, Action::PositiveX);
    // 1.75 + 0.5 * (-1 + 4.5 - 1.75)
    let value = table.values(&fresh).expect("row")[Action::PositiveX.index()];
    assert!((value - 2.625).abs() < 1e-12);
    assert_eq!(table.len(), 3);
}

#[test]
fn update_against_fresh_successor_uses_zero() {
    let mut table = QTable::new(0.5, 0.9, 0.0);
    let known = state(0, 0);
    table.update(&known, Action::NegativeX, 4.0, &state(1, 1), Action::PositiveX);
    table.update(&known, Action::NegativeX, 4.0, &state(7, 7), Action::NegativeY);

    // 2 + 0.5 * (4 + 0 - 2)
    let value = table.values(&known).expect("row")[Action::NegativeX.index()];
    assert!((value - 3.0).abs() < 1e-12);
    assert_eq!(table.values(&state(7, 7)), Some(&[0.0; ACTION_COUNT]));
}

#[test]
fn exploration_draw_below_epsilon_picks_random_action() {
    let table = table_preferring_negative_y();
    let mut rng = ScriptedRandom::new(&[0.1], &[2]);
    let action = table.explore_or_exploit(&state(0, 0), 0.5, &mut rng);
    assert_eq!(action, Action::PositiveY);
    assert_eq!(rng.index_draws, 1);
}

#[test]
fn exploitation_draw_picks_best_action_without_random_index() {
    let table = table_preferring_negative_y();
    let mut rng = ScriptedRandom::new(&[0.9], &[]);
    let action = table.explore_or_exploit(&state(0, 0), 0.5, &mut rng);
    assert_eq!(action, Action::NegativeY);
    assert_eq!(rng.index_draws, 0);
}

#[test]
fn unknown_state_falls_back_to_random_action() {
    let table = table_preferring_negative_y();
    let mut rng = ScriptedRandom::new(&[0.9], &[1]);
    let action = table.explore_or_exploit(&state(9, 9), 0.0, &mut rng);
    assert_eq!(action, Action::NegativeX);
    assert_eq!(rng.index_draws, 1);
    assert!(table.values(&state(9, 9)).is_none());
}

#[test]
fn tied_rows_choose_uniformly() {
    let mut table = QTable::new(0.5, 0.9, 0.0);
    let tied = state(0, 0);
    table.update(&tied, Action::PositiveX, 0.0, &state(1, 1), Action::PositiveX);
    assert_eq!(table.values(&tied), Some(&[0.0; ACTION_COUNT]));

    let mut rng = SeededRandom::seeded(42);
    let trials = 4_000;
    let mut counts = [0_u32; ACTION_COUNT];
    for _ in 0..trials {
        counts[table.explore_or_exploit(&tied, 0.0, &mut rng).index()] += 1;
    }

    let expected = f64::from(trials) / ACTION_COUNT as f64;
    let chi_square: f64 = counts
        .iter()
        .map(|&count| {
            let delta = f64::from(count) - expected;
            delta * delta / expected
        })
        .sum();

    // Critical value for three degrees of freedom at p = 0.001.
    assert!(chi_square < 16.27, "counts {counts:?} gave chi-square {chi_square}");
    assert!(counts.iter().all(|&count| count > 0));
}

#[test]
fn greedy_reports_rounded_values_for_genuine_choices() {
    let mut table = QTable::new(1.0 / 3.0, 0.9, 0.0);
    table.update(&state(0, 0), Action::PositiveY, 1.0, &state(1, 1), Action::PositiveX);

    let mut rng = ScriptedRandom::new(&[], &[]);
    let (action, diagnostic) = table.greedy(&state(0, 0), &mut rng);
    assert_eq!(action, Action::PositiveY);
    let diagnostic = diagnostic.expect("genuine best action");
    assert_eq!(diagnostic.values(), &[0.0, 0.0, 0.33, 0.0]);
}

#[test]
fn greedy_reports_nothing_for_random_choices() {
    let table = QTable::new(0.5, 0.9, 0.0);
    let mut rng = ScriptedRandom::new(&[], &[3]);
    let (action, diagnostic) = table.greedy(&state(0, 0), &mut rng);
    assert_eq!(action, Action::NegativeY);
    assert!(diagnostic.is_none());
    assert!(table.is_empty());
}

#[test]
fn artifact_round_trips_through_disk() {
    let table = table_preferring_negative_y();
    let path = std::env::temp_dir().join(format!("tile-quest-table-{}.bin", std::process::id()));

    table.save(&path).expect("save");
    let restored = QTable::load(&path).expect("load");
    std::fs::remove_file(&path).expect("cleanup");

    assert_eq!(restored.hyperparameters(), table.hyperparameters());
    assert_eq!(restored.values(&state(0, 0)), table.values(&state(0, 0)));
}

#[test]
fn loading_missing_artifact_fails() {
    let path = std::env::temp_dir().join("tile-quest-table-does-not-exist.bin");
    let error = QTable::load(&path).unwrap_err();
    assert!(matches!(error, TableError::Io { operation: "open", .. }));
}

#[test]
fn loading_corrupt_artifact_fails() {
    let path = std::env::temp_dir().join(format!("tile-quest-corrupt-{}.bin", std::process::id()));
    std::fs::write(&path, b"definitely not a table").expect("write");
    let result = QTable::load(&path);
    std::fs::remove_file(&path).expect("cleanup");
    assert!(result.is_err());
}
