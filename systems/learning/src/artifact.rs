//! Learned-table artifact persistence.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_quest_core::{EncodedState, ACTION_COUNT};
use tracing::info;

use crate::QTable;

const ARTIFACT_VERSION: u32 = 1;

/// Failures raised while saving or loading a learned table.
#[derive(Debug, Error)]
pub enum TableError {
    /// The artifact file could not be created, opened or written.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path of the artifact.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The table could not be encoded.
    #[error("failed to encode learned table: {0}")]
    Encode(#[source] bincode::Error),
    /// The artifact is truncated or corrupt.
    #[error("failed to decode learned table: {0}")]
    Decode(#[source] bincode::Error),
    /// The artifact was written by an incompatible format version.
    #[error("unsupported learned table version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version recorded in the artifact.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
    /// The artifact stores rows of a different width.
    #[error("learned table stores {found} actions per state; expected {expected}")]
    ActionCountMismatch {
        /// Width recorded in the artifact.
        found: u32,
        /// Width this build understands.
        expected: u32,
    },
}

#[derive(Serialize, Deserialize)]
struct TableArtifact {
    version: u32,
    n_actions: u32,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    rows: Vec<(EncodedState, [f64; ACTION_COUNT])>,
}

impl QTable {
    /// Encodes the table and its hyperparameters into an opaque blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        bincode::serialize(&self.artifact()).map_err(TableError::Encode)
    }

    /// Restores a table previously produced by [`QTable::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let artifact: TableArtifact = bincode::deserialize(bytes).map_err(TableError::Decode)?;
        Self::from_artifact(artifact)
    }

    /// Writes the table to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(io_error("create", path))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.artifact()).map_err(TableError::Encode)?;
        writer.flush().map_err(io_error("write", path))?;

        info!(path = %path.display(), rows = self.len(), "saved learned table");
        Ok(())
    }

    /// Reads a table from `path`.
    ///
    /// A missing, truncated or incompatible artifact is an error; no empty
    /// table is substituted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(io_error("open", path))?;
        let artifact: TableArtifact =
            bincode::deserialize_from(BufReader::new(file)).map_err(TableError::Decode)?;
        let table = Self::from_artifact(artifact)?;

        info!(path = %path.display(), rows = table.len(), "loaded learned table");
        Ok(table)
    }

    fn artifact(&self) -> TableArtifact {
        TableArtifact {
            version: ARTIFACT_VERSION,
            n_actions: ACTION_COUNT as u32,
            alpha: self.alpha,
            gamma: self.gamma,
            epsilon: self.epsilon,
            rows: self
                .rows
                .iter()
                .map(|(state, row)| (state.clone(), *row))
                .collect(),
        }
    }

    fn from_artifact(artifact: TableArtifact) -> Result<Self, TableError> {
        if artifact.version != ARTIFACT_VERSION {
            return Err(TableError::UnsupportedVersion {
                found: artifact.version,
                expected: ARTIFACT_VERSION,
            });
        }
        if artifact.n_actions != ACTION_COUNT as u32 {
            return Err(TableError::ActionCountMismatch {
                found: artifact.n_actions,
                expected: ACTION_COUNT as u32,
            });
        }

        let mut table = Self::new(artifact.alpha, artifact.gamma, artifact.epsilon);
        table.rows = artifact.rows.into_iter().collect();
        Ok(table)
    }
}

fn io_error(operation: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> TableError {
    let path = path.display().to_string();
    move |source| TableError::Io {
        operation,
        path,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_quest_core::{Action, TilePosition};

    fn state(x: i32, step: u32) -> EncodedState {
        EncodedState::new(vec![TilePosition::new(x, 0, 0)], step, 1)
    }

    fn trained_table() -> QTable {
        let mut table = QTable::new(0.2, 0.9, 0.05);
        table.update(&state(0, 0), Action::PositiveX, -1.0, &state(1, 1), Action::PositiveX);
        table.update(&state(1, 1), Action::PositiveX, 100.0, &state(2, 2), Action::NegativeY);
        table
    }

    #[test]
    fn bytes_restore_rows_and_hyperparameters() {
        let table = trained_table();
        let restored = QTable::from_bytes(&table.to_bytes().expect("encode")).expect("decode");

        assert_eq!(restored.hyperparameters(), table.hyperparameters());
        assert_eq!(restored.len(), table.len());
        assert_eq!(restored.values(&state(1, 1)), table.values(&state(1, 1)));
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let bytes = trained_table().to_bytes().expect("encode");
        let error = QTable::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(error, TableError::Decode(_)));
    }

    #[test]
    fn foreign_version_is_rejected() {
        let mut artifact = trained_table().artifact();
        artifact.version = 99;
        let bytes = bincode::serialize(&artifact).expect("encode");
        let error = QTable::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            error,
            TableError::UnsupportedVersion {
                found: 99,
                expected: 1
            }
        ));
    }

    #[test]
    fn mismatched_row_width_is_rejected() {
        let mut artifact = trained_table().artifact();
        artifact.n_actions = 6;
        let bytes = bincode::serialize(&artifact).expect("encode");
        let error = QTable::from_bytes(&bytes).unwrap_err();
        assert!(matches!(error, TableError::ActionCountMismatch { found: 6, .. }));
    }
}
