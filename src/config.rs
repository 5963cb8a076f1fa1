use std::fs;
use std::path::{Path as FsPath, PathBuf};

use serde::{Deserialize, Serialize};

use crate::builder::{BuilderInvalidReason, PuzzleBuilder};
use crate::grid::{Grid, Move, Path};
use crate::puzzle::Puzzle;

/// A puzzle instance as stored on disk. Holes are written as `-1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PuzzleFile {
    /// Start arrangement, row by row.
    pub init: Vec<Vec<i32>>,
    /// Goal arrangement, row by row.
    pub goal: Vec<Vec<i32>>,
    /// Lock-down order; the goal's reading order if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<i32>>,
    /// Heuristic weight, the default if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristic_weight: Option<f32>,
    /// Shortest known solution from `init`, as pivot indices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_known: Option<Vec<u8>>,
}

/// Why a puzzle file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}", .path.display())]
    Io {
        /// The file asked for.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a puzzle file.
    #[error("malformed puzzle file")]
    Json(#[from] serde_json::Error),
    /// The puzzle described is not valid.
    #[error("invalid puzzle: {0:?}")]
    Invalid(Vec<BuilderInvalidReason>),
    /// The recorded best solution names a move the board does not have.
    #[error("move {0} is not a pivot of this board")]
    BadMove(u8),
}

/// A loaded instance: the puzzle plus its recorded best solution, if any.
#[derive(Clone, Debug)]
pub struct Instance<const ROWS: usize, const COLS: usize> {
    /// The validated puzzle.
    pub puzzle: Puzzle<ROWS, COLS>,
    /// Shortest known solution from the start arrangement.
    pub best_known: Option<Path>,
}

impl PuzzleFile {
    /// Parse a puzzle file without validating it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty printed JSON for this file.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate this file against a `ROWS x COLS` board.
    pub fn instance<const ROWS: usize, const COLS: usize>(&self) -> Result<Instance<ROWS, COLS>, ConfigError> {
        let mut builder = PuzzleBuilder::<ROWS, COLS>::new();
        builder.init_rows(&self.init).goal_rows(&self.goal);
        if let Some(order) = &self.order {
            builder.order(order);
        }
        if let Some(weight) = self.heuristic_weight {
            builder.heuristic_weight(weight);
        }
        let puzzle = builder.build().map_err(ConfigError::Invalid)?;

        let best_known = self.best_known.as_deref().map(parse_path::<ROWS, COLS>).transpose()?;
        Ok(Instance { puzzle, best_known })
    }
}

/// Convert raw pivot indices to moves, rejecting any outside the board.
pub fn parse_path<const ROWS: usize, const COLS: usize>(raw: &[u8]) -> Result<Path, ConfigError> {
    raw.iter()
        .map(|index| {
            let mv = Move(*index);
            if Grid::<ROWS, COLS>::is_valid_move(mv) {
                Ok(mv)
            } else {
                Err(ConfigError::BadMove(*index))
            }
        })
        .collect()
}

/// Read and validate a puzzle file.
pub fn load_instance<const ROWS: usize, const COLS: usize>(path: &FsPath) -> Result<Instance<ROWS, COLS>, ConfigError> {
    let json = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    PuzzleFile::from_json(&json)?.instance()
}
