//! Error types for the analysis engine
//!
//! Only malformed input is an error. Timeouts and unproven forced wins
//! degrade a result instead of failing it, and transposition-table misses
//! never surface at all.

use crate::board::Pos;

/// Rejected board mutation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// Coordinate outside the board
    #[error("({row}, {col}) is outside the {size}x{size} board")]
    OutOfBounds { row: i32, col: i32, size: usize },

    /// Cell already holds a stone
    #[error("cell ({}, {}) is already occupied", .0.row, .0.col)]
    CellOccupied(Pos),

    /// Undo on an empty history
    #[error("no move to undo")]
    EmptyHistory,
}

/// Rejected letter-column + row coordinate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("empty coordinate")]
    Empty,

    #[error("invalid column letter {0:?}")]
    InvalidColumn(char),

    #[error("column {column} is outside a board of size {size}")]
    ColumnOutOfRange { column: char, size: usize },

    #[error("invalid row number {0:?}")]
    InvalidRow(String),

    #[error("row {row} is outside a board of size {size}")]
    RowOutOfRange { row: usize, size: usize },
}

/// Invalid engine configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("board size {size} is outside the supported range {min}..={max}")]
    BoardSize { size: usize, min: usize, max: usize },

    #[error("win length {win_length} is invalid for a {size}x{size} board (supported {min}..={max})")]
    WinLength {
        win_length: usize,
        size: usize,
        min: usize,
        max: usize,
    },

    #[error("search depth must be between 1 and {max}, got {got}")]
    Depth { got: u8, max: u8 },

    #[error("forced-win ply budget must be between 1 and {max}, got {got}")]
    Plies { got: u8, max: u8 },

    #[error("weight table breaks the danger ordering at {0}")]
    WeightOrdering(&'static str),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Why a replayed move was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidMoveReason {
    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error(transparent)]
    Board(#[from] MoveError),
}

/// Failure of a whole analysis request.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    /// Corrupted move list; `index` is zero-based
    #[error("invalid move #{index} ({coord}): {reason}")]
    InvalidMove {
        index: usize,
        coord: String,
        reason: InvalidMoveReason,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// Index of the offending move, if the failure came from the move list.
    pub fn move_index(&self) -> Option<usize> {
        match self {
            AnalysisError::InvalidMove { index, .. } => Some(*index),
            AnalysisError::Config(_) => None,
        }
    }
}
