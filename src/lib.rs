//! Gomoku position-analysis engine
//!
//! Given a board and its move history, the engine detects threats, scores
//! positions, proves or refutes forced wins and classifies every played
//! move against the best move available:
//! - Configurable board dimension (5 to 19) and win length (4 to 6)
//! - Overlines count as wins
//! - Letter-column + 1-based-row coordinates ("H8") at the boundary
//!
//! # Architecture
//!
//! - [`board`]: Bitboard representation with apply/undo and Zobrist hashing
//! - [`eval`]: Threat detection, weight tables and position evaluation
//! - [`search`]: Alpha-beta with a transposition table, VCF/VCT proof search
//! - [`analysis`]: Move classification and the full-history orchestrator
//! - [`config`]: Tier profiles and TOML configuration
//!
//! # Quick Start
//!
//! ```
//! use gomoku::{analyze, MoveInput, Tier};
//!
//! let moves = MoveInput::alternating(["H8", "H9", "I8", "I9", "J8"]);
//! let result = analyze(&moves, 15, 5, Tier::Basic).unwrap();
//! assert_eq!(result.timeline.len(), 5);
//! for entry in &result.timeline {
//!     println!("{} {}: {:?} ({})", entry.ordinal, entry.coord, entry.category, entry.note);
//! }
//! ```

pub mod analysis;
pub mod board;
pub mod config;
pub mod error;
pub mod eval;
pub mod search;

use std::time::Duration;

// Re-export commonly used types for convenience
pub use analysis::{AnalysisResult, Analyzer, BestMove, MistakeRecord, MoveInput, TimelineEntry};
pub use board::{Board, Move, Player, Pos, Stone};
pub use config::{EngineConfig, Tier, TierProfile};
pub use error::{AnalysisError, ConfigError, MoveError, NotationError};

/// Analyze a full move list with the preset profile of `tier`.
pub fn analyze(
    move_list: &[MoveInput],
    board_dimension: usize,
    win_length: usize,
    tier: Tier,
) -> Result<AnalysisResult, AnalysisError> {
    let config = EngineConfig::new(board_dimension, win_length, tier)?;
    Analyzer::new(config).analyze(move_list)
}

/// Single recommendation for `player` on `board` within `time_budget`,
/// using the deep profile (forced wins first, then alpha-beta).
///
/// `None` when the game is already decided or the board is full.
pub fn best_move(board: &Board, player: Player, time_budget: Duration) -> Option<Move> {
    let config = EngineConfig {
        board_size: board.size(),
        win_length: board.win_length(),
        tier: Tier::Deep,
        profile: TierProfile::deep(),
    };
    Analyzer::new(config)
        .best_move(board, player, time_budget)
        .map(|best| best.to_move())
}
