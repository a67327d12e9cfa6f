//! Search module for position analysis
//!
//! Contains:
//! - Transposition table for caching search results
//! - Alpha-Beta search with iterative deepening
//! - VCF/VCT threat search for forced wins

pub mod alphabeta;
pub mod threat;
pub mod tt;

pub use alphabeta::{SearchLimits, SearchOutcome, SearchStats, Searcher, MAX_SEARCH_DEPTH};
pub use threat::{
    is_winning_move, prove_forced_win, ForcedWinConfig, ForcedWinOutcome, ForcedWinSearcher,
    ProofCache, ProofResult, MAX_PROOF_PLIES,
};
pub use tt::{EntryType, SharedTranspositionTable, TTEntry, TTStats, TranspositionTable};
