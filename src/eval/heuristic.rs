//! Heuristic evaluation of Gomoku positions
//!
//! The score is the weighted sum of the evaluated player's threats minus a
//! discounted weighted sum of the opponent's threats. A completed line is
//! terminal and maps to [`WIN_SCORE`].
//!
//! Search compares raw integer scores only. [`Evaluation::win_probability`]
//! is a display value.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Player};

use super::patterns::WeightTable;
use super::threats::{ThreatCounts, ThreatDetector, ThreatKind};

/// Terminal score: a completed line.
pub const WIN_SCORE: i32 = 1_000_000_000;

/// Scores at least this large encode a forced result (`WIN_SCORE - ply`).
pub const MATE_THRESHOLD: i32 = WIN_SCORE - 1_000;

/// Opponent threats count `OPPONENT_DISCOUNT_NUM / OPPONENT_DISCOUNT_DEN`.
const OPPONENT_DISCOUNT_NUM: i32 = 9;
const OPPONENT_DISCOUNT_DEN: i32 = 10;

/// Score scale of the logistic squashing.
const PROBABILITY_SCALE: f64 = 40_000.0;

/// Static evaluation of a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: i32,
    pub win_probability: f64,
}

/// Is `score` a proven win or loss?
#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE_THRESHOLD
}

/// Monotonic mapping of a score to [0, 1]; exact at terminal scores.
pub fn win_probability(score: i32) -> f64 {
    if score >= MATE_THRESHOLD {
        1.0
    } else if score <= -MATE_THRESHOLD {
        0.0
    } else {
        1.0 / (1.0 + (-f64::from(score) / PROBABILITY_SCALE).exp())
    }
}

/// Position evaluator with a fixed weight table.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    weights: WeightTable,
}

impl Evaluator {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    #[inline]
    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Evaluate `board` from `player`'s point of view.
    #[must_use]
    pub fn evaluate(&self, board: &Board, player: Player) -> Evaluation {
        let detector = ThreatDetector::for_board(board);
        let own = detector.detect_all(board, player).counts;
        let opp = detector.detect_all(board, player.opponent()).counts;
        let score = self.score_counts(&own, &opp);
        Evaluation {
            score,
            win_probability: win_probability(score),
        }
    }

    /// Score from aggregated threat counts (the search path).
    #[inline]
    pub fn score_counts(&self, own: &ThreatCounts, opp: &ThreatCounts) -> i32 {
        if own.get(ThreatKind::Five) > 0 {
            return WIN_SCORE;
        }
        if opp.get(ThreatKind::Five) > 0 {
            return -WIN_SCORE;
        }
        let mine = self.weights.score(own);
        let theirs = self.weights.score(opp);
        mine - theirs * OPPONENT_DISCOUNT_NUM / OPPONENT_DISCOUNT_DEN
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(WeightTable::default())
    }
}

/// Quality of a played move, by how much it loses against the best move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveQuality {
    Excellent,
    Good,
    Okay,
    Weak,
    Blunder,
}

impl MoveQuality {
    /// Bucket upper bounds (inclusive) on the score loss.
    pub const EXCELLENT_MAX: i64 = 50;
    pub const GOOD_MAX: i64 = 1_000;
    pub const OKAY_MAX: i64 = 10_000;
    pub const WEAK_MAX: i64 = 100_000;

    /// Bucket for `delta = score_after - best_score`. Non-negative deltas
    /// (the played move is at least as good) are excellent.
    pub fn from_delta(delta: i64) -> MoveQuality {
        let loss = (-delta).max(0);
        if loss <= Self::EXCELLENT_MAX {
            MoveQuality::Excellent
        } else if loss <= Self::GOOD_MAX {
            MoveQuality::Good
        } else if loss <= Self::OKAY_MAX {
            MoveQuality::Okay
        } else if loss <= Self::WEAK_MAX {
            MoveQuality::Weak
        } else {
            MoveQuality::Blunder
        }
    }

    #[inline]
    pub fn is_mistake(self) -> bool {
        matches!(self, MoveQuality::Weak | MoveQuality::Blunder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Pos;

    fn place_row(board: &mut Board, row: u8, cols: &[u8], player: Player) {
        for &c in cols {
            board.place(Pos::new(row, c), player).unwrap();
        }
    }

    #[test]
    fn test_empty_board_is_neutral() {
        let board = Board::standard();
        let eval = Evaluator::default().evaluate(&board, Player::Black);
        assert_eq!(eval.score, 0);
        assert!((eval.win_probability - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_five_is_terminal() {
        let mut board = Board::standard();
        place_row(&mut board, 0, &[0, 1, 2, 3, 4], Player::Black);
        let ev = Evaluator::default();
        assert_eq!(ev.evaluate(&board, Player::Black).score, WIN_SCORE);
        assert_eq!(ev.evaluate(&board, Player::Black).win_probability, 1.0);
        assert_eq!(ev.evaluate(&board, Player::White).score, -WIN_SCORE);
        assert_eq!(ev.evaluate(&board, Player::White).win_probability, 0.0);
    }

    #[test]
    fn test_opponent_discount_breaks_symmetry() {
        let mut board = Board::standard();
        place_row(&mut board, 3, &[5, 6, 7], Player::Black);
        place_row(&mut board, 10, &[5, 6, 7], Player::White);
        let ev = Evaluator::default();
        assert!(ev.evaluate(&board, Player::Black).score > 0);
        assert!(ev.evaluate(&board, Player::White).score > 0);
    }

    #[test]
    fn test_open_four_beats_many_open_threes() {
        let ev = Evaluator::default();

        let mut four = Board::standard();
        place_row(&mut four, 7, &[4, 5, 6, 7], Player::Black);

        let mut threes = Board::standard();
        place_row(&mut threes, 1, &[2, 3, 4], Player::Black);
        place_row(&mut threes, 5, &[2, 3, 4], Player::Black);
        place_row(&mut threes, 9, &[2, 3, 4], Player::Black);
        place_row(&mut threes, 13, &[2, 3, 4], Player::Black);

        assert!(
            ev.evaluate(&four, Player::Black).score > ev.evaluate(&threes, Player::Black).score
        );
    }

    #[test]
    fn test_win_probability_monotonic() {
        let mut last = 0.0;
        for score in (-200_000..=200_000).step_by(10_000) {
            let p = win_probability(score);
            assert!(p >= last);
            assert!((0.0..=1.0).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_quality_buckets() {
        assert_eq!(MoveQuality::from_delta(0), MoveQuality::Excellent);
        assert_eq!(MoveQuality::from_delta(500), MoveQuality::Excellent);
        assert_eq!(MoveQuality::from_delta(-50), MoveQuality::Excellent);
        assert_eq!(MoveQuality::from_delta(-51), MoveQuality::Good);
        assert_eq!(MoveQuality::from_delta(-5_000), MoveQuality::Okay);
        assert_eq!(MoveQuality::from_delta(-50_000), MoveQuality::Weak);
        assert_eq!(MoveQuality::from_delta(-2_000_000), MoveQuality::Blunder);
        assert!(MoveQuality::Blunder.is_mistake());
        assert!(!MoveQuality::Okay.is_mistake());
    }
}
