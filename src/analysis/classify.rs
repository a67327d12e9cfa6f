//! Move classification and mistake records
//!
//! A played move is bucketed by how much it loses against the best move
//! available in the same position. Forced-win facts from the proof search
//! override the score buckets: throwing away a proven win, or leaving a
//! stoppable forced loss in place, is always a critical mistake.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Move, Player, Pos};
use crate::eval::heuristic::is_mate_score;
use crate::eval::{MoveQuality, ThreatDetector};

/// How bad a flagged move is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakeKind {
    /// Weak move by score
    Inaccuracy,
    /// Blunder by score
    Blunder,
    /// A proven forced win was available and the move dropped it
    MissedForcedWin,
    /// The opponent's forced win could have been stopped and was not
    IgnoredForcedLoss,
}

/// Proof-search findings around one played move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForcedWinFacts {
    /// Mover's proven forced win before the move
    pub own_win: Option<Vec<Move>>,
    /// The played move keeps that win alive
    pub own_win_kept: bool,
    /// Opponent's proven forced win, had the mover passed
    pub opponent_win: Option<Vec<Move>>,
    /// The opponent still has a proven win after the move
    pub opponent_win_survives: bool,
    /// Playing the best move instead would have refuted it
    pub best_stops_opponent: bool,
}

/// A flagged move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mistake {
    /// Zero-based ordinal of the played move
    pub ordinal: u32,
    pub player: Player,
    pub played: Pos,
    pub severity: Severity,
    pub kind: MistakeKind,
    /// Score lost against the best move, never negative
    pub score_loss: i64,
    pub suggested: Option<Pos>,
    /// The forced line that was missed or allowed
    pub missed_sequence: Vec<Move>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: MoveQuality,
    pub mistake: Option<Mistake>,
}

impl Classification {
    pub fn is_mistake(&self) -> bool {
        self.mistake.is_some()
    }
}

/// Classify `played` in `board_before`.
///
/// `score_before` is the best score available to the mover in
/// `board_before`, `score_after` the score of the position after `played`,
/// both from the mover's point of view. Never mutates the board.
pub fn classify(
    board_before: &Board,
    played: Move,
    best: Option<Pos>,
    score_before: i32,
    score_after: i32,
    facts: &ForcedWinFacts,
) -> Classification {
    let detector = ThreatDetector::for_board(board_before);
    let wins_now = board_before.winner().is_none()
        && detector
            .winning_cells(board_before, played.player)
            .contains(&played.pos);
    let plays_best = best == Some(played.pos);

    let score_loss = if wins_now || plays_best {
        0
    } else {
        (i64::from(score_before) - i64::from(score_after)).max(0)
    };
    let mut category = MoveQuality::from_delta(-score_loss);

    let mistake = |severity, kind, missed_sequence: Vec<Move>| Mistake {
        ordinal: played.ordinal,
        player: played.player,
        played: played.pos,
        severity,
        kind,
        score_loss,
        suggested: best.filter(|&b| b != played.pos),
        missed_sequence,
    };

    if wins_now {
        return Classification {
            category: MoveQuality::Excellent,
            mistake: None,
        };
    }

    if let Some(line) = &facts.own_win {
        if !facts.own_win_kept {
            let suggested = line.first().map(|mv| mv.pos).or(best);
            return Classification {
                category: MoveQuality::Blunder,
                mistake: Some(Mistake {
                    suggested: suggested.filter(|&s| s != played.pos),
                    ..mistake(Severity::Critical, MistakeKind::MissedForcedWin, line.clone())
                }),
            };
        }
        // Still winning; score noise along the line is not a mistake.
        return Classification {
            category: category.min(MoveQuality::Good),
            mistake: None,
        };
    }

    if let Some(line) = &facts.opponent_win {
        if facts.opponent_win_survives && facts.best_stops_opponent && !plays_best {
            return Classification {
                category: MoveQuality::Blunder,
                mistake: Some(mistake(
                    Severity::Critical,
                    MistakeKind::IgnoredForcedLoss,
                    line.clone(),
                )),
            };
        }
    }

    let flagged = match category {
        MoveQuality::Blunder => {
            // Turning a live position into a proven loss by search.
            let severity = if is_mate_score(-score_after) && !is_mate_score(-score_before) {
                Severity::Critical
            } else {
                Severity::Major
            };
            Some(mistake(severity, MistakeKind::Blunder, Vec::new()))
        }
        MoveQuality::Weak => Some(mistake(Severity::Minor, MistakeKind::Inaccuracy, Vec::new())),
        _ => None,
    };
    if flagged.is_none() && plays_best {
        category = MoveQuality::Excellent;
    }

    Classification {
        category,
        mistake: flagged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::WIN_SCORE;

    fn board_with(stones: &[(u8, u8, Player)]) -> Board {
        let mut board = Board::standard();
        for &(r, c, p) in stones {
            board.place(Pos::new(r, c), p).unwrap();
        }
        board
    }

    fn mv(board: &Board, r: u8, c: u8, player: Player) -> Move {
        Move::new(Pos::new(r, c), player, board.stone_count() as u32)
    }

    #[test]
    fn test_best_move_is_excellent() {
        let board = board_with(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let played = mv(&board, 6, 6, Player::Black);
        let c = classify(&board, played, Some(Pos::new(6, 6)), 300, 250, &ForcedWinFacts::default());
        assert_eq!(c.category, MoveQuality::Excellent);
        assert!(!c.is_mistake());
    }

    #[test]
    fn test_score_buckets() {
        let board = board_with(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let played = mv(&board, 0, 0, Player::Black);
        let best = Some(Pos::new(6, 6));
        let facts = ForcedWinFacts::default();

        let c = classify(&board, played, best, 1_000, 500, &facts);
        assert_eq!(c.category, MoveQuality::Good);
        assert!(c.mistake.is_none());

        let c = classify(&board, played, best, 50_000, 0, &facts);
        assert_eq!(c.category, MoveQuality::Weak);
        let m = c.mistake.unwrap();
        assert_eq!(m.kind, MistakeKind::Inaccuracy);
        assert_eq!(m.severity, Severity::Minor);
        assert_eq!(m.score_loss, 50_000);
        assert_eq!(m.suggested, best);

        let c = classify(&board, played, best, 500_000, -200_000, &facts);
        assert_eq!(c.category, MoveQuality::Blunder);
        assert_eq!(c.mistake.unwrap().severity, Severity::Major);
    }

    #[test]
    fn test_blunder_into_mate_is_critical() {
        let board = board_with(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let played = mv(&board, 0, 0, Player::Black);
        let c = classify(
            &board,
            played,
            Some(Pos::new(6, 6)),
            100,
            -(WIN_SCORE - 3),
            &ForcedWinFacts::default(),
        );
        let m = c.mistake.unwrap();
        assert_eq!(m.kind, MistakeKind::Blunder);
        assert_eq!(m.severity, Severity::Critical);
    }

    #[test]
    fn test_better_than_best_is_excellent() {
        let board = board_with(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let played = mv(&board, 8, 8, Player::Black);
        let c = classify(&board, played, Some(Pos::new(6, 6)), 100, 400, &ForcedWinFacts::default());
        assert_eq!(c.category, MoveQuality::Excellent);
    }

    #[test]
    fn test_immediate_win_never_flagged() {
        let board = board_with(&[
            (7, 3, Player::Black),
            (0, 0, Player::White),
            (7, 4, Player::Black),
            (0, 2, Player::White),
            (7, 5, Player::Black),
            (0, 4, Player::White),
            (7, 6, Player::Black),
            (0, 6, Player::White),
        ]);
        let played = mv(&board, 7, 7, Player::Black);
        let c = classify(&board, played, Some(Pos::new(7, 2)), WIN_SCORE - 1, 0, &ForcedWinFacts::default());
        assert_eq!(c.category, MoveQuality::Excellent);
        assert!(c.mistake.is_none());
    }

    #[test]
    fn test_missed_forced_win_is_critical() {
        let board = board_with(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let line = vec![
            Move::new(Pos::new(3, 3), Player::White, 2),
            Move::new(Pos::new(3, 4), Player::Black, 3),
        ];
        let facts = ForcedWinFacts {
            own_win: Some(line.clone()),
            own_win_kept: false,
            ..ForcedWinFacts::default()
        };
        let played = mv(&board, 0, 0, Player::White);
        // Even a tiny score delta is overridden by the proof.
        let c = classify(&board, played, Some(Pos::new(9, 9)), 100, 90, &facts);
        assert_eq!(c.category, MoveQuality::Blunder);
        let m = c.mistake.unwrap();
        assert_eq!(m.severity, Severity::Critical);
        assert_eq!(m.kind, MistakeKind::MissedForcedWin);
        assert_eq!(m.missed_sequence, line);
        assert_eq!(m.suggested, Some(Pos::new(3, 3)));
    }

    #[test]
    fn test_kept_forced_win_is_not_flagged() {
        let board = board_with(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let facts = ForcedWinFacts {
            own_win: Some(vec![Move::new(Pos::new(3, 3), Player::White, 2)]),
            own_win_kept: true,
            ..ForcedWinFacts::default()
        };
        let played = mv(&board, 4, 4, Player::White);
        let c = classify(&board, played, Some(Pos::new(3, 3)), WIN_SCORE - 5, 0, &facts);
        assert!(c.mistake.is_none());
    }

    #[test]
    fn test_ignored_forced_loss() {
        let board = board_with(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let threat = vec![Move::new(Pos::new(7, 6), Player::Black, 2)];
        let mut facts = ForcedWinFacts {
            opponent_win: Some(threat.clone()),
            opponent_win_survives: true,
            best_stops_opponent: true,
            ..ForcedWinFacts::default()
        };
        let played = mv(&board, 0, 0, Player::White);
        let c = classify(&board, played, Some(Pos::new(7, 6)), 0, -10, &facts);
        let m = c.mistake.unwrap();
        assert_eq!(m.kind, MistakeKind::IgnoredForcedLoss);
        assert_eq!(m.severity, Severity::Critical);
        assert_eq!(m.missed_sequence, threat);

        // Unstoppable anyway: judged by score alone.
        facts.best_stops_opponent = false;
        let c = classify(&board, played, Some(Pos::new(7, 6)), 0, -10, &facts);
        assert!(c.mistake.is_none());
    }
}
