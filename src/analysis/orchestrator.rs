//! Full-history analysis
//!
//! The [`Analyzer`] replays a move list, searches every position once and
//! turns the searches into a timeline of classified moves. Only plain data
//! (notation strings, player tags, ordinals, scores) leaves this module.
//!
//! ```
//! use gomoku::analysis::{Analyzer, MoveInput};
//! use gomoku::config::{EngineConfig, Tier};
//!
//! let analyzer = Analyzer::new(EngineConfig::new(15, 5, Tier::Basic).unwrap());
//! let moves = MoveInput::alternating(["H8", "I9", "H9"]);
//! let result = analyzer.analyze(&moves).unwrap();
//! assert_eq!(result.timeline.len(), 3);
//! assert_eq!(result.timeline[0].coord, "H8");
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::board::notation::{format_coord, parse_coord};
use crate::board::{Board, Move, Player, Pos};
use crate::config::{EngineConfig, Tier, TierProfile};
use crate::error::{AnalysisError, InvalidMoveReason};
use crate::eval::{win_probability, Evaluator, MoveQuality, ThreatDetector};
use crate::search::{
    ForcedWinOutcome, ForcedWinSearcher, ProofResult, SearchLimits, SearchOutcome, Searcher,
    MAX_SEARCH_DEPTH,
};

use super::classify::{classify, ForcedWinFacts, MistakeKind, Severity};

/// One move of an input history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInput {
    /// Letter column + 1-based row, e.g. `"H8"`
    pub coord: String,
    /// Defaults to alternating colours starting with Black
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Player>,
}

impl MoveInput {
    pub fn new(coord: impl Into<String>) -> Self {
        Self {
            coord: coord.into(),
            player: None,
        }
    }

    /// Moves with implicit alternating colours.
    pub fn alternating<I, S>(coords: I) -> Vec<MoveInput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        coords.into_iter().map(MoveInput::new).collect()
    }
}

/// One analyzed move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// 1-based move number
    pub ordinal: u32,
    pub player: Player,
    pub coord: String,
    /// Best score available before the move, mover's point of view
    pub score_before: i32,
    /// Score after the move, mover's point of view
    pub score_after: i32,
    pub win_probability: f64,
    pub category: MoveQuality,
    pub note: String,
    /// Engine recommendation for the same position
    pub best_move: Option<String>,
    pub depth: u8,
    pub timed_out: bool,
}

/// A flagged move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeRecord {
    /// 1-based move number
    pub ordinal: u32,
    pub player: Player,
    pub coord: String,
    pub severity: Severity,
    pub kind: MistakeKind,
    pub score_loss: i64,
    pub suggested: Option<String>,
    /// Forced line that was missed or allowed, in notation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missed_sequence: Vec<String>,
}

/// Output of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub board_size: usize,
    pub win_length: usize,
    pub tier: Tier,
    pub timeline: Vec<TimelineEntry>,
    pub mistakes: Vec<MistakeRecord>,
    /// Recommendation for the side to move after the last move
    pub final_best_move: Option<String>,
    pub winner: Option<Player>,
    /// Degraded conditions: timeouts, inconclusive proofs, decided games
    pub notes: Vec<String>,
}

/// Single recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMove {
    pub coord: String,
    pub row: u8,
    pub col: u8,
    pub player: Player,
    /// Zero-based ordinal the move would take in the history
    pub ordinal: u32,
    pub score: i32,
    pub win_probability: f64,
    pub depth: u8,
    pub timed_out: bool,
    /// Proven forced line starting with this move, when one was found
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forced_sequence: Vec<String>,
}

impl BestMove {
    pub fn to_move(&self) -> Move {
        Move::new(Pos::new(self.row, self.col), self.player, self.ordinal)
    }
}

/// Drives search, proof search and classification over move lists.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: EngineConfig,
}

impl Analyzer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replay `moves` and check every coordinate and placement.
    pub fn replay(&self, moves: &[MoveInput]) -> Result<Board, AnalysisError> {
        let mut board = Board::new(self.config.board_size, self.config.win_length)?;
        for (index, input) in moves.iter().enumerate() {
            let invalid = |reason: InvalidMoveReason| AnalysisError::InvalidMove {
                index,
                coord: input.coord.clone(),
                reason,
            };
            let pos = parse_coord(&input.coord, board.size()).map_err(|e| invalid(e.into()))?;
            let player = input.player.unwrap_or_else(|| board.side_to_move());
            board
                .apply(Move::new(pos, player, index as u32))
                .map_err(|e| invalid(e.into()))?;
        }
        Ok(board)
    }

    /// Analyze a complete history.
    pub fn analyze(&self, moves: &[MoveInput]) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let final_board = self.replay(moves)?;
        let history = final_board.history().to_vec();
        let profile = self.config.profile;
        log::info!(
            "analyzing {} moves on {size}x{size} (k={}, tier {})",
            history.len(),
            self.config.win_length,
            self.config.tier,
            size = self.config.board_size,
        );

        let mut session = Session::new(&self.config);
        let mut board = Board::new(self.config.board_size, self.config.win_length)?;
        let mut notes = Vec::new();

        // Position i is the board before move i; the last one is the final board.
        let mut searches: Vec<SearchOutcome> = Vec::with_capacity(history.len() + 1);
        let mut movers: Vec<Player> = history.iter().map(|mv| mv.player).collect();
        movers.push(final_board.side_to_move());
        let mut boards: Vec<Board> = Vec::with_capacity(history.len() + 1);
        for (i, &mover) in movers.iter().enumerate() {
            let outcome = session.search(&board, mover);
            if outcome.timed_out {
                notes.push(format!(
                    "search before move {} stopped at depth {}",
                    i + 1,
                    outcome.depth
                ));
            }
            searches.push(outcome);
            boards.push(board.clone());
            if let Some(&mv) = history.get(i) {
                board.apply(mv).map_err(|e| AnalysisError::InvalidMove {
                    index: i,
                    coord: format_coord(mv.pos),
                    reason: e.into(),
                })?;
            }
        }

        let mut timeline = Vec::with_capacity(history.len());
        let mut mistakes = Vec::new();
        let mut decided_noted = false;
        for (i, &mv) in history.iter().enumerate() {
            let before = &boards[i];
            if let Some(winner) = before.winner() {
                if !decided_noted {
                    notes.push(format!(
                        "game was already won by {:?} before move {}",
                        winner,
                        i + 1
                    ));
                    decided_noted = true;
                }
            }

            let search = &searches[i];
            let next = &searches[i + 1];
            let score_before = search.score;
            let score_after = if movers[i + 1] == mv.player {
                next.score
            } else {
                -next.score
            };

            let after = &boards[i + 1];
            let facts = match session.forced_win_facts(before, after, mv, search.best_move) {
                Ok(facts) => facts,
                Err(note) => {
                    notes.push(format!("move {}: {note}", i + 1));
                    ForcedWinFacts::default()
                }
            };
            let classification =
                classify(before, mv, search.best_move, score_before, score_after, &facts);

            let note = match &classification.mistake {
                Some(m) => describe_mistake(m.kind, m.suggested),
                None => describe_move(before, mv, search.best_move),
            };

            if let Some(m) = &classification.mistake {
                log::debug!("move {} {} flagged as {:?}", i + 1, format_coord(mv.pos), m.kind);
                mistakes.push(MistakeRecord {
                    ordinal: m.ordinal + 1,
                    player: m.player,
                    coord: format_coord(m.played),
                    severity: m.severity,
                    kind: m.kind,
                    score_loss: m.score_loss,
                    suggested: m.suggested.map(format_coord),
                    missed_sequence: m
                        .missed_sequence
                        .iter()
                        .map(|line_move| format_coord(line_move.pos))
                        .collect(),
                });
            }

            timeline.push(TimelineEntry {
                ordinal: mv.ordinal + 1,
                player: mv.player,
                coord: format_coord(mv.pos),
                score_before,
                score_after,
                win_probability: win_probability(score_after),
                category: classification.category,
                note,
                best_move: search.best_move.map(format_coord),
                depth: search.depth,
                timed_out: search.timed_out,
            });
        }

        let final_search = &searches[history.len()];
        let final_best_move = if final_board.winner().is_some() {
            None
        } else {
            session
                .forced_win_first_move(&final_board, final_board.side_to_move())
                .or(final_search.best_move)
                .map(format_coord)
        };

        log::info!(
            "analysis finished: {} mistakes, {} notes in {:?}",
            mistakes.len(),
            notes.len(),
            start.elapsed()
        );
        if profile.forced_win.is_none() {
            log::debug!("forced-win search disabled for tier {}", self.config.tier);
        }

        Ok(AnalysisResult {
            board_size: self.config.board_size,
            win_length: self.config.win_length,
            tier: self.config.tier,
            timeline,
            mistakes,
            final_best_move,
            winner: final_board.winner(),
            notes,
        })
    }

    /// Analyze independent requests on scoped worker threads.
    pub fn analyze_many(
        &self,
        requests: &[Vec<MoveInput>],
    ) -> Vec<Result<AnalysisResult, AnalysisError>> {
        if requests.is_empty() {
            return Vec::new();
        }
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(requests.len());
        let chunk = requests.len().div_ceil(threads);

        std::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .chunks(chunk)
                .map(|batch| {
                    scope.spawn(move || {
                        batch
                            .iter()
                            .map(|moves| self.analyze(moves))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    /// Recommend a move for `player` within `time_budget`.
    ///
    /// Returns `None` only when the game is decided or the board is full.
    pub fn best_move(
        &self,
        board: &Board,
        player: Player,
        time_budget: Duration,
    ) -> Option<BestMove> {
        if board.winner().is_some() || board.is_full() {
            return None;
        }
        let deadline = Instant::now() + time_budget;
        let mut session = Session::new(&self.config);
        let ordinal = board.stone_count() as u32;

        let verdict = session.prove_before(board, player, Some(deadline));
        if let Verdict::Won(proof) = verdict {
            if let Some(first) = proof.sequence.as_ref().and_then(|s| s.first()) {
                return Some(BestMove {
                    coord: format_coord(first.pos),
                    row: first.pos.row,
                    col: first.pos.col,
                    player,
                    ordinal,
                    score: crate::eval::WIN_SCORE,
                    win_probability: 1.0,
                    depth: 0,
                    timed_out: false,
                    forced_sequence: proof
                        .sequence
                        .iter()
                        .flatten()
                        .map(|mv| format_coord(mv.pos))
                        .collect(),
                });
            }
        }

        // Depth 1 always completes, even with nothing left
        let limits = SearchLimits {
            max_depth: MAX_SEARCH_DEPTH,
            time_budget: Some(deadline.saturating_duration_since(Instant::now())),
            node_limit: None,
        };
        let outcome = session.searcher.find_best(board, player, &limits);
        if outcome.timed_out {
            log::debug!(
                "best-move search hit its {:?} budget at depth {}",
                time_budget,
                outcome.depth
            );
        }
        let pos = outcome.best_move?;
        Some(BestMove {
            coord: format_coord(pos),
            row: pos.row,
            col: pos.col,
            player,
            ordinal,
            score: outcome.score,
            win_probability: win_probability(outcome.score),
            depth: outcome.depth,
            timed_out: outcome.timed_out,
            forced_sequence: Vec::new(),
        })
    }
}

enum Verdict {
    Won(ForcedWinOutcome),
    Refuted,
    Inconclusive,
}

/// Per-request search state: one table, one set of proof caches.
struct Session {
    searcher: Searcher,
    limits: SearchLimits,
    vcf: Option<ForcedWinSearcher>,
    vct: Option<ForcedWinSearcher>,
}

impl Session {
    fn new(config: &EngineConfig) -> Self {
        let profile: TierProfile = config.profile;
        let searcher = Searcher::with_table(
            crate::search::SharedTranspositionTable::new(profile.tt_size_mb),
            Evaluator::new(profile.weights),
        );
        Self {
            searcher,
            limits: profile.search_limits(),
            vcf: profile.forced_win.map(ForcedWinSearcher::new),
            vct: profile.vct.map(ForcedWinSearcher::new),
        }
    }

    fn search(&self, board: &Board, player: Player) -> SearchOutcome {
        let outcome = self.searcher.find_best(board, player, &self.limits);
        if outcome.timed_out {
            log::warn!(
                "search for {:?} at move {} stopped at depth {} after {} nodes",
                player,
                board.stone_count() + 1,
                outcome.depth,
                outcome.nodes
            );
        }
        outcome
    }

    fn enabled(&self) -> bool {
        self.vcf.is_some() || self.vct.is_some()
    }

    /// VCF first, then VCT.
    fn prove(&mut self, board: &Board, attacker: Player) -> Verdict {
        self.prove_before(board, attacker, None)
    }

    /// [`Session::prove`] where each mode only gets the time left until
    /// `deadline`.
    fn prove_before(
        &mut self,
        board: &Board,
        attacker: Player,
        deadline: Option<Instant>,
    ) -> Verdict {
        let mut inconclusive = false;
        for searcher in [self.vcf.as_mut(), self.vct.as_mut()].into_iter().flatten() {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    inconclusive = true;
                    break;
                }
                searcher.set_time_budget(Some(remaining));
            }
            let outcome = searcher.prove(board, attacker);
            match outcome.result {
                ProofResult::Won => return Verdict::Won(outcome),
                ProofResult::Lost => {}
                ProofResult::Unknown => inconclusive = true,
            }
        }
        if inconclusive {
            Verdict::Inconclusive
        } else {
            Verdict::Refuted
        }
    }

    fn prove_any(&mut self, board: &Board, attacker: Player) -> Option<ForcedWinOutcome> {
        match self.prove(board, attacker) {
            Verdict::Won(outcome) => Some(outcome),
            _ => None,
        }
    }

    fn forced_win_first_move(&mut self, board: &Board, attacker: Player) -> Option<Pos> {
        self.prove_any(board, attacker)?
            .sequence?
            .first()
            .map(|mv| mv.pos)
    }

    /// Does `pos` keep `player`'s forced win alive under any enabled mode?
    fn keeps_win(&mut self, board: &Board, pos: Pos, player: Player) -> bool {
        [self.vcf.as_mut(), self.vct.as_mut()]
            .into_iter()
            .flatten()
            .any(|searcher| {
                let plies = searcher.config().max_plies;
                searcher.is_winning_move(board, pos, player, plies)
            })
    }

    fn forced_win_facts(
        &mut self,
        before: &Board,
        after: &Board,
        played: Move,
        best: Option<Pos>,
    ) -> Result<ForcedWinFacts, &'static str> {
        let mut facts = ForcedWinFacts::default();
        if !self.enabled() || before.winner().is_some() {
            return Ok(facts);
        }
        let mover = played.player;
        let mut unproven = false;

        match self.prove(before, mover) {
            Verdict::Won(win) => {
                facts.own_win_kept = win.sequence.as_ref().and_then(|s| s.first()).map(|m| m.pos)
                    == Some(played.pos)
                    || self.keeps_win(before, played.pos, mover);
                facts.own_win = Some(win.sequence.unwrap_or_default());
                return Ok(facts);
            }
            Verdict::Refuted => {}
            Verdict::Inconclusive => unproven = true,
        }

        let opponent = mover.opponent();
        if let Verdict::Won(threat) = self.prove(before, opponent) {
            let survives = matches!(self.prove(after, opponent), Verdict::Won(_));
            let best_stops = match best.filter(|&b| b != played.pos) {
                Some(b) if survives => {
                    let mut alt = before.clone();
                    match alt.place(b, mover) {
                        Ok(()) => !matches!(self.prove(&alt, opponent), Verdict::Won(_)),
                        Err(_) => false,
                    }
                }
                _ => false,
            };
            facts.opponent_win = Some(threat.sequence.unwrap_or_default());
            facts.opponent_win_survives = survives;
            facts.best_stops_opponent = best_stops;
        }

        if unproven && facts.opponent_win.is_none() {
            Err("forced-win search inconclusive, no guarantee found")
        } else {
            Ok(facts)
        }
    }
}

fn describe_mistake(kind: MistakeKind, suggested: Option<Pos>) -> String {
    let what = match kind {
        MistakeKind::Inaccuracy => "inaccuracy",
        MistakeKind::Blunder => "blunder",
        MistakeKind::MissedForcedWin => "missed a forced win",
        MistakeKind::IgnoredForcedLoss => "left the opponent's forced win in place",
    };
    match suggested {
        Some(pos) => format!("{what}; {} was stronger", format_coord(pos)),
        None => what.to_string(),
    }
}

fn describe_move(before: &Board, mv: Move, best: Option<Pos>) -> String {
    if before.winner().is_some() {
        return "played after the game was decided".to_string();
    }
    let detector = ThreatDetector::for_board(before);
    if detector.winning_cells(before, mv.player).contains(&mv.pos) {
        return "completes the line".to_string();
    }
    if detector.winning_cells(before, mv.player.opponent()).contains(&mv.pos) {
        return "blocks a four".to_string();
    }
    let made = detector.move_threats(before, mv.pos, mv.player).strongest();
    let best_note = if best == Some(mv.pos) { "best move" } else { "" };
    match (made, best_note.is_empty()) {
        (Some(kind), true) => format!("makes {} {}", article(kind.name()), kind.name()),
        (Some(kind), false) => format!("best move, makes {} {}", article(kind.name()), kind.name()),
        (None, false) => best_note.to_string(),
        (None, true) => "quiet move".to_string(),
    }
}

fn article(word: &str) -> &'static str {
    if word.starts_with(['a', 'e', 'i', 'o', 'u']) {
        "an"
    } else {
        "a"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MoveError;
    use crate::error::NotationError;

    fn basic() -> Analyzer {
        Analyzer::new(EngineConfig::new(15, 5, Tier::Basic).unwrap())
    }

    #[test]
    fn test_invalid_coordinate_reports_index() {
        let moves = MoveInput::alternating(["H8", "I9", "Z3"]);
        let err = basic().analyze(&moves).unwrap_err();
        assert_eq!(err.move_index(), Some(2));
        assert!(matches!(
            err,
            AnalysisError::InvalidMove {
                reason: InvalidMoveReason::Notation(NotationError::InvalidColumn(_) | NotationError::ColumnOutOfRange { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_occupied_cell_reports_index() {
        let moves = MoveInput::alternating(["H8", "I9", "J10", "H8"]);
        let err = basic().analyze(&moves).unwrap_err();
        assert_eq!(err.move_index(), Some(3));
        assert!(matches!(
            err,
            AnalysisError::InvalidMove {
                reason: InvalidMoveReason::Board(MoveError::CellOccupied(_)),
                ..
            }
        ));
    }

    #[test]
    fn test_row_out_of_range() {
        let moves = MoveInput::alternating(["A16"]);
        let err = basic().analyze(&moves).unwrap_err();
        assert_eq!(err.move_index(), Some(0));
    }

    #[test]
    fn test_empty_history() {
        let result = basic().analyze(&[]).unwrap();
        assert!(result.timeline.is_empty());
        assert_eq!(result.final_best_move.as_deref(), Some("H8"));
        assert_eq!(result.winner, None);
    }

    #[test]
    fn test_timeline_shape() {
        let moves = MoveInput::alternating(["H8", "I9", "H9", "I10"]);
        let result = basic().analyze(&moves).unwrap();
        assert_eq!(result.timeline.len(), 4);
        for (i, entry) in result.timeline.iter().enumerate() {
            assert_eq!(entry.ordinal as usize, i + 1);
            assert_eq!(
                entry.player,
                if i % 2 == 0 { Player::Black } else { Player::White }
            );
            assert!(entry.best_move.is_some());
            assert!(entry.depth >= 1);
            assert!((0.0..=1.0).contains(&entry.win_probability));
        }
        assert_eq!(result.timeline[2].coord, "H9");
        assert!(result.final_best_move.is_some());
    }

    #[test]
    fn test_score_after_matches_next_position() {
        let moves = MoveInput::alternating(["H8", "I9", "H9"]);
        let result = basic().analyze(&moves).unwrap();
        for pair in result.timeline.windows(2) {
            assert_eq!(pair[0].score_after, -pair[1].score_before);
        }
    }

    #[test]
    fn test_explicit_players() {
        let moves = vec![
            MoveInput {
                coord: "H8".into(),
                player: Some(Player::White),
            },
            MoveInput::new("A1"),
        ];
        let result = basic().analyze(&moves).unwrap();
        assert_eq!(result.timeline[0].player, Player::White);
        assert_eq!(result.timeline[1].player, Player::Black);
    }

    #[test]
    fn test_winning_move_recorded() {
        let moves = MoveInput::alternating(["D8", "A1", "E8", "A3", "F8", "A5", "G8", "A7", "H8"]);
        let result = basic().analyze(&moves).unwrap();
        assert_eq!(result.winner, Some(Player::Black));
        let last = result.timeline.last().unwrap();
        assert_eq!(last.category, MoveQuality::Excellent);
        assert_eq!(last.note, "completes the line");
        assert!(result.final_best_move.is_none());
    }

    #[test]
    fn test_best_move_on_empty_board() {
        let board = Board::standard();
        let best = basic()
            .best_move(&board, Player::Black, Duration::from_millis(200))
            .unwrap();
        assert_eq!(best.coord, "H8");
        assert_eq!(best.to_move(), Move::new(Pos::new(7, 7), Player::Black, 0));
    }

    #[test]
    fn test_best_move_none_when_decided() {
        let mut board = Board::standard();
        for c in 0..5 {
            board.place(Pos::new(0, c), Player::Black).unwrap();
        }
        assert!(basic()
            .best_move(&board, Player::White, Duration::from_millis(50))
            .is_none());
    }

    #[test]
    fn test_best_move_respects_budget_with_forced_win_search() {
        let analyzer = Analyzer::new(EngineConfig::new(15, 5, Tier::Deep).unwrap());
        let moves = MoveInput::alternating([
            "H8", "I9", "H10", "J8", "G9", "K7", "J10", "F9", "L6", "H7",
        ]);
        let board = analyzer.replay(&moves).unwrap();
        let budget = Duration::from_millis(20);

        let start = Instant::now();
        let best = analyzer.best_move(&board, Player::Black, budget).unwrap();
        let elapsed = start.elapsed();

        assert!(board.is_empty(best.to_move().pos));
        // Table setup and the unconditional first iteration are the only overrun
        assert!(elapsed < budget + Duration::from_millis(400), "took {elapsed:?}");
    }

    #[test]
    fn test_analyze_many_matches_sequential() {
        let analyzer = basic();
        let requests = vec![
            MoveInput::alternating(["H8", "I9"]),
            MoveInput::alternating(["A1", "Q1"]),
            MoveInput::alternating(["C3", "D4", "E5"]),
        ];
        let results = analyzer.analyze_many(&requests);
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());
        assert_eq!(
            results[0].as_ref().unwrap(),
            &analyzer.analyze(&requests[0]).unwrap()
        );
        assert_eq!(results[2].as_ref().unwrap().timeline.len(), 3);
    }
}
