//! End-to-end scenarios through the public API

use gomoku::analysis::{Analyzer, MistakeKind, MoveInput, Severity};
use gomoku::board::notation::parse_coord;
use gomoku::board::{Board, Player, Pos};
use gomoku::config::{EngineConfig, Tier, TierProfile};
use gomoku::error::{AnalysisError, InvalidMoveReason, NotationError};
use gomoku::eval::{Evaluator, MoveQuality};
use gomoku::search::{
    prove_forced_win, ForcedWinConfig, ForcedWinSearcher, ProofResult, SearchLimits, Searcher,
};
use proptest::prelude::*;

/// Deep tier without a clock, so results do not depend on machine speed.
fn deep_untimed() -> Analyzer {
    let profile = TierProfile {
        max_depth: 3,
        time_budget_ms: None,
        node_limit: Some(60_000),
        ..TierProfile::deep()
    };
    Analyzer::new(EngineConfig::with_profile(15, 5, Tier::Deep, profile).unwrap())
}

fn basic_untimed() -> Analyzer {
    let profile = TierProfile {
        time_budget_ms: None,
        node_limit: Some(40_000),
        ..TierProfile::basic()
    };
    Analyzer::new(EngineConfig::with_profile(15, 5, Tier::Basic, profile).unwrap())
}

fn place_all(board: &mut Board, cells: &[(u8, u8)], player: Player) {
    for &(r, c) in cells {
        board.place(Pos::new(r, c), player).unwrap();
    }
}

#[test]
fn test_open_four_outranks_open_threes() {
    let evaluator = Evaluator::default();

    let mut four = Board::standard();
    place_all(&mut four, &[(7, 4), (7, 5), (7, 6), (7, 7)], Player::Black);

    let mut threes = Board::standard();
    place_all(
        &mut threes,
        &[(3, 3), (3, 4), (3, 5), (11, 3), (11, 4), (11, 5), (3, 12), (4, 12), (5, 12)],
        Player::Black,
    );

    let four_score = evaluator.evaluate(&four, Player::Black).score;
    let threes_score = evaluator.evaluate(&threes, Player::Black).score;
    assert!(four_score > threes_score, "{four_score} <= {threes_score}");
}

#[test]
fn test_open_four_proves_in_two_plies() {
    let mut board = Board::standard();
    place_all(&mut board, &[(7, 4), (7, 5), (7, 6), (7, 7)], Player::Black);
    place_all(&mut board, &[(0, 0), (0, 2), (0, 4), (0, 6)], Player::White);

    let outcome = prove_forced_win(&board, Player::Black, 2);
    assert_eq!(outcome.result, ProofResult::Won);
    let sequence = outcome.sequence.unwrap();
    assert_eq!(sequence.len(), 1);
    let completing = sequence[0];
    assert_eq!(completing.player, Player::Black);
    assert!([Pos::new(7, 3), Pos::new(7, 8)].contains(&completing.pos));

    let mut after = board.clone();
    after.apply(completing).unwrap();
    assert_eq!(after.winner(), Some(Player::Black));
}

#[test]
fn test_missed_forced_win_is_critical() {
    // White builds an open three on row 4 (F4 G4 H4); Black ignores it and
    // White then plays far away instead of making the open four.
    let moves = MoveInput::alternating(["H8", "F4", "K12", "G4", "C12", "H4", "M6", "A15"]);
    let result = deep_untimed().analyze(&moves).unwrap();

    let missed = result
        .mistakes
        .iter()
        .find(|m| m.ordinal == 8)
        .expect("move 8 flagged");
    assert_eq!(missed.player, Player::White);
    assert_eq!(missed.kind, MistakeKind::MissedForcedWin);
    assert_eq!(missed.severity, Severity::Critical);
    assert!(!missed.missed_sequence.is_empty());
    assert!(missed.suggested.is_some());
    assert_eq!(result.timeline[7].category, MoveQuality::Blunder);

    // Black's 7th move left the open three standing.
    let ignored = result
        .mistakes
        .iter()
        .find(|m| m.ordinal == 7)
        .expect("move 7 flagged");
    assert_eq!(ignored.player, Player::Black);
    assert_eq!(ignored.severity, Severity::Critical);
}

#[test]
fn test_analysis_is_idempotent() {
    let moves = MoveInput::alternating(["H8", "I9", "H9", "H10", "I8", "G8", "J8"]);
    for analyzer in [basic_untimed(), deep_untimed()] {
        let first = analyzer.analyze(&moves).unwrap();
        let second = analyzer.analyze(&moves).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_invalid_move_aborts_with_index() {
    let moves = MoveInput::alternating(["H8", "I9", "H9", "I9"]);
    let err = basic_untimed().analyze(&moves).unwrap_err();
    assert_eq!(err.move_index(), Some(3));

    let moves = MoveInput::alternating(["H8", "I0"]);
    let err = basic_untimed().analyze(&moves).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InvalidMove {
            index: 1,
            reason: InvalidMoveReason::Notation(NotationError::RowOutOfRange { row: 0, .. }),
            ..
        }
    ));
}

#[test]
fn test_starved_limits_still_return_a_result() {
    let profile = TierProfile {
        max_depth: 3,
        time_budget_ms: None,
        node_limit: Some(50),
        forced_win: Some(ForcedWinConfig {
            node_limit: Some(1),
            ..ForcedWinConfig::vcf(15)
        }),
        vct: None,
        ..TierProfile::deep()
    };
    let analyzer = Analyzer::new(EngineConfig::with_profile(15, 5, Tier::Deep, profile).unwrap());
    let moves = MoveInput::alternating(["H8", "I9", "J8", "H10", "G9", "K10", "I7", "F8"]);

    let result = analyzer.analyze(&moves).unwrap();
    assert_eq!(result.timeline.len(), moves.len());
    assert!(result.timeline.iter().any(|entry| entry.timed_out));
    assert!(result.notes.iter().any(|n| n.contains("stopped at depth")), "{:?}", result.notes);
    assert!(result.notes.iter().any(|n| n.contains("no guarantee found")), "{:?}", result.notes);
}

#[test]
fn test_notation_boundary() {
    assert_eq!(parse_coord("H8", 15), Ok(Pos::new(7, 7)));
    assert_eq!(parse_coord("a1", 15), Ok(Pos::new(0, 0)));
    assert_eq!(parse_coord("S19", 19), Ok(Pos::new(18, 18)));
    assert!(matches!(
        parse_coord("P1", 15),
        Err(NotationError::ColumnOutOfRange { column: 'P', .. })
    ));
    assert!(matches!(
        parse_coord("A16", 15),
        Err(NotationError::RowOutOfRange { row: 16, .. })
    ));
    assert!(parse_coord("", 15).is_err());
    assert!(parse_coord("8H", 15).is_err());
    assert!(parse_coord("H", 15).is_err());
}

#[test]
fn test_top_level_entry_points() {
    let moves = MoveInput::alternating(["H8", "I9"]);
    let result = gomoku::analyze(&moves, 15, 5, Tier::Basic).unwrap();
    assert_eq!(result.timeline.len(), 2);
    assert!(matches!(
        gomoku::analyze(&moves, 21, 5, Tier::Basic),
        Err(AnalysisError::Config(_))
    ));

    let mut board = Board::standard();
    place_all(&mut board, &[(7, 4), (7, 5), (7, 6), (7, 7)], Player::Black);
    let mv = gomoku::best_move(&board, Player::Black, std::time::Duration::from_millis(300)).unwrap();
    assert!([Pos::new(7, 3), Pos::new(7, 8)].contains(&mv.pos));
    assert_eq!(mv.ordinal, 4);
}

#[test]
fn test_small_board_short_win_length() {
    let analyzer = Analyzer::new(EngineConfig::new(7, 4, Tier::Basic).unwrap());
    let moves = MoveInput::alternating(["A1", "G7", "B1", "G6", "C1", "G5", "D1"]);
    let result = analyzer.analyze(&moves).unwrap();
    assert_eq!(result.winner, Some(Player::Black));
    assert_eq!(result.timeline.len(), 7);
}

/// Sparse positions on a 9x9 board with the side to move.
fn arb_position() -> impl Strategy<Value = Board> {
    prop::collection::vec((0u8..9, 0u8..9), 4..14).prop_filter_map("decided", |raw| {
        let mut board = Board::new(9, 5).ok()?;
        for (r, c) in raw {
            let pos = Pos::new(r, c);
            if board.is_empty(pos) {
                let player = board.side_to_move();
                board.place(pos, player).ok()?;
            }
        }
        board.winner().is_none().then_some(board)
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]

    /// A short proven VCF is also a forced win for full alpha-beta.
    #[test]
    fn prop_forced_win_agrees_with_search(board in arb_position()) {
        let player = board.side_to_move();
        let proof = prove_forced_win(&board, player, 5);
        if proof.result == ProofResult::Won {
            let line = proof.sequence.clone().unwrap_or_default();
            prop_assert!(!line.is_empty());
            let depth = line.len().clamp(1, 5) as u8;
            let searcher = Searcher::new(1);
            let outcome = searcher.find_best(&board, player, &SearchLimits::depth(depth));
            prop_assert!(outcome.is_decisive() && outcome.score > 0, "{:?} vs {:?}", proof, outcome);
        }
    }

    /// Every proven VCT line alternates, ends in a five, and full-width
    /// alpha-beta at depth 5 agrees the position is won.
    #[test]
    fn prop_vct_agrees_with_search(board in arb_position()) {
        let player = board.side_to_move();
        let proof = ForcedWinSearcher::new(ForcedWinConfig::vct(5)).prove(&board, player);
        if proof.result == ProofResult::Won {
            let line = proof.sequence.clone().unwrap_or_default();
            prop_assert!(!line.is_empty());

            let mut replay = board.clone();
            for (i, mv) in line.iter().enumerate() {
                let expected = if i % 2 == 0 { player } else { player.opponent() };
                prop_assert_eq!(mv.player, expected, "{:?}", line);
                prop_assert!(replay.apply(*mv).is_ok(), "{:?}", line);
            }
            prop_assert_eq!(replay.winner(), Some(player));

            let searcher = Searcher::new(1);
            let outcome = searcher.find_best(&board, player, &SearchLimits::depth(5));
            prop_assert!(outcome.is_decisive() && outcome.score > 0, "{:?} vs {:?}", proof, outcome);
        }
    }
}
