//! Alpha-Beta search with iterative deepening and transposition table
//!
//! Negamax with alpha-beta pruning over a private copy of the board, using
//! make/undo plus an incrementally updated [`ThreatTracker`] at every node.
//!
//! # Features
//!
//! - Iterative deepening; the result of the last *completed* depth is kept
//! - Transposition table injected as a shared handle
//! - Immediate win / forced block detection before any recursion
//! - Candidate moves within a radius of 2 around existing stones
//! - Deterministic move ordering and tie-breaking
//!
//! # Example
//!
//! ```
//! use gomoku::board::{Board, Player, Pos};
//! use gomoku::search::{SearchLimits, Searcher};
//!
//! let searcher = Searcher::new(4);
//! let mut board = Board::standard();
//! board.place(Pos::new(7, 7), Player::Black).unwrap();
//!
//! let result = searcher.find_best(&board, Player::White, &SearchLimits::depth(2));
//! assert!(result.best_move.is_some());
//! ```

use std::time::{Duration, Instant};

use crate::board::{Bitboard, Board, Player, Pos, MAX_BOARD_SIZE};
use crate::eval::heuristic::{is_mate_score, MATE_THRESHOLD};
use crate::eval::threats::{ThreatCounts, ThreatDetector, ThreatKind, ThreatTracker};
use crate::eval::{Evaluator, WIN_SCORE};

use super::tt::{EntryType, SharedTranspositionTable, TTStats};
use crate::board::ZobristTable;

/// Infinity score for alpha-beta bounds
const INF: i32 = WIN_SCORE + 1;

/// Deepest iteration the driver will attempt.
pub const MAX_SEARCH_DEPTH: u8 = 20;

/// Ply limit of the principal-variation table.
const MAX_PLY: usize = 64;

/// Maximum moves considered at the root.
const MAX_ROOT_MOVES: usize = 30;

/// Maximum moves considered at internal nodes.
const MAX_INTERNAL_MOVES: usize = 20;

/// Candidate cells lie within this Chebyshev distance of a stone.
const CANDIDATE_RADIUS: i32 = 2;

/// The clock is read once per this many nodes.
const TIME_CHECK_INTERVAL: u64 = 1024;

/// Search bounds. Whichever limit is hit first ends the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_depth: u8,
    pub time_budget: Option<Duration>,
    pub node_limit: Option<u64>,
}

impl SearchLimits {
    /// Fixed depth, no clock.
    pub fn depth(max_depth: u8) -> Self {
        Self {
            max_depth,
            time_budget: None,
            node_limit: None,
        }
    }

    /// Deepen until `budget` elapses.
    pub fn timed(budget: Duration) -> Self {
        Self {
            max_depth: MAX_SEARCH_DEPTH,
            time_budget: Some(budget),
            node_limit: None,
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::depth(4)
    }
}

/// Search statistics for diagnostics and tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Total beta cutoffs (fail-high)
    pub beta_cutoffs: u64,
    /// Beta cutoffs on the first move tried (measures move ordering quality)
    pub first_move_cutoffs: u64,
    /// Total TT probes
    pub tt_probes: u64,
    /// TT probes that returned a usable score
    pub tt_hits: u64,
}

impl SearchStats {
    /// First-move cutoff rate in percent
    pub fn first_move_rate(&self) -> f64 {
        if self.beta_cutoffs == 0 {
            0.0
        } else {
            self.first_move_cutoffs as f64 / self.beta_cutoffs as f64 * 100.0
        }
    }
}

/// Result of [`Searcher::find_best`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Best move found; `None` only for a decided or full board
    pub best_move: Option<Pos>,
    /// Score from the searching player's point of view
    pub score: i32,
    /// Principal variation, starting with `best_move`
    pub pv: Vec<Pos>,
    /// Depth of the last completed iteration
    pub depth: u8,
    /// Total nodes searched
    pub nodes: u64,
    /// A deeper iteration was cut off by the deadline or node limit
    pub timed_out: bool,
    pub stats: SearchStats,
}

impl SearchOutcome {
    fn terminal(score: i32) -> Self {
        Self {
            best_move: None,
            score,
            pv: Vec::new(),
            depth: 0,
            nodes: 0,
            timed_out: false,
            stats: SearchStats::default(),
        }
    }

    /// Does the score encode a forced result?
    pub fn is_decisive(&self) -> bool {
        is_mate_score(self.score)
    }
}

/// Alpha-beta searcher bound to a transposition table handle.
#[derive(Debug, Clone)]
pub struct Searcher {
    tt: SharedTranspositionTable,
    evaluator: Evaluator,
}

impl Searcher {
    /// Searcher with its own table of `tt_size_mb` megabytes.
    #[must_use]
    pub fn new(tt_size_mb: usize) -> Self {
        Self::with_table(SharedTranspositionTable::new(tt_size_mb), Evaluator::default())
    }

    /// Searcher using an existing table handle and evaluator.
    #[must_use]
    pub fn with_table(tt: SharedTranspositionTable, evaluator: Evaluator) -> Self {
        Self { tt, evaluator }
    }

    pub fn table(&self) -> &SharedTranspositionTable {
        &self.tt
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn tt_stats(&self) -> TTStats {
        self.tt.stats()
    }

    pub fn clear_tt(&self) {
        self.tt.clear();
    }

    /// Find the best move for `player` within `time_budget`.
    pub fn find_best_timed(&self, board: &Board, player: Player, time_budget: Duration) -> SearchOutcome {
        self.find_best(board, player, &SearchLimits::timed(time_budget))
    }

    /// Iterative-deepening search for `player` on `board`.
    pub fn find_best(&self, board: &Board, player: Player, limits: &SearchLimits) -> SearchOutcome {
        if let Some(winner) = board.winner() {
            let score = if winner == player { WIN_SCORE } else { -WIN_SCORE };
            return SearchOutcome::terminal(score);
        }
        if board.is_full() {
            return SearchOutcome::terminal(0);
        }
        if board.is_board_empty() {
            let mid = (board.size() / 2) as u8;
            let center = Pos::new(mid, mid);
            return SearchOutcome {
                best_move: Some(center),
                pv: vec![center],
                depth: 1,
                nodes: 1,
                ..SearchOutcome::terminal(0)
            };
        }

        let mut ctx = SearchContext::new(self, board, limits);
        ctx.iterate(player, limits.max_depth.clamp(1, MAX_SEARCH_DEPTH))
    }
}

/// Per-search state: private board, tracker, counters and the PV table.
struct SearchContext<'a> {
    tt: &'a SharedTranspositionTable,
    evaluator: &'a Evaluator,
    zobrist: &'static ZobristTable,
    board: Board,
    tracker: ThreatTracker,
    detector: ThreatDetector,
    nodes: u64,
    start: Instant,
    time_budget: Option<Duration>,
    node_limit: Option<u64>,
    /// Iteration 1 ignores limits so a move always exists
    enforce_limits: bool,
    stopped: bool,
    pv: Vec<Vec<Pos>>,
    stats: SearchStats,
}

impl<'a> SearchContext<'a> {
    fn new(searcher: &'a Searcher, board: &Board, limits: &SearchLimits) -> Self {
        let board = board.clone();
        let tracker = ThreatTracker::new(&board);
        Self {
            tt: &searcher.tt,
            evaluator: &searcher.evaluator,
            zobrist: ZobristTable::global(),
            detector: tracker.detector(),
            tracker,
            board,
            nodes: 0,
            start: Instant::now(),
            time_budget: limits.time_budget,
            node_limit: limits.node_limit,
            enforce_limits: false,
            stopped: false,
            pv: vec![Vec::new(); MAX_PLY + 1],
            stats: SearchStats::default(),
        }
    }

    /// Check limits. Node limit on every call, clock every
    /// `TIME_CHECK_INTERVAL` nodes.
    #[inline]
    fn should_stop(&mut self) -> bool {
        if !self.enforce_limits {
            return false;
        }
        if self.stopped {
            return true;
        }
        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            self.stopped = true;
        } else if self.nodes % TIME_CHECK_INTERVAL == 0 {
            if let Some(budget) = self.time_budget {
                if self.start.elapsed() >= budget {
                    self.stopped = true;
                }
            }
        }
        self.stopped
    }

    fn limits_exhausted(&self) -> bool {
        self.node_limit.is_some_and(|limit| self.nodes >= limit)
            || self.time_budget.is_some_and(|b| self.start.elapsed() >= b)
    }

    #[inline]
    fn hash(&self, player: Player) -> u64 {
        self.board.hash() ^ self.zobrist.side_key(player)
    }

    #[inline]
    fn make(&mut self, pos: Pos, player: Player) -> bool {
        if self.board.place(pos, player).is_err() {
            return false;
        }
        self.tracker.on_change(&self.board, pos);
        true
    }

    #[inline]
    fn unmake(&mut self) {
        if let Ok(mv) = self.board.undo() {
            self.tracker.on_change(&self.board, mv.pos);
        }
    }

    fn iterate(&mut self, player: Player, max_depth: u8) -> SearchOutcome {
        let opponent = player.opponent();
        let mut outcome = SearchOutcome::terminal(0);

        // Immediate win
        if let Some(&win) = self.tracker.winning_cells(&self.board, player).first() {
            outcome.best_move = Some(win);
            outcome.pv = vec![win];
            outcome.score = WIN_SCORE - 1;
            outcome.depth = 1;
            outcome.nodes = 1;
            return outcome;
        }

        let threats = self.tracker.winning_cells(&self.board, opponent);
        let mut root_moves = match threats.as_slice() {
            [] => self.ordered_moves(player, None, MAX_ROOT_MOVES),
            [block] => vec![*block],
            // Lost anyway: still block one
            [first, ..] => vec![*first],
        };

        for depth in 1..=max_depth {
            self.enforce_limits = depth > 1;
            if self.enforce_limits && self.limits_exhausted() {
                outcome.timed_out = true;
                break;
            }

            let Some((score, best)) = self.search_root(player, depth, &root_moves) else {
                outcome.timed_out = true;
                break;
            };

            outcome.best_move = Some(best);
            outcome.score = score;
            outcome.pv = self.pv[0].clone();
            outcome.depth = depth;
            log::debug!(
                "depth {} score {} best {} nodes {}",
                depth,
                score,
                best,
                self.nodes
            );

            // Search the previous best first next time
            if let Some(idx) = root_moves.iter().position(|&m| m == best) {
                let mv = root_moves.remove(idx);
                root_moves.insert(0, mv);
            }

            if is_mate_score(score) || (root_moves.len() == 1 && depth >= 2) {
                break;
            }
        }

        if outcome.timed_out {
            log::warn!(
                "search stopped after depth {} ({} nodes, {:?})",
                outcome.depth,
                self.nodes,
                self.start.elapsed()
            );
        }
        outcome.nodes = self.nodes;
        outcome.stats = self.stats.clone();
        outcome
    }

    /// One full-window pass over the root moves. `None` if interrupted.
    fn search_root(&mut self, player: Player, depth: u8, moves: &[Pos]) -> Option<(i32, Pos)> {
        let mut alpha = -INF;
        let beta = INF;
        let mut best: Option<(i32, Pos)> = None;
        self.pv[0].clear();

        for &mv in moves {
            if !self.make(mv, player) {
                continue;
            }
            let score = -self.negamax(player.opponent(), depth - 1, 1, -beta, -alpha);
            self.unmake();

            if self.stopped {
                return None;
            }
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, mv));
                self.update_pv(0, mv);
            }
            alpha = alpha.max(score);
        }

        if let Some((score, mv)) = best {
            self.tt.store(
                self.hash(player),
                depth,
                score_to_tt(score, 0),
                EntryType::Exact,
                Some(mv),
            );
        }
        best
    }

    fn update_pv(&mut self, ply: usize, mv: Pos) {
        let (head, tail) = self.pv.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line.clear();
        line.push(mv);
        if let Some(child) = tail.first() {
            line.extend_from_slice(child);
        }
    }

    fn negamax(&mut self, player: Player, depth: u8, ply: usize, mut alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;
        self.pv[ply].clear();
        if self.should_stop() {
            return 0;
        }

        let opponent = player.opponent();
        let ply_score = ply as i32;

        // The previous move completed a line
        if self.tracker.counts(opponent).get(ThreatKind::Five) > 0 {
            return -(WIN_SCORE - ply_score);
        }
        if self.board.is_full() {
            return 0;
        }

        // (1) transposition lookup
        let hash = self.hash(player);
        self.stats.tt_probes += 1;
        if let Some((score, _)) = self.tt.probe(hash, depth, alpha, beta) {
            self.stats.tt_hits += 1;
            return score_from_tt(score, ply);
        }

        // (2) immediate win / forced block
        if let Some(&win) = self.tracker.winning_cells(&self.board, player).first() {
            self.pv[ply].push(win);
            return WIN_SCORE - (ply_score + 1);
        }
        let threats = self.tracker.winning_cells(&self.board, opponent);
        if threats.len() >= 2 {
            return -(WIN_SCORE - (ply_score + 2));
        }

        if depth == 0 || ply >= MAX_PLY {
            return self.evaluator.score_counts(
                self.tracker.counts(player),
                self.tracker.counts(opponent),
            );
        }

        // (3) + (4) candidates in order
        let moves = match threats.first() {
            Some(&block) => vec![block],
            None => {
                let tt_move = self.tt.get_best_move(hash);
                self.ordered_moves(player, tt_move, MAX_INTERNAL_MOVES)
            }
        };
        if moves.is_empty() {
            return 0;
        }

        // (5) recurse
        let alpha_orig = alpha;
        let mut best_score = -INF;
        let mut best_move = None;
        for (i, &mv) in moves.iter().enumerate() {
            if !self.make(mv, player) {
                continue;
            }
            let score = -self.negamax(opponent, depth - 1, ply + 1, -beta, -alpha);
            self.unmake();

            if self.stopped {
                return 0;
            }
            if score > best_score {
                best_score = score;
                best_move = Some(mv);
                self.update_pv(ply, mv);
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                self.stats.beta_cutoffs += 1;
                if i == 0 {
                    self.stats.first_move_cutoffs += 1;
                }
                break;
            }
        }

        // (6) store the bound
        let entry_type = if best_score <= alpha_orig {
            EntryType::UpperBound
        } else if best_score >= beta {
            EntryType::LowerBound
        } else {
            EntryType::Exact
        };
        self.tt.store(hash, depth, score_to_tt(best_score, ply), entry_type, best_move);
        best_score
    }

    /// Empty cells within `CANDIDATE_RADIUS` of any stone, best first.
    fn ordered_moves(&self, player: Player, tt_move: Option<Pos>, limit: usize) -> Vec<Pos> {
        let mut scored: Vec<(i32, Pos)> = candidate_cells(&self.board)
            .iter_ones()
            .map(|pos| {
                let score = if Some(pos) == tt_move {
                    i32::MAX
                } else {
                    self.order_score(pos, player)
                };
                (score, pos)
            })
            .collect();
        // Score descending, then board order
        scored.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(limit);
        scored.into_iter().map(|(_, pos)| pos).collect()
    }

    /// Ordering key: own threats created, opponent threats blocked, adjacency.
    fn order_score(&self, pos: Pos, player: Player) -> i32 {
        let own = self.detector.move_threats(&self.board, pos, player);
        let theirs = self.detector.move_threats(&self.board, pos, player.opponent());
        let adjacency = adjacent_stones(&self.board, pos);
        attack_priority(&own) + defence_priority(&theirs) + adjacency * 10
    }
}

fn attack_priority(counts: &ThreatCounts) -> i32 {
    counts
        .iter()
        .map(|(kind, n)| {
            n as i32
                * match kind {
                    ThreatKind::Five => 100_000_000,
                    ThreatKind::OpenFour => 5_000_000,
                    ThreatKind::Four => 400_000,
                    ThreatKind::OpenThree | ThreatKind::BrokenThree => 100_000,
                    ThreatKind::Three => 5_000,
                    ThreatKind::OpenTwo => 1_000,
                    ThreatKind::Two => 100,
                }
        })
        .sum()
}

fn defence_priority(counts: &ThreatCounts) -> i32 {
    counts
        .iter()
        .map(|(kind, n)| {
            n as i32
                * match kind {
                    ThreatKind::Five => 50_000_000,
                    ThreatKind::OpenFour => 4_000_000,
                    ThreatKind::Four => 300_000,
                    ThreatKind::OpenThree | ThreatKind::BrokenThree => 80_000,
                    ThreatKind::Three => 4_000,
                    ThreatKind::OpenTwo => 800,
                    ThreatKind::Two => 80,
                }
        })
        .sum()
}

fn adjacent_stones(board: &Board, pos: Pos) -> i32 {
    let mut n = 0;
    for dr in -1..=1 {
        for dc in -1..=1 {
            if (dr, dc) == (0, 0) {
                continue;
            }
            if let Some(p) = pos.offset(dr, dc, 1, board.size()) {
                if !board.is_empty(p) {
                    n += 1;
                }
            }
        }
    }
    n
}

/// Empty cells near existing stones.
pub(crate) fn candidate_cells(board: &Board) -> Bitboard {
    let occupied = board.occupied();
    let size = board.size() as i32;
    let mut near = Bitboard::new();
    for stone in occupied.iter_ones() {
        let (r, c) = (i32::from(stone.row), i32::from(stone.col));
        for nr in (r - CANDIDATE_RADIUS).max(0)..=(r + CANDIDATE_RADIUS).min(size - 1) {
            for nc in (c - CANDIDATE_RADIUS).max(0)..=(c + CANDIDATE_RADIUS).min(size - 1) {
                debug_assert!((nr as usize) < MAX_BOARD_SIZE);
                near.set(Pos::new(nr as u8, nc as u8));
            }
        }
    }
    near & !occupied
}

/// Mate scores are stored relative to the node, not the root.
#[inline]
fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply as i32
    } else if score <= -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

#[inline]
fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply as i32
    } else if score <= -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(u8, u8, Player)]) -> Board {
        let mut board = Board::standard();
        for &(r, c, p) in stones {
            board.place(Pos::new(r, c), p).unwrap();
        }
        board
    }

    #[test]
    fn test_search_empty_board() {
        let result = Searcher::new(1).find_best(&Board::standard(), Player::Black, &SearchLimits::depth(3));
        assert_eq!(result.best_move, Some(Pos::new(7, 7)));
    }

    #[test]
    fn test_search_finds_winning_move() {
        let board = board_with(&[
            (7, 3, Player::Black),
            (7, 4, Player::Black),
            (7, 5, Player::Black),
            (7, 6, Player::Black),
            (8, 3, Player::White),
            (8, 4, Player::White),
            (8, 5, Player::White),
            (6, 2, Player::White),
            (7, 2, Player::White),
        ]);
        let result = Searcher::new(1).find_best(&board, Player::Black, &SearchLimits::depth(4));
        assert_eq!(result.best_move, Some(Pos::new(7, 7)));
        assert_eq!(result.score, WIN_SCORE - 1);
    }

    #[test]
    fn test_search_blocks_opponent_four() {
        let board = board_with(&[
            (3, 3, Player::White),
            (4, 4, Player::White),
            (5, 5, Player::White),
            (6, 6, Player::White),
            (2, 2, Player::Black),
            (10, 10, Player::Black),
            (10, 11, Player::Black),
        ]);
        let result = Searcher::new(1).find_best(&board, Player::Black, &SearchLimits::depth(3));
        assert_eq!(result.best_move, Some(Pos::new(7, 7)));
    }

    #[test]
    fn test_search_sees_open_four_loss() {
        let board = board_with(&[
            (7, 4, Player::White),
            (7, 5, Player::White),
            (7, 6, Player::White),
            (7, 7, Player::White),
            (0, 0, Player::Black),
            (0, 2, Player::Black),
            (0, 4, Player::Black),
        ]);
        let result = Searcher::new(1).find_best(&board, Player::Black, &SearchLimits::depth(3));
        assert!(result.best_move.is_some());
        assert!(result.score <= -MATE_THRESHOLD);
    }

    #[test]
    fn test_search_detects_existing_five() {
        let board = board_with(&[
            (0, 0, Player::White),
            (1, 1, Player::White),
            (2, 2, Player::White),
            (3, 3, Player::White),
            (4, 4, Player::White),
        ]);
        let result = Searcher::new(1).find_best(&board, Player::Black, &SearchLimits::depth(3));
        assert_eq!(result.best_move, None);
        assert_eq!(result.score, -WIN_SCORE);
    }

    #[test]
    fn test_candidate_radius() {
        let board = board_with(&[(0, 0, Player::Black)]);
        let cells = candidate_cells(&board);
        assert_eq!(cells.count(), 8);
        assert!(cells.get(Pos::new(2, 2)));
        assert!(!cells.get(Pos::new(3, 0)));
    }

    #[test]
    fn test_search_deterministic() {
        let board = board_with(&[
            (7, 7, Player::Black),
            (7, 8, Player::White),
            (8, 8, Player::Black),
            (6, 6, Player::White),
        ]);
        let limits = SearchLimits::depth(3);
        let a = Searcher::new(1).find_best(&board, Player::Black, &limits);
        let b = Searcher::new(1).find_best(&board, Player::Black, &limits);
        assert_eq!(a, b);
    }

    #[test]
    fn test_node_limit_keeps_completed_depth() {
        let board = board_with(&[
            (7, 7, Player::Black),
            (7, 8, Player::White),
            (8, 8, Player::Black),
        ]);
        let limits = SearchLimits {
            max_depth: 12,
            time_budget: None,
            node_limit: Some(2_000),
        };
        let result = Searcher::new(1).find_best(&board, Player::White, &limits);
        assert!(result.timed_out);
        assert!(result.depth >= 1);
        assert!(result.best_move.is_some());
        assert_eq!(result.pv.first().copied(), result.best_move);
    }

    #[test]
    fn test_zero_time_budget_still_answers() {
        let board = board_with(&[(7, 7, Player::Black)]);
        let result = Searcher::new(1).find_best_timed(&board, Player::White, Duration::ZERO);
        assert!(result.best_move.is_some());
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn test_mate_score_tt_adjustment() {
        let s = WIN_SCORE - 7;
        assert_eq!(score_from_tt(score_to_tt(s, 3), 3), s);
        assert_eq!(score_from_tt(score_to_tt(-s, 5), 5), -s);
        assert_eq!(score_to_tt(1234, 9), 1234);
    }
}
