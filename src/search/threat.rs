//! VCF/VCT threat search for forced wins
//!
//! This module implements specialized threat-space search:
//! - VCF (Victory by Continuous Fours): every attacking move makes a four
//! - VCT (Victory by Continuous Threats): open and broken threes are allowed too
//!
//! The tree is an AND/OR tree. Attacker nodes are OR nodes (one winning
//! forcing move suffices), defender nodes are AND nodes (every legal defence
//! must fail). Each node carries a proof/disproof number pair:
//!
//! - `pn == 0`: proven win for the attacker
//! - `dn == 0`: disproven, no forcing line wins (or the defender wins first)
//! - otherwise unknown, usually because the ply budget ran out
//!
//! Defender replies are restricted to moves that are not immediately losing:
//! the completion cell after a four, and after a three every cell that
//! removes all open-four continuations plus every counter-four.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::board::{Board, Direction, Move, Player, Pos, ZobristTable};
use crate::eval::threats::{ThreatCounts, ThreatDetector, ThreatKind, ThreatTracker};

use super::alphabeta::candidate_cells;

/// Hard cap on the ply budget; keeps recursion depth bounded.
pub const MAX_PROOF_PLIES: u8 = 64;

const INF: u32 = u32::MAX;

/// Proof nodes between clock reads. Defender nodes after a three scan many
/// cells, so this is much tighter than the alpha-beta interval.
const TIME_CHECK_INTERVAL: u64 = 16;

/// Outcome class of a proof search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofResult {
    /// The attacker has a forced win
    Won,
    /// Every forcing line is refuted
    Lost,
    /// No verdict within the budget
    Unknown,
}

/// Forced-win search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcedWinConfig {
    /// Ply budget, attacker and defender moves both counted
    pub max_plies: u8,
    /// Search VCT (threes allowed) instead of plain VCF
    pub allow_threes: bool,
    pub node_limit: Option<u64>,
    pub time_budget_ms: Option<u64>,
}

impl ForcedWinConfig {
    /// Continuous fours only.
    pub fn vcf(max_plies: u8) -> Self {
        Self {
            max_plies,
            allow_threes: false,
            node_limit: Some(200_000),
            time_budget_ms: None,
        }
    }

    /// Fours and live threes.
    pub fn vct(max_plies: u8) -> Self {
        Self {
            max_plies,
            allow_threes: true,
            node_limit: Some(50_000),
            time_budget_ms: None,
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.max_plies == 0 || self.max_plies > MAX_PROOF_PLIES {
            return Err(crate::error::ConfigError::Plies {
                got: self.max_plies,
                max: MAX_PROOF_PLIES,
            });
        }
        Ok(())
    }
}

impl Default for ForcedWinConfig {
    fn default() -> Self {
        Self::vcf(15)
    }
}

/// Result of [`ForcedWinSearcher::prove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedWinOutcome {
    pub result: ProofResult,
    /// Winning line for `Won`, most promising partial line for `Unknown`
    pub sequence: Option<Vec<Move>>,
    pub nodes: u64,
    /// Stopped by the node limit or the clock
    pub timed_out: bool,
}

impl ForcedWinOutcome {
    pub fn is_won(&self) -> bool {
        self.result == ProofResult::Won
    }
}

/// Proven results only.
#[derive(Debug, Clone)]
struct CachedProof {
    won: bool,
    /// Budget the win was proven with; valid for any larger budget
    plies: u8,
    line: Vec<(Pos, Player)>,
}

/// Proof cache keyed by stone hash, attacker and search mode.
///
/// Separate from the alpha-beta table: entries record proven wins and
/// refutations, never heuristic bounds.
#[derive(Debug, Default, Clone)]
pub struct ProofCache {
    entries: HashMap<(u64, Player, bool), CachedProof>,
}

impl ProofCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone)]
struct Proof {
    pn: u32,
    dn: u32,
    line: Vec<(Pos, Player)>,
}

impl Proof {
    fn won(line: Vec<(Pos, Player)>) -> Self {
        Self { pn: 0, dn: INF, line }
    }

    fn refuted() -> Self {
        Self {
            pn: INF,
            dn: 0,
            line: Vec::new(),
        }
    }

    fn unknown(line: Vec<(Pos, Player)>) -> Self {
        Self { pn: 1, dn: 1, line }
    }
}

/// VCF/VCT prover with its own proof cache.
#[derive(Debug, Clone)]
pub struct ForcedWinSearcher {
    config: ForcedWinConfig,
    cache: ProofCache,
}

impl ForcedWinSearcher {
    pub fn new(config: ForcedWinConfig) -> Self {
        Self {
            config,
            cache: ProofCache::new(),
        }
    }

    pub fn config(&self) -> &ForcedWinConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProofCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Replace the wall-clock budget of later `prove` calls.
    pub fn set_time_budget(&mut self, budget: Option<Duration>) {
        self.config.time_budget_ms =
            budget.map(|b| u64::try_from(b.as_millis()).unwrap_or(u64::MAX));
    }

    /// Try to prove a forced win for `attacker`, who is to move.
    pub fn prove(&mut self, board: &Board, attacker: Player) -> ForcedWinOutcome {
        let max_plies = self.config.max_plies.clamp(1, MAX_PROOF_PLIES);
        if let Some(winner) = board.winner() {
            let result = if winner == attacker {
                ProofResult::Won
            } else {
                ProofResult::Lost
            };
            return ForcedWinOutcome {
                result,
                sequence: (result == ProofResult::Won).then(Vec::new),
                nodes: 0,
                timed_out: false,
            };
        }

        let mut ctx = ProofContext::new(board, &self.config, &mut self.cache);
        let mut budgets: Vec<u8> = (1..=max_plies).step_by(2).collect();
        if budgets.last() != Some(&max_plies) {
            budgets.push(max_plies);
        }

        let mut proof = Proof::unknown(Vec::new());
        let mut partial: Vec<(Pos, Player)> = Vec::new();
        for budget in budgets {
            proof = ctx.attack(attacker, budget);
            if !proof.line.is_empty() {
                partial = proof.line.clone();
            }
            if proof.pn == 0 || proof.dn == 0 || ctx.stopped {
                break;
            }
        }

        let result = if ctx.stopped && proof.pn != 0 {
            ProofResult::Unknown
        } else if proof.pn == 0 {
            ProofResult::Won
        } else if proof.dn == 0 {
            ProofResult::Lost
        } else {
            ProofResult::Unknown
        };

        let base = board.stone_count() as u32;
        let to_moves = |line: &[(Pos, Player)]| -> Vec<Move> {
            line.iter()
                .enumerate()
                .map(|(i, &(pos, player))| Move::new(pos, player, base + i as u32))
                .collect()
        };
        let sequence = match result {
            ProofResult::Won => Some(to_moves(&proof.line)),
            ProofResult::Unknown if !partial.is_empty() => Some(to_moves(&partial)),
            _ => None,
        };

        log::debug!(
            "{} proof for {:?}: {:?} in {} nodes",
            if self.config.allow_threes { "VCT" } else { "VCF" },
            attacker,
            result,
            ctx.nodes
        );

        ForcedWinOutcome {
            result,
            sequence,
            nodes: ctx.nodes,
            timed_out: ctx.stopped,
        }
    }

    /// Does playing `pos` keep a forced win for `player` within `plies`
    /// (the move itself included)?
    pub fn is_winning_move(&mut self, board: &Board, pos: Pos, player: Player, plies: u8) -> bool {
        let mut ctx = ProofContext::new(board, &self.config, &mut self.cache);
        if !ctx.make(pos, player) {
            return false;
        }
        if ctx.board.is_five_at(pos, player) {
            return true;
        }
        if plies <= 1 {
            return false;
        }
        ctx.defend(player, pos, plies.min(MAX_PROOF_PLIES) - 1).pn == 0
    }
}

/// Prove or refute a forced win for `player` (to move) within `max_plies`,
/// using a VCF search with default limits.
pub fn prove_forced_win(board: &Board, player: Player, max_plies: u8) -> ForcedWinOutcome {
    ForcedWinSearcher::new(ForcedWinConfig::vcf(max_plies)).prove(board, player)
}

/// Does `pos` keep a VCF win alive for `player` within `plies`?
pub fn is_winning_move(board: &Board, pos: Pos, player: Player, plies: u8) -> bool {
    ForcedWinSearcher::new(ForcedWinConfig::vcf(plies)).is_winning_move(board, pos, player, plies)
}

struct ProofContext<'a> {
    board: Board,
    tracker: ThreatTracker,
    detector: ThreatDetector,
    zobrist: &'static ZobristTable,
    cache: &'a mut ProofCache,
    allow_threes: bool,
    node_limit: Option<u64>,
    deadline: Option<Instant>,
    next_clock_check: u64,
    nodes: u64,
    stopped: bool,
}

impl<'a> ProofContext<'a> {
    fn new(board: &Board, config: &ForcedWinConfig, cache: &'a mut ProofCache) -> Self {
        let board = board.clone();
        let tracker = ThreatTracker::new(&board);
        Self {
            detector: tracker.detector(),
            tracker,
            board,
            zobrist: ZobristTable::global(),
            cache,
            allow_threes: config.allow_threes,
            node_limit: config.node_limit,
            deadline: config
                .time_budget_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            next_clock_check: 0,
            nodes: 0,
            stopped: false,
        }
    }

    #[inline]
    fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            self.stopped = true;
        } else if let Some(deadline) = self.deadline {
            if self.nodes >= self.next_clock_check {
                self.next_clock_check = self.nodes + TIME_CHECK_INTERVAL;
                self.stopped = Instant::now() >= deadline;
            }
        }
        self.stopped
    }

    fn make(&mut self, pos: Pos, player: Player) -> bool {
        if self.board.place(pos, player).is_err() {
            return false;
        }
        self.tracker.on_change(&self.board, pos);
        true
    }

    fn unmake(&mut self) {
        if let Ok(mv) = self.board.undo() {
            self.tracker.on_change(&self.board, mv.pos);
        }
    }

    fn cache_key(&self, attacker: Player) -> (u64, Player, bool) {
        (
            self.board.hash() ^ self.zobrist.side_key(attacker),
            attacker,
            self.allow_threes,
        )
    }

    /// OR node: `attacker` to move with `plies` left.
    fn attack(&mut self, attacker: Player, plies: u8) -> Proof {
        self.nodes += 1;
        if plies == 0 || self.should_stop() {
            return Proof::unknown(Vec::new());
        }
        let defender = attacker.opponent();

        if let Some(&win) = self.tracker.winning_cells(&self.board, attacker).first() {
            return Proof::won(vec![(win, attacker)]);
        }
        let threats = self.tracker.winning_cells(&self.board, defender);
        if threats.len() >= 2 {
            return Proof::refuted();
        }

        let key = self.cache_key(attacker);
        if let Some(hit) = self.cache.entries.get(&key) {
            if !hit.won {
                return Proof::refuted();
            }
            if hit.plies <= plies {
                return Proof::won(hit.line.clone());
            }
        }

        let moves = match threats.first() {
            // Must block; the block has to keep the initiative
            Some(&block) if self.is_forcing(block, attacker) => vec![block],
            Some(_) => Vec::new(),
            None => self.forcing_moves(attacker),
        };

        let mut proof = Proof {
            pn: INF,
            dn: 0,
            line: Vec::new(),
        };
        for mv in moves {
            if !self.make(mv, attacker) {
                continue;
            }
            let child = self.defend(attacker, mv, plies - 1);
            self.unmake();

            if child.pn == 0 {
                let mut line = vec![(mv, attacker)];
                line.extend(child.line);
                self.cache.entries.insert(
                    key,
                    CachedProof {
                        won: true,
                        plies,
                        line: line.clone(),
                    },
                );
                return Proof::won(line);
            }
            proof.dn = proof.dn.saturating_add(child.dn);
            if child.pn < proof.pn {
                proof.pn = child.pn;
                proof.line = std::iter::once((mv, attacker)).chain(child.line).collect();
            }
            if self.stopped {
                return Proof::unknown(proof.line);
            }
        }

        if proof.dn == 0 {
            self.cache.entries.insert(
                key,
                CachedProof {
                    won: false,
                    plies,
                    line: Vec::new(),
                },
            );
        }
        proof
    }

    /// AND node: `attacker` just played `last`; defender to move.
    fn defend(&mut self, attacker: Player, last: Pos, plies: u8) -> Proof {
        self.nodes += 1;
        let defender = attacker.opponent();

        if !self.tracker.winning_cells(&self.board, defender).is_empty() {
            return Proof::refuted();
        }
        let wins = self.tracker.winning_cells(&self.board, attacker);
        if let [first, second, ..] = wins.as_slice() {
            return Proof::won(vec![(*first, defender), (*second, attacker)]);
        }
        if plies == 0 || self.should_stop() {
            return Proof::unknown(Vec::new());
        }

        let replies = match wins.first() {
            Some(&block) => vec![block],
            None => {
                // Only a live three keeps the initiative here
                if !self.allow_threes || self.open_four_makers(attacker, last).is_empty() {
                    return Proof::refuted();
                }
                let replies = self.three_defences(attacker, last);
                if replies.is_empty() {
                    return Proof::won(self.unstoppable_three_line(attacker, last));
                }
                replies
            }
        };

        let mut pn: u32 = 0;
        let mut dn: u32 = INF;
        let mut won_line: Option<Vec<(Pos, Player)>> = None;
        let mut open_line: Option<Vec<(Pos, Player)>> = None;
        for reply in replies {
            if !self.make(reply, defender) {
                continue;
            }
            let child = self.attack(attacker, plies - 1);
            self.unmake();

            if child.dn == 0 && !self.stopped {
                return Proof::refuted();
            }
            pn = pn.saturating_add(child.pn);
            dn = dn.min(child.dn);
            let line = || -> Vec<(Pos, Player)> {
                std::iter::once((reply, defender)).chain(child.line.iter().copied()).collect()
            };
            if child.pn == 0 {
                won_line.get_or_insert_with(line);
            } else {
                open_line.get_or_insert_with(line);
            }
            if self.stopped {
                return Proof::unknown(open_line.unwrap_or_default());
            }
        }

        if pn == 0 {
            Proof::won(won_line.unwrap_or_default())
        } else {
            Proof {
                pn,
                dn,
                line: open_line.unwrap_or_default(),
            }
        }
    }

    fn move_threats(&self, pos: Pos, player: Player) -> ThreatCounts {
        self.detector.move_threats(&self.board, pos, player)
    }

    fn is_forcing(&self, pos: Pos, attacker: Player) -> bool {
        let mt = self.move_threats(pos, attacker);
        makes_four(&mt) || (self.allow_threes && makes_live_three(&mt))
    }

    /// Attacker moves that make a four (and live threes in VCT), strongest
    /// first, then board order.
    fn forcing_moves(&self, attacker: Player) -> Vec<Pos> {
        let mut scored: Vec<(u8, Pos)> = candidate_cells(&self.board)
            .iter_ones()
            .filter_map(|pos| {
                let mt = self.move_threats(pos, attacker);
                let fours = mt.get(ThreatKind::Four) + mt.get(ThreatKind::OpenFour);
                let threes = mt.get(ThreatKind::OpenThree) + mt.get(ThreatKind::BrokenThree);
                let priority = if mt.get(ThreatKind::OpenFour) > 0 || fours >= 2 {
                    5
                } else if fours == 1 && threes > 0 {
                    4
                } else if fours == 1 {
                    3
                } else if !self.allow_threes {
                    return None;
                } else if threes >= 2 {
                    2
                } else if threes == 1 {
                    1
                } else {
                    return None;
                };
                Some((priority, pos))
            })
            .collect();
        scored.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, pos)| pos).collect()
    }

    /// Empty cells on the four lines through `center` within `dist`.
    fn line_cells(&self, center: Pos, dist: i32) -> Vec<Pos> {
        let size = self.board.size();
        let mut cells = Vec::new();
        for direction in Direction::ALL {
            let (dr, dc) = direction.delta();
            for n in (-dist..=dist).filter(|&n| n != 0) {
                if let Some(p) = center.offset(dr, dc, n, size) {
                    if self.board.is_empty(p) {
                        cells.push(p);
                    }
                }
            }
        }
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Cells near `last` where `attacker` would make an open four or a
    /// double four.
    fn open_four_makers(&self, attacker: Player, last: Pos) -> Vec<Pos> {
        let k = self.board.win_length() as i32;
        self.line_cells(last, k)
            .into_iter()
            .filter(|&p| {
                let mt = self.move_threats(p, attacker);
                mt.get(ThreatKind::OpenFour) > 0
                    || mt.get(ThreatKind::Four) + mt.get(ThreatKind::OpenFour) >= 2
            })
            .collect()
    }

    /// Defender replies to a three: cells that leave no open-four maker
    /// near `last`, plus every counter-four. Blocks are looked for around
    /// `last` and on the lines through each current maker.
    fn three_defences(&mut self, attacker: Player, last: Pos) -> Vec<Pos> {
        let defender = attacker.opponent();
        let k = self.board.win_length() as i32;
        let mut blocks = self.line_cells(last, 2 * k - 1);
        for maker in self.open_four_makers(attacker, last) {
            blocks.push(maker);
            blocks.extend(self.line_cells(maker, k));
        }
        blocks.sort_unstable();
        blocks.dedup();

        let mut replies = Vec::new();
        for cell in blocks {
            if !self.make(cell, defender) {
                continue;
            }
            if self.open_four_makers(attacker, last).is_empty() {
                replies.push(cell);
            }
            self.unmake();
        }

        for cell in candidate_cells(&self.board).iter_ones() {
            if makes_four(&self.move_threats(cell, defender)) {
                replies.push(cell);
            }
        }

        replies.sort_unstable();
        replies.dedup();
        replies
    }

    /// Winning line once no reply stops the three: a defender move, the
    /// open four, the block and the five.
    fn unstoppable_three_line(&mut self, attacker: Player, last: Pos) -> Vec<(Pos, Player)> {
        let defender = attacker.opponent();
        let k = self.board.win_length() as i32;
        let mut cells = self.line_cells(last, k);
        cells.extend(candidate_cells(&self.board).iter_ones());
        let Some(reply) = cells
            .into_iter()
            .find(|&p| !makes_four(&self.move_threats(p, defender)))
        else {
            return Vec::new();
        };
        if !self.make(reply, defender) {
            return Vec::new();
        }

        let mut line = vec![(reply, defender)];
        if let Some(&four) = self.open_four_makers(attacker, last).first() {
            if self.make(four, attacker) {
                line.push((four, attacker));
                let wins = self.tracker.winning_cells(&self.board, attacker);
                if let [block, win, ..] = wins.as_slice() {
                    line.push((*block, defender));
                    line.push((*win, attacker));
                }
                self.unmake();
            }
        }
        self.unmake();
        line
    }
}

#[inline]
fn makes_four(mt: &ThreatCounts) -> bool {
    mt.get(ThreatKind::Four) + mt.get(ThreatKind::OpenFour) + mt.get(ThreatKind::Five) > 0
}

#[inline]
fn makes_live_three(mt: &ThreatCounts) -> bool {
    mt.get(ThreatKind::OpenThree) + mt.get(ThreatKind::BrokenThree) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_board(stones: &[(u8, u8, Player)]) -> Board {
        let mut board = Board::standard();
        for &(r, c, p) in stones {
            board.place(Pos::new(r, c), p).unwrap();
        }
        board
    }

    #[test]
    fn test_open_four_won_in_one() {
        let board = setup_board(&[
            (7, 4, Player::Black),
            (7, 5, Player::Black),
            (7, 6, Player::Black),
            (7, 7, Player::Black),
        ]);
        let outcome = prove_forced_win(&board, Player::Black, 2);
        assert_eq!(outcome.result, ProofResult::Won);
        let seq = outcome.sequence.unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].pos, Pos::new(7, 3));
        assert_eq!(seq[0].player, Player::Black);
        assert_eq!(seq[0].ordinal, 4);
    }

    #[test]
    fn test_vcf_two_fours() {
        // Two closed threes sharing (7, 7): four, forced block, double four
        let board = setup_board(&[
            (7, 4, Player::Black),
            (7, 5, Player::Black),
            (7, 6, Player::Black),
            (7, 3, Player::White),
            (4, 7, Player::Black),
            (5, 7, Player::Black),
            (6, 7, Player::Black),
            (3, 7, Player::White),
        ]);
        let outcome = prove_forced_win(&board, Player::Black, 5);
        assert_eq!(outcome.result, ProofResult::Won);
        let seq = outcome.sequence.unwrap();
        assert_eq!(seq[0].player, Player::Black);
        assert!(seq.iter().zip(seq.iter().skip(1)).all(|(a, b)| a.player != b.player));
    }

    #[test]
    fn test_vcf_not_found_is_lost() {
        let board = setup_board(&[(7, 7, Player::Black), (7, 8, Player::White)]);
        let outcome = prove_forced_win(&board, Player::Black, 9);
        assert_eq!(outcome.result, ProofResult::Lost);
        assert!(outcome.sequence.is_none());
    }

    /// Four, forced block, then a double four: five plies to the five.
    fn three_step_board() -> Board {
        setup_board(&[
            (7, 3, Player::Black),
            (7, 4, Player::Black),
            (7, 5, Player::Black),
            (7, 2, Player::White),
            (5, 6, Player::Black),
            (6, 6, Player::Black),
            (4, 6, Player::White),
            (8, 3, Player::Black),
            (8, 4, Player::Black),
            (8, 5, Player::Black),
            (8, 2, Player::White),
        ])
    }

    #[test]
    fn test_vcf_needs_preliminary_four() {
        let outcome = prove_forced_win(&three_step_board(), Player::Black, 3);
        assert_eq!(outcome.result, ProofResult::Won);
        let seq = outcome.sequence.unwrap();
        assert_eq!(seq.len(), 5);
        assert_eq!(seq[1].player, Player::White);
        assert_eq!(seq[0].ordinal, 11);
    }

    #[test]
    fn test_budget_exhausted_is_unknown() {
        let outcome = prove_forced_win(&three_step_board(), Player::Black, 1);
        assert_eq!(outcome.result, ProofResult::Unknown);
        assert!(!outcome.timed_out);
    }

    #[test]
    fn test_node_limit_is_unknown() {
        let config = ForcedWinConfig {
            node_limit: Some(1),
            ..ForcedWinConfig::vcf(9)
        };
        let outcome = ForcedWinSearcher::new(config).prove(&three_step_board(), Player::Black);
        assert_eq!(outcome.result, ProofResult::Unknown);
        assert!(outcome.timed_out);
    }

    #[test]
    fn test_opponent_double_threat_is_lost() {
        let board = setup_board(&[
            (7, 4, Player::White),
            (7, 5, Player::White),
            (7, 6, Player::White),
            (7, 7, Player::White),
            (0, 0, Player::Black),
            (0, 1, Player::Black),
            (0, 2, Player::Black),
        ]);
        let outcome = prove_forced_win(&board, Player::Black, 9);
        assert_eq!(outcome.result, ProofResult::Lost);
    }

    #[test]
    fn test_existing_five_is_terminal() {
        let board = setup_board(&[
            (0, 0, Player::White),
            (1, 0, Player::White),
            (2, 0, Player::White),
            (3, 0, Player::White),
            (4, 0, Player::White),
        ]);
        assert_eq!(prove_forced_win(&board, Player::White, 3).result, ProofResult::Won);
        assert_eq!(prove_forced_win(&board, Player::Black, 3).result, ProofResult::Lost);
    }

    #[test]
    fn test_vct_double_three() {
        // Crossing twos: (7, 8) makes two live threes, no fours anywhere
        let board = setup_board(&[
            (7, 5, Player::Black),
            (7, 6, Player::Black),
            (5, 8, Player::Black),
            (6, 8, Player::Black),
            (0, 0, Player::White),
            (14, 14, Player::White),
        ]);
        assert_eq!(prove_forced_win(&board, Player::Black, 9).result, ProofResult::Lost);

        let mut vct = ForcedWinSearcher::new(ForcedWinConfig::vct(7));
        let outcome = vct.prove(&board, Player::Black);
        assert_eq!(outcome.result, ProofResult::Won);
        assert_eq!(outcome.sequence.unwrap()[0].pos, Pos::new(7, 8));
    }

    #[test]
    fn test_unstoppable_three_line_alternates() {
        // Black's (1, 2) makes a live three on row 1 and a split three on
        // column 2; White has no four to answer with.
        let mut board = Board::new(9, 5).unwrap();
        let cells = [
            (1, 1), (3, 0), (2, 2), (3, 1), (4, 2), (0, 0),
            (1, 3), (0, 1), (2, 1), (2, 3), (2, 0), (0, 5),
        ];
        for (i, &(r, c)) in cells.iter().enumerate() {
            let player = if i % 2 == 0 { Player::Black } else { Player::White };
            board.place(Pos::new(r, c), player).unwrap();
        }

        let outcome = ForcedWinSearcher::new(ForcedWinConfig::vct(5)).prove(&board, Player::Black);
        assert_eq!(outcome.result, ProofResult::Won);
        let sequence = outcome.sequence.unwrap();
        assert!(sequence.len() >= 3);

        let mut replay = board.clone();
        for (i, mv) in sequence.iter().enumerate() {
            let expected = if i % 2 == 0 { Player::Black } else { Player::White };
            assert_eq!(mv.player, expected, "ply {i} of {sequence:?}");
            assert_eq!(mv.ordinal, 12 + i as u32);
            replay.apply(*mv).unwrap();
        }
        assert_eq!(replay.winner(), Some(Player::Black));
    }

    #[test]
    fn test_proof_cache_reused() {
        let board = setup_board(&[
            (7, 4, Player::Black),
            (7, 5, Player::Black),
            (7, 6, Player::Black),
            (7, 3, Player::White),
            (4, 7, Player::Black),
            (5, 7, Player::Black),
            (6, 7, Player::Black),
            (3, 7, Player::White),
        ]);
        let mut searcher = ForcedWinSearcher::new(ForcedWinConfig::vcf(7));
        let first = searcher.prove(&board, Player::Black);
        assert!(!searcher.cache().is_empty());
        let second = searcher.prove(&board, Player::Black);
        assert_eq!(first.result, second.result);
        assert_eq!(first.sequence, second.sequence);
        assert!(second.nodes <= first.nodes);
    }

    #[test]
    fn test_is_winning_move() {
        let board = setup_board(&[
            (7, 4, Player::Black),
            (7, 5, Player::Black),
            (7, 6, Player::Black),
        ]);
        // Open four
        assert!(is_winning_move(&board, Pos::new(7, 7), Player::Black, 3));
        assert!(!is_winning_move(&board, Pos::new(0, 0), Player::Black, 3));
    }

    #[test]
    fn test_board_untouched_after_search() {
        let board = setup_board(&[
            (7, 4, Player::Black),
            (7, 5, Player::Black),
            (7, 6, Player::Black),
            (7, 3, Player::White),
        ]);
        let hash = board.hash();
        let _ = prove_forced_win(&board, Player::Black, 9);
        assert_eq!(board.hash(), hash);
        assert_eq!(board.stone_count(), 4);
    }

    #[test]
    fn test_config_validation() {
        assert!(ForcedWinConfig::vcf(0).validate().is_err());
        assert!(ForcedWinConfig::vcf(65).validate().is_err());
        assert!(ForcedWinConfig::vct(9).validate().is_ok());
    }
}
