//! Zobrist hashing for position identification
//!
//! Zobrist hashing allows O(1) incremental hash updates when placing/removing stones.
//! The board keeps a stone-only hash; searchers fold in the side to move with
//! [`ZobristTable::side_key`] so transpositions reached by different move
//! orders collide on purpose.
//!
//! # Example
//!
//! ```
//! use gomoku::board::{Board, Player, Pos, ZobristTable};
//!
//! let zt = ZobristTable::global();
//! let mut board = Board::standard();
//! let before = board.hash();
//!
//! let pos = Pos::new(7, 7);
//! board.place(pos, Player::Black).unwrap();
//!
//! assert_eq!(board.hash(), before ^ zt.stone_key(pos, Player::Black));
//! assert_eq!(board.hash(), zt.hash(&board));
//! ```

use std::sync::OnceLock;

use super::{Board, Player, Pos, TOTAL_CELLS};

/// Precomputed random keys for every (cell, player) pair.
pub struct ZobristTable {
    black: [u64; TOTAL_CELLS],
    white: [u64; TOTAL_CELLS],
    /// XORed in when white is to move
    white_to_move: u64,
}

static GLOBAL: OnceLock<ZobristTable> = OnceLock::new();

impl ZobristTable {
    /// Create a table with deterministic pseudo-random keys.
    ///
    /// Uses a linear congruential generator with a fixed seed so hashes are
    /// reproducible across runs.
    #[must_use]
    pub fn new() -> Self {
        // Constants from Knuth's MMIX LCG; the high bits are mixed down
        // because the low bits of an LCG have short periods.
        let mut seed: u64 = 0x1234_5678_9ABC_DEF0;
        let mut next_rand = || {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let mut z = seed;
            z ^= z >> 33;
            z = z.wrapping_mul(0xff51_afd7_ed55_8ccd);
            z ^ (z >> 33)
        };

        let mut black = [0u64; TOTAL_CELLS];
        let mut white = [0u64; TOTAL_CELLS];
        for i in 0..TOTAL_CELLS {
            black[i] = next_rand();
            white[i] = next_rand();
        }

        Self {
            black,
            white,
            white_to_move: next_rand(),
        }
    }

    /// Shared immutable key table.
    pub fn global() -> &'static ZobristTable {
        GLOBAL.get_or_init(ZobristTable::new)
    }

    /// Key for a single stone.
    #[inline]
    #[must_use]
    pub fn stone_key(&self, pos: Pos, player: Player) -> u64 {
        match player {
            Player::Black => self.black[pos.to_index()],
            Player::White => self.white[pos.to_index()],
        }
    }

    /// Component folded into a hash for the side to move.
    #[inline]
    #[must_use]
    pub fn side_key(&self, side_to_move: Player) -> u64 {
        match side_to_move {
            Player::Black => 0,
            Player::White => self.white_to_move,
        }
    }

    /// Full stone hash of a board, recomputed from scratch.
    #[must_use]
    pub fn hash(&self, board: &Board) -> u64 {
        let mut h = 0u64;
        for pos in board.occupancy(Player::Black).iter_ones() {
            h ^= self.black[pos.to_index()];
        }
        for pos in board.occupancy(Player::White).iter_ones() {
            h ^= self.white[pos.to_index()];
        }
        h
    }
}

impl Default for ZobristTable {
    fn default() -> Self {
        Self::new()
    }
}
