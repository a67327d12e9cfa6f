//! Per-player occupancy sets packed into machine words

use std::ops::{BitAnd, BitOr, Not};

use super::{Pos, TOTAL_CELLS};

const WORDS: usize = (TOTAL_CELLS + 63) / 64;

/// Occupancy bitset covering every cell of the largest supported board.
/// 6 x u64 = 384 bits >= 361 cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Bitboard {
    bits: [u64; WORDS],
}

impl Bitboard {
    /// Create empty bitboard
    pub const fn new() -> Self {
        Self { bits: [0; WORDS] }
    }

    #[inline]
    fn locate(pos: Pos) -> (usize, u64) {
        let idx = pos.to_index();
        (idx / 64, 1u64 << (idx % 64))
    }

    #[inline]
    pub fn set(&mut self, pos: Pos) {
        let (word, mask) = Self::locate(pos);
        self.bits[word] |= mask;
    }

    #[inline]
    pub fn clear(&mut self, pos: Pos) {
        let (word, mask) = Self::locate(pos);
        self.bits[word] &= !mask;
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> bool {
        let (word, mask) = Self::locate(pos);
        self.bits[word] & mask != 0
    }

    /// Count total set bits (popcount)
    #[inline]
    pub fn count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Raw words, lowest cell index first.
    #[inline]
    pub fn words(&self) -> &[u64; WORDS] {
        &self.bits
    }

    /// Iterate over set positions in ascending index order
    pub fn iter_ones(&self) -> BitboardIter {
        BitboardIter {
            bits: self.bits,
            word_idx: 0,
            current_word: self.bits[0],
        }
    }
}

impl BitOr for Bitboard {
    type Output = Bitboard;

    fn bitor(mut self, rhs: Bitboard) -> Bitboard {
        for (a, b) in self.bits.iter_mut().zip(rhs.bits) {
            *a |= b;
        }
        self
    }
}

impl BitAnd for Bitboard {
    type Output = Bitboard;

    fn bitand(mut self, rhs: Bitboard) -> Bitboard {
        for (a, b) in self.bits.iter_mut().zip(rhs.bits) {
            *a &= b;
        }
        self
    }
}

impl Not for Bitboard {
    type Output = Bitboard;

    /// Complement restricted to addressable cells.
    fn not(mut self) -> Bitboard {
        for w in &mut self.bits {
            *w = !*w;
        }
        let spare = WORDS * 64 - TOTAL_CELLS;
        self.bits[WORDS - 1] &= u64::MAX >> spare;
        self
    }
}

/// Iterator over set bits in a Bitboard
pub struct BitboardIter {
    bits: [u64; WORDS],
    word_idx: usize,
    current_word: u64,
}

impl Iterator for BitboardIter {
    type Item = Pos;

    fn next(&mut self) -> Option<Self::Item> {
        while self.current_word == 0 {
            self.word_idx += 1;
            if self.word_idx >= WORDS {
                return None;
            }
            self.current_word = self.bits[self.word_idx];
        }

        let bit_pos = self.current_word.trailing_zeros() as usize;
        let idx = self.word_idx * 64 + bit_pos;
        self.current_word &= self.current_word - 1;

        if idx < TOTAL_CELLS {
            Some(Pos::from_index(idx))
        } else {
            None
        }
    }
}
