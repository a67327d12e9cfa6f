//! Transposition table for caching search results
//!
//! The table stores search results indexed by position hash, enabling reuse
//! of previous results for positions reached through different move orders.
//! Entries are advisory: a miss, an eviction or a torn read only costs time.
//!
//! # Example
//!
//! ```
//! use gomoku::board::Pos;
//! use gomoku::search::{EntryType, SharedTranspositionTable};
//!
//! let tt = SharedTranspositionTable::new(1); // 1 MB
//!
//! let hash = 0x1234_5678_9ABC_DEF0;
//! tt.store(hash, 5, 100, EntryType::Exact, Some(Pos::new(7, 7)));
//!
//! assert_eq!(tt.probe(hash, 5, -1000, 1000), Some((100, Some(Pos::new(7, 7)))));
//! assert_eq!(tt.get_best_move(hash), Some(Pos::new(7, 7)));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::board::Pos;

/// Entry type for score interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Exact score - the search completed normally
    Exact,
    /// Lower bound - score >= stored value (beta cutoff)
    LowerBound,
    /// Upper bound - score <= stored value (alpha fail-low)
    UpperBound,
}

/// Decoded table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub depth: u8,
    pub score: i32,
    pub entry_type: EntryType,
    pub best_move: Option<Pos>,
}

/// Pack an entry into a u64.
///
/// Layout (53 bits used):
/// ```text
/// bits [0..7]   depth                                8 bits
/// bits [8..39]  score (i32, offset binary)          32 bits
/// bits [40..41] entry_type (0=Exact,1=LB,2=UB)       2 bits
/// bits [42]     has_move                             1 bit
/// bits [43..47] row (0-18)                           5 bits
/// bits [48..52] col (0-18)                           5 bits
/// ```
/// Offset binary keeps every packed entry non-zero, so an all-zero slot
/// always means "empty".
fn pack_entry(entry: TTEntry) -> u64 {
    let d = u64::from(entry.depth);
    let s = u64::from((entry.score as u32) ^ 0x8000_0000);
    let t = match entry.entry_type {
        EntryType::Exact => 0u64,
        EntryType::LowerBound => 1u64,
        EntryType::UpperBound => 2u64,
    };
    let (has_move, row, col) = match entry.best_move {
        Some(p) => (1u64, u64::from(p.row), u64::from(p.col)),
        None => (0, 0, 0),
    };
    d | (s << 8) | (t << 40) | (has_move << 42) | (row << 43) | (col << 48)
}

fn unpack_entry(data: u64) -> TTEntry {
    let depth = (data & 0xFF) as u8;
    let score = (((data >> 8) & 0xFFFF_FFFF) as u32 ^ 0x8000_0000) as i32;
    let entry_type = match (data >> 40) & 0x3 {
        0 => EntryType::Exact,
        1 => EntryType::LowerBound,
        _ => EntryType::UpperBound,
    };
    let best_move = if (data >> 42) & 1 != 0 {
        Some(Pos::new(((data >> 43) & 0x1F) as u8, ((data >> 48) & 0x1F) as u8))
    } else {
        None
    };
    TTEntry {
        depth,
        score,
        entry_type,
        best_move,
    }
}

/// Lock-free, fixed-size transposition table.
///
/// Each slot stores `(key, data)` with `key = hash ^ data`; a probe accepts
/// the slot only if `key ^ data == hash`. Torn reads from concurrent writers
/// fail that check and read as misses. All methods take `&self`.
pub struct TranspositionTable {
    keys: Vec<AtomicU64>,
    data: Vec<AtomicU64>,
    size: usize,
}

impl TranspositionTable {
    /// Create a table of roughly `size_mb` megabytes (at least 1024 slots).
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        // Each slot = 2 x AtomicU64 = 16 bytes
        let size = ((size_mb * 1024 * 1024) / 16).max(1024);
        Self {
            keys: (0..size).map(|_| AtomicU64::new(0)).collect(),
            data: (0..size).map(|_| AtomicU64::new(0)).collect(),
            size,
        }
    }

    #[inline]
    fn load(&self, hash: u64) -> Option<TTEntry> {
        let idx = (hash as usize) % self.size;
        let key = self.keys[idx].load(Ordering::Relaxed);
        let raw = self.data[idx].load(Ordering::Relaxed);
        if raw == 0 || key ^ raw != hash {
            return None;
        }
        Some(unpack_entry(raw))
    }

    /// Raw entry for `hash`, if present.
    #[must_use]
    pub fn entry(&self, hash: u64) -> Option<TTEntry> {
        self.load(hash)
    }

    /// Probe for a score usable at `depth` within `(alpha, beta)`.
    ///
    /// Returns `None` when the slot is empty, belongs to another position,
    /// is too shallow, or its bound does not cut.
    #[must_use]
    pub fn probe(&self, hash: u64, depth: u8, alpha: i32, beta: i32) -> Option<(i32, Option<Pos>)> {
        let entry = self.load(hash)?;
        if entry.depth < depth {
            return None;
        }
        match entry.entry_type {
            EntryType::Exact => Some((entry.score, entry.best_move)),
            EntryType::LowerBound if entry.score >= beta => Some((entry.score, entry.best_move)),
            EntryType::UpperBound if entry.score <= alpha => Some((entry.score, entry.best_move)),
            _ => None,
        }
    }

    /// Best move stored for `hash`, for move ordering.
    #[must_use]
    pub fn get_best_move(&self, hash: u64) -> Option<Pos> {
        self.load(hash).and_then(|e| e.best_move)
    }

    /// Store a result. Depth-preferred: an existing entry for another
    /// position is only replaced by a search at least as deep.
    pub fn store(&self, hash: u64, depth: u8, score: i32, entry_type: EntryType, best_move: Option<Pos>) {
        let idx = (hash as usize) % self.size;
        let existing = self.data[idx].load(Ordering::Relaxed);
        if existing != 0 {
            let existing_hash = self.keys[idx].load(Ordering::Relaxed) ^ existing;
            if existing_hash != hash && unpack_entry(existing).depth > depth {
                return;
            }
        }
        let packed = pack_entry(TTEntry {
            depth,
            score,
            entry_type,
            best_move,
        });
        self.data[idx].store(packed, Ordering::Relaxed);
        self.keys[idx].store(hash ^ packed, Ordering::Relaxed);
    }

    /// Clear all entries in the table.
    pub fn clear(&self) {
        for i in 0..self.size {
            self.keys[i].store(0, Ordering::Relaxed);
            self.data[i].store(0, Ordering::Relaxed);
        }
    }

    /// Get statistics about table usage.
    #[must_use]
    pub fn stats(&self) -> TTStats {
        let used = self
            .data
            .iter()
            .filter(|d| d.load(Ordering::Relaxed) != 0)
            .count();
        TTStats {
            size: self.size,
            used,
            usage_percent: (used as f64 / self.size as f64 * 100.0) as u8,
        }
    }
}

/// Statistics about transposition table usage.
#[derive(Debug, Clone, Copy)]
pub struct TTStats {
    /// Total number of slots in the table
    pub size: usize,
    /// Number of slots currently occupied
    pub used: usize,
    /// Percentage of table in use (0-100)
    pub usage_percent: u8,
}

/// Cloneable handle to a table shared between searches or worker threads.
#[derive(Clone)]
pub struct SharedTranspositionTable {
    inner: Arc<TranspositionTable>,
}

impl SharedTranspositionTable {
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        Self {
            inner: Arc::new(TranspositionTable::new(size_mb)),
        }
    }

    /// Do two handles refer to the same table?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::ops::Deref for SharedTranspositionTable {
    type Target = TranspositionTable;

    fn deref(&self) -> &TranspositionTable {
        &self.inner
    }
}

impl std::fmt::Debug for SharedTranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTranspositionTable")
            .field("size", &self.inner.size)
            .finish()
    }
}
