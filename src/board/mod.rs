//! Board representation for Gomoku

pub mod bitboard;
pub mod board;
pub mod notation;
pub mod zobrist;


use serde::{Deserialize, Serialize};

// Re-exports
pub use bitboard::Bitboard;
pub use board::{Board, FromMovesError};
pub use zobrist::ZobristTable;

/// Largest supported board dimension.
pub const MAX_BOARD_SIZE: usize = 19;
/// Smallest supported board dimension.
pub const MIN_BOARD_SIZE: usize = 5;
/// Default board dimension (15x15).
pub const DEFAULT_BOARD_SIZE: usize = 15;
/// Default number of stones in a row needed to win.
pub const DEFAULT_WIN_LENGTH: usize = 5;
/// Supported win lengths.
pub const MIN_WIN_LENGTH: usize = 4;
pub const MAX_WIN_LENGTH: usize = 6;

/// Cells addressable by a bitboard. Positions always use a fixed row stride
/// of `MAX_BOARD_SIZE`, whatever the dimension of the board in play.
pub const TOTAL_CELLS: usize = MAX_BOARD_SIZE * MAX_BOARD_SIZE; // 361

/// Direction vectors for line checking (4 directions)
pub const DIRECTIONS: [(i32, i32); 4] = [
    (0, 1),  // Horizontal
    (1, 0),  // Vertical
    (1, 1),  // Diagonal SE
    (1, -1), // Diagonal SW
];

/// One of the four line directions through a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Horizontal,
    Vertical,
    DiagonalDown,
    DiagonalUp,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagonalDown,
        Direction::DiagonalUp,
    ];

    /// (row, col) step for this direction.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        DIRECTIONS[self.index()]
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Horizontal => 0,
            Direction::Vertical => 1,
            Direction::DiagonalDown => 2,
            Direction::DiagonalUp => 3,
        }
    }
}

/// Player colors. Black moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Player {
    Black,
    White,
}

impl Player {
    /// Get opponent color
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Player::Black => 0,
            Player::White => 1,
        }
    }

    #[inline]
    pub fn stone(self) -> Stone {
        match self {
            Player::Black => Stone::Black,
            Player::White => Stone::White,
        }
    }
}

/// Cell contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stone {
    Empty,
    Black,
    White,
}

impl Stone {
    /// Owner of the stone, `None` for an empty cell.
    #[inline]
    pub fn player(self) -> Option<Player> {
        match self {
            Stone::Black => Some(Player::Black),
            Stone::White => Some(Player::White),
            Stone::Empty => None,
        }
    }
}

/// Position on the board (zero-based row and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: u8,
    pub col: u8,
}

impl Pos {
    #[inline]
    pub fn new(row: u8, col: u8) -> Self {
        debug_assert!(row < MAX_BOARD_SIZE as u8 && col < MAX_BOARD_SIZE as u8);
        Self { row, col }
    }

    #[inline]
    pub fn to_index(self) -> usize {
        self.row as usize * MAX_BOARD_SIZE + self.col as usize
    }

    #[inline]
    pub fn from_index(idx: usize) -> Self {
        Self {
            row: (idx / MAX_BOARD_SIZE) as u8,
            col: (idx % MAX_BOARD_SIZE) as u8,
        }
    }

    /// Step `n` cells along `(dr, dc)`, staying inside a `size` x `size` board.
    #[inline]
    pub fn offset(self, dr: i32, dc: i32, n: i32, size: usize) -> Option<Pos> {
        let r = i32::from(self.row) + dr * n;
        let c = i32::from(self.col) + dc * n;
        if Self::is_valid(r, c, size) {
            Some(Pos::new(r as u8, c as u8))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_valid(row: i32, col: i32, size: usize) -> bool {
        row >= 0 && row < size as i32 && col >= 0 && col < size as i32
    }

    /// Chebyshev distance between two cells.
    #[inline]
    pub fn distance(self, other: Pos) -> u8 {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }
}

impl PartialOrd for Pos {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_index().cmp(&other.to_index())
    }
}

/// A recorded move. Immutable once it is part of a board's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub pos: Pos,
    pub player: Player,
    /// Zero-based position of the move in the history.
    pub ordinal: u32,
}

impl Move {
    #[inline]
    pub fn new(pos: Pos, player: Player, ordinal: u32) -> Self {
        Self { pos, player, ordinal }
    }
}
