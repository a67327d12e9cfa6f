//! Board structure with move history and incremental hashing

use super::bitboard::Bitboard;
use super::zobrist::ZobristTable;
use super::{
    Move, Player, Pos, Stone, DEFAULT_BOARD_SIZE, DEFAULT_WIN_LENGTH, DIRECTIONS, MAX_BOARD_SIZE,
    MAX_WIN_LENGTH, MIN_BOARD_SIZE, MIN_WIN_LENGTH,
};
use crate::error::{ConfigError, MoveError};

/// Game board.
///
/// Stones are only ever added by [`Board::apply`] and removed by
/// [`Board::undo`], so a search can backtrack exactly. The number of stones
/// on the board always equals the history length.
#[derive(Debug, Clone)]
pub struct Board {
    size: u8,
    win_length: u8,
    black: Bitboard,
    white: Bitboard,
    /// Stone-only Zobrist hash
    hash: u64,
    history: Vec<Move>,
}

impl Board {
    /// Create an empty `size` x `size` board where `win_length` in a row wins.
    pub fn new(size: usize, win_length: usize) -> Result<Self, ConfigError> {
        validate_dimensions(size, win_length)?;
        Ok(Self {
            size: size as u8,
            win_length: win_length as u8,
            black: Bitboard::new(),
            white: Bitboard::new(),
            hash: 0,
            history: Vec::with_capacity(size * size),
        })
    }

    /// Empty 15x15 board, five in a row.
    pub fn standard() -> Self {
        Self {
            size: DEFAULT_BOARD_SIZE as u8,
            win_length: DEFAULT_WIN_LENGTH as u8,
            black: Bitboard::new(),
            white: Bitboard::new(),
            hash: 0,
            history: Vec::with_capacity(DEFAULT_BOARD_SIZE * DEFAULT_BOARD_SIZE),
        }
    }

    /// Replay `moves` onto an empty board.
    ///
    /// On failure returns the zero-based index of the rejected move with the
    /// reason.
    pub fn from_moves(
        size: usize,
        win_length: usize,
        moves: &[(Pos, Player)],
    ) -> Result<Self, FromMovesError> {
        let mut board = Board::new(size, win_length)?;
        for (index, &(pos, player)) in moves.iter().enumerate() {
            board
                .place(pos, player)
                .map_err(|error| FromMovesError::Move { index, error })?;
        }
        Ok(board)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    #[inline]
    pub fn win_length(&self) -> usize {
        self.win_length as usize
    }

    /// Check that a signed coordinate lies on this board.
    #[inline]
    pub fn contains(&self, row: i32, col: i32) -> bool {
        Pos::is_valid(row, col, self.size())
    }

    /// Apply a move. Fails on an out-of-range coordinate or occupied cell;
    /// the board is left untouched in that case.
    pub fn apply(&mut self, mv: Move) -> Result<(), MoveError> {
        let (row, col) = (i32::from(mv.pos.row), i32::from(mv.pos.col));
        if !self.contains(row, col) {
            return Err(MoveError::OutOfBounds {
                row,
                col,
                size: self.size(),
            });
        }
        if !self.is_empty(mv.pos) {
            return Err(MoveError::CellOccupied(mv.pos));
        }

        match mv.player {
            Player::Black => self.black.set(mv.pos),
            Player::White => self.white.set(mv.pos),
        }
        self.hash ^= ZobristTable::global().stone_key(mv.pos, mv.player);
        self.history.push(mv);
        Ok(())
    }

    /// Place a stone for `player`, recording it with the next ordinal.
    pub fn place(&mut self, pos: Pos, player: Player) -> Result<(), MoveError> {
        let ordinal = self.history.len() as u32;
        self.apply(Move::new(pos, player, ordinal))
    }

    /// Take back the most recent move.
    pub fn undo(&mut self) -> Result<Move, MoveError> {
        let mv = self.history.pop().ok_or(MoveError::EmptyHistory)?;
        match mv.player {
            Player::Black => self.black.clear(mv.pos),
            Player::White => self.white.clear(mv.pos),
        }
        self.hash ^= ZobristTable::global().stone_key(mv.pos, mv.player);
        Ok(mv)
    }

    /// Get stone at position
    #[inline]
    pub fn stone_at(&self, pos: Pos) -> Stone {
        if self.black.get(pos) {
            Stone::Black
        } else if self.white.get(pos) {
            Stone::White
        } else {
            Stone::Empty
        }
    }

    /// Stone at signed coordinates; `None` off the board.
    #[inline]
    pub fn stone_at_rc(&self, row: i32, col: i32) -> Option<Stone> {
        if self.contains(row, col) {
            Some(self.stone_at(Pos::new(row as u8, col as u8)))
        } else {
            None
        }
    }

    /// Check if position is empty
    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        !self.black.get(pos) && !self.white.get(pos)
    }

    /// Occupancy set of one player.
    #[inline]
    pub fn occupancy(&self, player: Player) -> &Bitboard {
        match player {
            Player::Black => &self.black,
            Player::White => &self.white,
        }
    }

    /// Both players' stones.
    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.black | self.white
    }

    /// Iterate over the empty cells of the board.
    pub fn empty_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        let size = self.size();
        (0..size).flat_map(move |r| (0..size).map(move |c| Pos::new(r as u8, c as u8)))
            .filter(move |&p| self.is_empty(p))
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    #[inline]
    pub fn last_move(&self) -> Option<Move> {
        self.history.last().copied()
    }

    /// Total stones on board
    #[inline]
    pub fn stone_count(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_board_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.history.len() >= self.size() * self.size()
    }

    /// Side to move if players alternate from Black.
    #[inline]
    pub fn side_to_move(&self) -> Player {
        self.last_move()
            .map_or(Player::Black, |mv| mv.player.opponent())
    }

    /// Length of the contiguous run of `player` stones through `pos` along
    /// `(dr, dc)`, counting `pos` itself as one of them.
    pub fn run_length(&self, pos: Pos, dr: i32, dc: i32, player: Player) -> usize {
        let own = player.stone();
        let mut count = 1;
        for sign in [1, -1] {
            let mut n = 1;
            while let Some(p) = pos.offset(dr * sign, dc * sign, n, self.size()) {
                if self.stone_at(p) != own {
                    break;
                }
                count += 1;
                n += 1;
            }
        }
        count
    }

    /// Does the stone at `pos` belong to a completed line?
    pub fn is_five_at(&self, pos: Pos, player: Player) -> bool {
        self.stone_at(pos) == player.stone()
            && DIRECTIONS
                .iter()
                .any(|&(dr, dc)| self.run_length(pos, dr, dc, player) >= self.win_length())
    }

    /// Player holding a completed line, if any. Overlines count.
    pub fn winner(&self) -> Option<Player> {
        [Player::Black, Player::White].into_iter().find(|&player| {
            self.occupancy(player)
                .iter_ones()
                .any(|pos| self.is_five_at(pos, player))
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

/// Failure while replaying a move list.
#[derive(thiserror::Error, Debug)]
pub enum FromMovesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("move #{index}: {error}")]
    Move { index: usize, error: MoveError },
}

/// Validate a board dimension and win length pair.
pub fn validate_dimensions(size: usize, win_length: usize) -> Result<(), ConfigError> {
    if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
        return Err(ConfigError::BoardSize {
            size,
            min: MIN_BOARD_SIZE,
            max: MAX_BOARD_SIZE,
        });
    }
    if !(MIN_WIN_LENGTH..=MAX_WIN_LENGTH).contains(&win_length) || win_length > size {
        return Err(ConfigError::WinLength {
            win_length,
            size,
            min: MIN_WIN_LENGTH,
            max: MAX_WIN_LENGTH,
        });
    }
    Ok(())
}
