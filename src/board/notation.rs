//! Letter-column + 1-based-row coordinates ("H8")
//!
//! Columns are consecutive letters starting at `A` (no letter is skipped);
//! row 1 is internal row 0. Out-of-range input is rejected, never clamped.
//!
//! ```
//! use gomoku::board::notation::{parse_coord, format_coord};
//! use gomoku::board::Pos;
//!
//! let pos = parse_coord("H8", 15).unwrap();
//! assert_eq!(pos, Pos::new(7, 7));
//! assert_eq!(format_coord(pos), "H8");
//! assert!(parse_coord("P1", 15).is_err());
//! ```

use super::{Pos, MAX_BOARD_SIZE};
use crate::error::NotationError;

/// Parse a coordinate such as `"H8"` or `"h8"` for a `size` x `size` board.
pub fn parse_coord(text: &str, size: usize) -> Result<Pos, NotationError> {
    let text = text.trim();
    let mut chars = text.chars();
    let letter = chars.next().ok_or(NotationError::Empty)?;
    if !letter.is_ascii_alphabetic() {
        return Err(NotationError::InvalidColumn(letter));
    }
    let column = letter.to_ascii_uppercase();
    let col = (column as u8 - b'A') as usize;
    if col >= size.min(MAX_BOARD_SIZE) {
        return Err(NotationError::ColumnOutOfRange { column, size });
    }

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NotationError::InvalidRow(digits.to_string()));
    }
    let row: usize = digits
        .parse()
        .map_err(|_| NotationError::InvalidRow(digits.to_string()))?;
    if row == 0 || row > size.min(MAX_BOARD_SIZE) {
        return Err(NotationError::RowOutOfRange { row, size });
    }

    Ok(Pos::new((row - 1) as u8, col as u8))
}

/// Format a position as letter column + 1-based row.
pub fn format_coord(pos: Pos) -> String {
    format!("{}{}", (b'A' + pos.col) as char, pos.row + 1)
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'A' + self.col) as char, self.row + 1)
    }
}
