//! Pieces, cells, and board coordinates.

use std::fmt;
use std::ops::Not;

use serde::{Deserialize, Serialize};

use crate::BOARD_SIZE;

/// A stone color. Also the color a participant plays.
///
/// Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    Black,
    White,
}

/// `!piece` is the opponent's color.
impl Not for Piece {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => write!(f, "Black"),
            Self::White => write!(f, "White"),
        }
    }
}

/// The content of one square.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum Cell {
    #[default]
    Empty,
    Black,
    White,
}

impl Cell {
    /// Returns the piece on this cell, if any.
    pub fn piece(self) -> Option<Piece> {
        match self {
            Self::Empty => None,
            Self::Black => Some(Piece::Black),
            Self::White => Some(Piece::White),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The single-character form used by `Board`'s text representation.
    pub(crate) fn symbol(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Black => 'B',
            Self::White => 'W',
        }
    }

    pub(crate) fn from_symbol(ch: char) -> Option<Self> {
        match ch {
            '.' => Some(Self::Empty),
            'B' => Some(Self::Black),
            'W' => Some(Self::White),
            _ => None,
        }
    }
}

impl From<Piece> for Cell {
    fn from(piece: Piece) -> Self {
        match piece {
            Piece::Black => Self::Black,
            Piece::White => Self::White,
        }
    }
}

/// A `(row, col)` address on the board.
///
/// Coordinates arrive straight off the wire, so a `Position` may be out of
/// range. Board lookups return `None` or
/// [`MoveError::OutOfRange`](crate::MoveError::OutOfRange) rather than
/// panicking.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Returns `true` if both coordinates are in `[0, 8)`.
    pub fn in_bounds(self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// Steps one square in the given direction. `None` past the edge.
    pub(crate) fn step(self, (dr, dc): (i8, i8)) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        let next = Self { row, col };
        next.in_bounds().then_some(next)
    }

    /// Iterates all 64 positions in row-major order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..BOARD_SIZE as u8)
            .flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Self { row, col }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
