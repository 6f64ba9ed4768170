//! Error types for the board layer.

use crate::Position;

/// Reasons a placement is rejected by the move validator.
///
/// Every variant carries the target so the message sent back to the
/// player can say which cell was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The row or column is outside `[0, 8)`.
    #[error("cell {0} is out of range")]
    OutOfRange(Position),

    /// The target cell already holds a piece.
    #[error("cell {0} is occupied")]
    CellOccupied(Position),

    /// Placing here would not flank a single opposing piece.
    #[error("placing at {0} captures nothing")]
    NoCaptures(Position),
}

/// Errors from parsing a board from its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseBoardError {
    #[error("expected 8 rows, found {0}")]
    RowCount(usize),

    #[error("row {row} has {len} cells, expected 8")]
    RowLength { row: usize, len: usize },

    #[error("unexpected character {ch:?} in row {row}")]
    BadCell { row: usize, ch: char },
}
