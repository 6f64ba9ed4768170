//! The capture rule.
//!
//! A placement is legal only if, in at least one of the eight directions,
//! it closes a run of opposing pieces against one of the mover's own:
//!
//! ```text
//!   B W W W .      B plays at the dot
//!   B B B B B      every W on the ray flips
//! ```

use serde::{Deserialize, Serialize};

use crate::{Board, Cell, MoveError, Piece, Position};

/// The eight compass directions as `(d_row, d_col)`.
pub const DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// The cells a move would flip, in discovery order (by direction in
/// [`DIRECTIONS`] order, then outward along the ray).
///
/// Rays from one origin never overlap, so there are no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlipSet(Vec<Position>);

impl FlipSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.0.contains(&pos)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Position> {
        self.0
    }
}

impl<'a> IntoIterator for &'a FlipSet {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Position>> for FlipSet {
    fn from(positions: Vec<Position>) -> Self {
        Self(positions)
    }
}

/// Validates a placement by `mover` at `target` and returns the flips.
///
/// Checks run in a fixed order, so a single move has exactly one reason
/// to fail:
///
/// 1. [`MoveError::OutOfRange`] — the target is off the board.
/// 2. [`MoveError::CellOccupied`] — something is already there, whether
///    or not the move would otherwise capture.
/// 3. [`MoveError::NoCaptures`] — no ray closes on the mover's color.
///
/// Flips are computed for `mover` only. A square the opponent could take
/// is still rejected here if `mover` captures nothing from it.
pub fn validate(
    board: &Board,
    mover: Piece,
    target: Position,
) -> Result<FlipSet, MoveError> {
    match board.get(target) {
        None => return Err(MoveError::OutOfRange(target)),
        Some(Cell::Empty) => {}
        Some(_) => return Err(MoveError::CellOccupied(target)),
    }

    let flips = collect_flips(board, mover, target);
    if flips.is_empty() {
        return Err(MoveError::NoCaptures(target));
    }
    Ok(flips)
}

/// Walks all eight rays from `origin`. Does not look at `origin` itself.
pub(crate) fn collect_flips(
    board: &Board,
    mover: Piece,
    origin: Position,
) -> FlipSet {
    let own = Cell::from(mover);
    let opponent = Cell::from(!mover);
    let mut flips = Vec::new();

    for direction in DIRECTIONS {
        let mut run = Vec::new();
        let mut cursor = origin.step(direction);

        while let Some(pos) = cursor {
            match board.get(pos) {
                Some(cell) if cell == opponent => {
                    run.push(pos);
                    cursor = pos.step(direction);
                }
                Some(cell) if cell == own => {
                    flips.append(&mut run);
                    break;
                }
                _ => break,
            }
        }
    }

    FlipSet(flips)
}
