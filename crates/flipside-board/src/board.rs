//! The board model: the authoritative [`Board`] and its read-only
//! [`BoardSnapshot`].
//!
//! Two types on purpose: only the authority ever holds a `Board`, and the
//! only thing that crosses the network is a `BoardSnapshot`. A snapshot has
//! no mutation API, so a client mirror cannot drift from the authority by
//! "helpfully" applying its own moves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validator::collect_flips;
use crate::{Cell, FlipSet, MoveError, ParseBoardError, Piece, Position, validate};

/// Width and height of the board. A standard Othello board is 8×8.
pub const BOARD_SIZE: usize = 8;

/// A placement: which color goes where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub piece: Piece,
    pub at: Position,
}

/// Stone counts for both colors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct Score {
    pub black: u8,
    pub white: u8,
}

impl Score {
    /// The color with more stones, or `None` on a tie.
    pub fn leader(&self) -> Option<Piece> {
        match self.black.cmp(&self.white) {
            std::cmp::Ordering::Greater => Some(Piece::Black),
            std::cmp::Ordering::Less => Some(Piece::White),
            std::cmp::Ordering::Equal => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The canonical 8×8 grid, indexed `[row][col]`.
///
/// `Board` is `Copy` (64 bytes), which keeps [`Board::apply`] a pure
/// function: it returns the next board and leaves `self` untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// A board with no pieces at all.
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// The standard Othello start position.
    ///
    /// ```text
    /// ........
    /// ........
    /// ........
    /// ...WB...
    /// ...BW...
    /// ........
    /// ........
    /// ........
    /// ```
    pub fn initial() -> Self {
        let mut board = Self::empty();
        board.put(Position::new(3, 3), Cell::White);
        board.put(Position::new(3, 4), Cell::Black);
        board.put(Position::new(4, 3), Cell::Black);
        board.put(Position::new(4, 4), Cell::White);
        board
    }

    /// Returns the cell at `(row, col)`.
    ///
    /// # Errors
    /// [`MoveError::OutOfRange`] if either coordinate is outside `[0, 8)`.
    pub fn cell_at(&self, row: u8, col: u8) -> Result<Cell, MoveError> {
        let pos = Position::new(row, col);
        self.get(pos).ok_or(MoveError::OutOfRange(pos))
    }

    /// Returns the cell at `pos`, or `None` if it is off the board.
    pub fn get(&self, pos: Position) -> Option<Cell> {
        pos.in_bounds()
            .then(|| self.cells[pos.row as usize][pos.col as usize])
    }

    /// Places the mover's piece and turns every flipped cell to its color.
    ///
    /// Does not validate; call [`validate`] first. Positions off the
    /// board are ignored.
    pub fn apply(&self, mv: Move, flips: &FlipSet) -> Self {
        let mut next = *self;
        let cell = Cell::from(mv.piece);
        next.put(mv.at, cell);
        for pos in flips {
            next.put(*pos, cell);
        }
        next
    }

    /// Computes the flips `color` would get at `pos`. Same as [`validate`].
    pub fn flips_for(
        &self,
        color: Piece,
        pos: Position,
    ) -> Result<FlipSet, MoveError> {
        validate(self, color, pos)
    }

    /// Every legal target for `color`, in row-major order.
    pub fn legal_moves(&self, color: Piece) -> Vec<Position> {
        Position::all()
            .filter(|&pos| self.is_legal(color, pos))
            .collect()
    }

    pub fn has_any_legal_move(&self, color: Piece) -> bool {
        Position::all().any(|pos| self.is_legal(color, pos))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|cell| !cell.is_empty())
    }

    /// The game is over when the board is full or neither color can move.
    pub fn is_terminal(&self) -> bool {
        self.is_full()
            || (!self.has_any_legal_move(Piece::Black)
                && !self.has_any_legal_move(Piece::White))
    }

    /// Number of stones of the given color.
    pub fn count(&self, piece: Piece) -> u8 {
        let target = Cell::from(piece);
        self.cells.iter().flatten().filter(|&&cell| cell == target).count()
            as u8
    }

    pub fn score(&self) -> Score {
        Score {
            black: self.count(Piece::Black),
            white: self.count(Piece::White),
        }
    }

    /// The color with more stones. Only meaningful once
    /// [`is_terminal`](Self::is_terminal) holds; `None` is a draw.
    pub fn winner(&self) -> Option<Piece> {
        self.score().leader()
    }

    /// An immutable copy suitable for sending to clients.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot { board: *self }
    }

    fn is_legal(&self, color: Piece, pos: Position) -> bool {
        self.get(pos) == Some(Cell::Empty)
            && !collect_flips(self, color, pos).is_empty()
    }

    fn put(&mut self, pos: Position, cell: Cell) {
        if pos.in_bounds() {
            self.cells[pos.row as usize][pos.col as usize] = cell;
        }
    }

    fn parse_rows<'a>(
        rows: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ParseBoardError> {
        let rows: Vec<&str> = rows.into_iter().collect();
        if rows.len() != BOARD_SIZE {
            return Err(ParseBoardError::RowCount(rows.len()));
        }

        let mut board = Self::empty();
        for (row, line) in rows.iter().enumerate() {
            let len = line.chars().count();
            if len != BOARD_SIZE {
                return Err(ParseBoardError::RowLength { row, len });
            }
            for (col, ch) in line.chars().enumerate() {
                let cell = Cell::from_symbol(ch)
                    .ok_or(ParseBoardError::BadCell { row, ch })?;
                board.cells[row][col] = cell;
            }
        }
        Ok(board)
    }

    fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

/// Eight lines of `.`, `B`, `W`.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board")?;
        fmt::Display::fmt(self, f)
    }
}

/// Parses the [`Display`](fmt::Display) form. Blank lines and surrounding
/// whitespace are ignored, which keeps indented test fixtures readable.
impl FromStr for Board {
    type Err = ParseBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_rows(s.lines().map(str::trim).filter(|l| !l.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// BoardSnapshot
// ---------------------------------------------------------------------------

/// A read-only copy of the board as received by clients.
///
/// On the wire it is eight row strings, e.g.
/// `["........", ..., "...WB...", "...BW...", ...]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct BoardSnapshot {
    board: Board,
}

impl BoardSnapshot {
    /// See [`Board::cell_at`].
    pub fn cell_at(&self, row: u8, col: u8) -> Result<Cell, MoveError> {
        self.board.cell_at(row, col)
    }

    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.board.get(pos)
    }

    pub fn score(&self) -> Score {
        self.board.score()
    }

    pub fn legal_moves(&self, color: Piece) -> Vec<Position> {
        self.board.legal_moves(color)
    }

    pub fn has_any_legal_move(&self, color: Piece) -> bool {
        self.board.has_any_legal_move(color)
    }

    pub fn is_terminal(&self) -> bool {
        self.board.is_terminal()
    }

    /// Computes the flips a hover at `pos` would produce, locally.
    ///
    /// Advisory only: the authority re-validates every commit against the
    /// canonical board.
    pub fn preview(
        &self,
        color: Piece,
        pos: Position,
    ) -> Result<FlipSet, MoveError> {
        validate(&self.board, color, pos)
    }
}

impl From<BoardSnapshot> for Vec<String> {
    fn from(snapshot: BoardSnapshot) -> Self {
        snapshot.board.rows()
    }
}

impl TryFrom<Vec<String>> for BoardSnapshot {
    type Error = ParseBoardError;

    fn try_from(rows: Vec<String>) -> Result<Self, Self::Error> {
        let board = Board::parse_rows(rows.iter().map(String::as_str))?;
        Ok(Self { board })
    }
}

impl fmt::Display for BoardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.board, f)
    }
}

impl fmt::Debug for BoardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BoardSnapshot")?;
        fmt::Display::fmt(&self.board, f)
    }
}
