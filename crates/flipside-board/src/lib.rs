//! Othello rules for Flipside.
//!
//! This crate is the leaf of the workspace. It knows nothing about
//! networking or connections. It only knows the board:
//!
//! - **Values** ([`Piece`], [`Cell`], [`Position`]) — what sits on the grid
//!   and how cells are addressed.
//! - **Board model** ([`Board`], [`BoardSnapshot`]) — the mutable grid the
//!   authority owns, and the immutable copy clients receive.
//! - **Move validation** ([`validate`], [`FlipSet`]) — the capture rule.
//!
//! ```text
//! Authority → Board (mutable, validated writes)
//!     │
//!     └─ snapshot() → BoardSnapshot (read-only, on the wire)
//! ```

mod board;
mod error;
mod piece;
mod validator;

pub use board::{BOARD_SIZE, Board, BoardSnapshot, Move, Score};
pub use error::{MoveError, ParseBoardError};
pub use piece::{Cell, Piece, Position};
pub use validator::{DIRECTIONS, FlipSet, validate};
