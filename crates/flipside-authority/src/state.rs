//! The rules-and-bookkeeping half of a game, free of channels and tasks.
//!
//! The actor in `game.rs` owns one `GameState` and calls into it; every
//! method here is synchronous and either fully applies or changes
//! nothing.

use flipside_board::{Board, Move, Piece, Position, validate};
use flipside_protocol::{GameId, GameStatus, GameUpdate, LastMove};

use crate::{AuthorityError, GameView, MoveRecord};

#[derive(Debug, Clone)]
pub(crate) struct GameState {
    id: GameId,
    board: Board,
    turn: Piece,
    status: GameStatus,
    version: u64,
    last_move: Option<LastMove>,
    passed: Option<Piece>,
    log: Vec<MoveRecord>,
}

impl GameState {
    /// A fresh game: standard opening, Black to move, nobody seated.
    pub(crate) fn new(id: GameId) -> Self {
        Self::from_position(id, Board::initial(), Piece::Black)
    }

    pub(crate) fn from_position(id: GameId, board: Board, turn: Piece) -> Self {
        Self {
            id,
            board,
            turn,
            status: GameStatus::WaitingForPlayers,
            version: 0,
            last_move: None,
            passed: None,
            log: Vec::new(),
        }
    }

    pub(crate) fn status(&self) -> GameStatus {
        self.status
    }

    pub(crate) fn turn(&self) -> Piece {
        self.turn
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn board(&self) -> &Board {
        &self.board
    }

    pub(crate) fn log(&self) -> &[MoveRecord] {
        &self.log
    }

    /// Validates and applies `mover`'s placement at `at`.
    ///
    /// On success the board, turn, status and version all move together.
    /// On failure nothing changes.
    pub(crate) fn commit(
        &mut self,
        mover: Piece,
        at: Position,
    ) -> Result<(), AuthorityError> {
        if self.status.is_finished() {
            return Err(AuthorityError::GameFinished(self.id));
        }
        if mover != self.turn {
            return Err(AuthorityError::OutOfTurn);
        }
        let flips = validate(&self.board, mover, at)?;

        self.board = self.board.apply(Move { piece: mover, at }, &flips);

        let next = !mover;
        self.passed = None;
        if self.board.is_terminal() {
            self.status = GameStatus::Finished;
        } else if self.board.has_any_legal_move(next) {
            self.turn = next;
        } else {
            // Not terminal, so the mover still has a reply.
            self.passed = Some(next);
        }

        self.log.push(MoveRecord {
            piece: mover,
            at,
            flips: flips.clone(),
            passed: self.passed,
        });
        self.last_move = Some(LastMove {
            piece: mover,
            at,
            flips,
        });
        self.version += 1;
        Ok(())
    }

    /// Recomputes status from who is connected. Returns `true` (and bumps
    /// the version) if it changed. A finished game stays finished.
    pub(crate) fn set_presence(&mut self, both_connected: bool) -> bool {
        if self.status.is_finished() {
            return false;
        }
        let status = if both_connected {
            GameStatus::Active
        } else {
            GameStatus::WaitingForPlayers
        };
        if status == self.status {
            return false;
        }
        self.status = status;
        self.version += 1;
        true
    }

    pub(crate) fn update(&self) -> GameUpdate {
        GameUpdate {
            id: self.id,
            version: self.version,
            board: self.board.snapshot(),
            turn: self.turn,
            status: self.status,
            score: self.board.score(),
            last_move: self.last_move.clone(),
            passed: self.passed,
            winner: if self.status.is_finished() {
                self.board.winner()
            } else {
                None
            },
        }
    }

    pub(crate) fn view(&self) -> GameView {
        GameView {
            board: self.board.snapshot(),
            turn: self.turn,
            status: self.status,
            version: self.version,
        }
    }
}
