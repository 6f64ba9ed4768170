//! Identity and enumeration types shared by clients and the authority.
//!
//! Everything here is small, `Copy` where possible, and serializes to the
//! plainest JSON shape that still round-trips.

use std::fmt;
use std::str::FromStr;

use flipside_board::MoveError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over `u64` so a `PlayerId` can't be passed where some other
/// integer is expected. `#[serde(transparent)]` keeps the wire form as a
/// bare number: `PlayerId(42)` is `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for one game.
///
/// Game ids are minted by whoever creates the game (a lobby, an admin
/// tool, a test), so they are random UUIDs rather than counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

impl GameId {
    /// A fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = ProtocolError;

    /// Accepts the bare UUID or the `G-` prefixed display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("G-").unwrap_or(s);
        Uuid::parse_str(raw).map(GameId).map_err(|_| {
            ProtocolError::InvalidMessage(format!(
                "invalid game id {s:?} (expected a uuid)"
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a game as seen by both players.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "PascalCase")]
pub enum GameStatus {
    /// At least one participant is not connected.
    #[default]
    WaitingForPlayers,
    /// Both participants are connected and the board is still playable.
    Active,
    /// Neither side has a legal move. Terminal; nothing leaves this state.
    Finished,
}

impl GameStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, GameStatus::Finished)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::WaitingForPlayers => "waiting for players",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable reason carried by an `Error` message.
///
/// Every rejected request produces exactly one of these. The human
/// readable `message` next to it is for logs only; clients branch on the
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorCode {
    /// Missing, invalid, or mismatched token; or not a participant.
    Unauthorized,
    GameNotFound,
    /// The game is over; no more moves.
    GameFinished,
    CellOccupied,
    /// The placement would flip nothing.
    NoCaptures,
    OutOfTurn,
    OutOfRange,
    /// The frame did not decode into a known message.
    MalformedMessage,
    /// A valid message sent at the wrong point of the handshake.
    OutOfSequence,
    /// The authority could not serve the request (shutting down, overloaded).
    Unavailable,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<MoveError> for ErrorCode {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::OutOfRange(_) => ErrorCode::OutOfRange,
            MoveError::CellOccupied(_) => ErrorCode::CellOccupied,
            MoveError::NoCaptures(_) => ErrorCode::NoCaptures,
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way a message is allowed to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent by a client, handled by the authority.
    ToAuthority,
    /// Sent by the authority, handled by a client.
    ToClient,
    /// Legal both ways (only `Ack`).
    Either,
}

impl Direction {
    /// Whether a message tagged `self` may be sent by a client.
    pub fn accepts_from_client(self) -> bool {
        matches!(self, Direction::ToAuthority | Direction::Either)
    }

    /// Whether a message tagged `self` may be sent by the authority.
    pub fn accepts_from_authority(self) -> bool {
        matches!(self, Direction::ToClient | Direction::Either)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
