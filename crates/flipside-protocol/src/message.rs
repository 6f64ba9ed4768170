//! Messages and the envelope that carries them.
//!
//! A frame on the wire is `{ "op": u8, "t": token?, "d": Message }`.
//! [`Message`] is internally tagged by `type`, and `op` is a pure function
//! of that tag ([`OpCode`]). On decode the two must agree, otherwise the
//! frame is rejected as malformed.

use std::fmt;

use flipside_board::{BoardSnapshot, FlipSet, Piece, Position, Score};
use serde::{Deserialize, Serialize};

use crate::{Direction, ErrorCode, GameId, GameStatus, PlayerId, ProtocolError};

// ---------------------------------------------------------------------------
// OpCode
// ---------------------------------------------------------------------------

/// Numeric operation code, one per [`Message`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Ack = 1,
    Ready = 2,
    Join = 3,
    GameUpdate = 4,
    Preview = 5,
    Identify = 6,
    Probe = 7,
    Place = 8,
    Error = 9,
    Joined = 10,
    Leave = 11,
}

impl OpCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(op: u8) -> Option<Self> {
        let code = match op {
            1 => OpCode::Ack,
            2 => OpCode::Ready,
            3 => OpCode::Join,
            4 => OpCode::GameUpdate,
            5 => OpCode::Preview,
            6 => OpCode::Identify,
            7 => OpCode::Probe,
            8 => OpCode::Place,
            9 => OpCode::Error,
            10 => OpCode::Joined,
            11 => OpCode::Leave,
            _ => return None,
        };
        Some(code)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// The committed move that produced a [`GameUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub piece: Piece,
    pub at: Position,
    pub flips: FlipSet,
}

/// Full authoritative state, broadcast after every change.
///
/// `version` increases by one with every broadcast change: each committed
/// move and each status change (a player joining or leaving). Clients drop
/// any update whose version is not newer than the one they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub id: GameId,
    pub version: u64,
    pub board: BoardSnapshot,
    /// Whose move it is. Meaningless once `status` is `Finished`.
    pub turn: Piece,
    pub status: GameStatus,
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<LastMove>,
    /// Set when the side that should have moved next had no legal move
    /// and the turn came straight back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<Piece>,
    /// Only meaningful when finished; `None` there means a draw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Piece>,
}

/// Flips a hovered placement would produce. Never changes the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    /// Echo of the probe's `seq`.
    pub seq: u64,
    /// The board version the flips were computed against.
    pub version: u64,
    pub at: Position,
    pub flips: FlipSet,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Every message either side can send.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
/// `{ "type": "Place", "row": 2, "col": 3 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Generic acknowledgement.
    Ack,
    /// Identification accepted. Carries the resolved player.
    Ready { player: PlayerId },
    /// Take your seat in a game.
    Join { id: GameId },
    GameUpdate(GameUpdate),
    Preview(Preview),
    /// Present the envelope token for identification.
    Identify,
    /// Ask what a placement would flip, without committing.
    Probe { seq: u64, row: u8, col: u8 },
    /// Commit a placement.
    Place { row: u8, col: u8 },
    Error { code: ErrorCode, message: String },
    /// Seat confirmed: your color and whose turn it is.
    Joined { id: GameId, color: Piece, turn: Piece },
    Leave,
}

impl Message {
    /// Shorthand for an `Error` message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Message::Error {
            code,
            message: message.into(),
        }
    }

    pub fn op_code(&self) -> OpCode {
        match self {
            Message::Ack => OpCode::Ack,
            Message::Ready { .. } => OpCode::Ready,
            Message::Join { .. } => OpCode::Join,
            Message::GameUpdate(_) => OpCode::GameUpdate,
            Message::Preview(_) => OpCode::Preview,
            Message::Identify => OpCode::Identify,
            Message::Probe { .. } => OpCode::Probe,
            Message::Place { .. } => OpCode::Place,
            Message::Error { .. } => OpCode::Error,
            Message::Joined { .. } => OpCode::Joined,
            Message::Leave => OpCode::Leave,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Message::Ack => Direction::Either,
            Message::Identify
            | Message::Join { .. }
            | Message::Probe { .. }
            | Message::Place { .. }
            | Message::Leave => Direction::ToAuthority,
            Message::Ready { .. }
            | Message::Joined { .. }
            | Message::GameUpdate(_)
            | Message::Preview(_)
            | Message::Error { .. } => Direction::ToClient,
        }
    }

    /// The `type` tag, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Ack => "Ack",
            Message::Ready { .. } => "Ready",
            Message::Join { .. } => "Join",
            Message::GameUpdate(_) => "GameUpdate",
            Message::Preview(_) => "Preview",
            Message::Identify => "Identify",
            Message::Probe { .. } => "Probe",
            Message::Place { .. } => "Place",
            Message::Error { .. } => "Error",
            Message::Joined { .. } => "Joined",
            Message::Leave => "Leave",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Place { row, col } => write!(f, "Place({row}, {col})"),
            Message::Probe { seq, row, col } => {
                write!(f, "Probe#{seq}({row}, {col})")
            }
            Message::Error { code, .. } => write!(f, "Error({code})"),
            Message::GameUpdate(update) => {
                write!(f, "GameUpdate(v{})", update.version)
            }
            other => f.write_str(other.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One frame: a message plus the optional session token.
///
/// The op code is not stored; it is derived from `message` when encoding
/// and checked against it when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireEnvelope", try_from = "WireEnvelope")]
pub struct Envelope {
    pub token: Option<String>,
    pub message: Message,
}

impl Envelope {
    /// An envelope without a token.
    pub fn new(message: Message) -> Self {
        Self {
            token: None,
            message,
        }
    }

    /// Attaches a session token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn op(&self) -> OpCode {
        self.message.op_code()
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Envelope::new(message)
    }
}

/// The literal wire shape.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t: Option<String>,
    d: Message,
}

impl From<Envelope> for WireEnvelope {
    fn from(env: Envelope) -> Self {
        WireEnvelope {
            op: env.message.op_code().as_u8(),
            t: env.token,
            d: env.message,
        }
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = ProtocolError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let expected = wire.d.op_code();
        if OpCode::from_u8(wire.op) != Some(expected) {
            return Err(ProtocolError::InvalidMessage(format!(
                "op {} does not match {} (expected {})",
                wire.op,
                wire.d.name(),
                expected.as_u8()
            )));
        }
        Ok(Envelope {
            token: wire.t,
            message: wire.d,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
