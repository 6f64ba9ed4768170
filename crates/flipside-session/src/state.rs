//! The per-connection state machine.
//!
//! ```text
//!   Disconnected ──connect──→ Identifying ──Identify ok──→ Joined(Waiting)
//!        ↑                         │                            │
//!        └──────Identify bad───────┘                          Join
//!                                                               ▼
//!                                  Joined(ActiveTurn) ⇄ Joined(WaitingTurn)
//!                                                               │
//!                  any state ──Leave / drop / game over──→ Terminated
//! ```
//!
//! The state only moves on *facts*: a token the authenticator accepted,
//! a seat the authority granted, an update the authority broadcast. The
//! request messages themselves are merely admitted or rejected.

use std::fmt;

use flipside_board::{Piece, Position};
use flipside_protocol::{Envelope, GameId, GameUpdate, Message, PlayerId};

use crate::SessionError;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Connected, waiting for `Identify`.
    Identifying,
    Joined(JoinedState),
    /// Final. Every further message is refused.
    Terminated,
}

/// Sub-state of [`ConnectionState::Joined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinedState {
    /// Identified, not yet seated in a game.
    Waiting,
    /// Seated and it is this connection's color to move.
    ActiveTurn,
    /// Seated and the opponent is to move.
    WaitingTurn,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Identifying => "identifying",
            ConnectionState::Joined(JoinedState::Waiting) => "waiting to join",
            ConnectionState::Joined(JoinedState::ActiveTurn) => "on turn",
            ConnectionState::Joined(JoinedState::WaitingTurn) => "waiting for turn",
            ConnectionState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// The game and color a connection is seated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seat {
    pub game: GameId,
    pub color: Piece,
}

/// An inbound message that passed the gate, in typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admitted {
    Identify { token: String },
    Join(GameId),
    Probe { seq: u64, at: Position },
    Place(Position),
    Leave,
    Ack,
}

/// One connection's view of the handshake and turn order.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSession {
    state: ConnectionState,
    player: Option<PlayerId>,
    token: Option<String>,
    seat: Option<Seat>,
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn player(&self) -> Option<PlayerId> {
        self.player
    }

    pub fn seat(&self) -> Option<Seat> {
        self.seat
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ConnectionState::Terminated
    }

    // -- transitions --------------------------------------------------------

    /// The transport is up. `Disconnected → Identifying`.
    pub fn connect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Identifying;
        }
    }

    /// The authenticator accepted `token`. `Identifying → Joined(Waiting)`.
    ///
    /// The token is bound to the connection; later frames that carry a
    /// different one are refused.
    pub fn identified(&mut self, player: PlayerId, token: impl Into<String>) {
        if self.state != ConnectionState::Identifying {
            tracing::warn!(state = %self.state, %player, "identified outside handshake");
            return;
        }
        self.player = Some(player);
        self.token = Some(token.into());
        self.state = ConnectionState::Joined(JoinedState::Waiting);
    }

    /// The authenticator refused the token. Back to `Disconnected`.
    pub fn auth_failed(&mut self) {
        if !self.is_terminated() {
            self.player = None;
            self.token = None;
            self.state = ConnectionState::Disconnected;
        }
    }

    /// The authority seated this connection. `Joined(Waiting)` → on or off
    /// turn, depending on whether `color` is the one to move.
    pub fn joined(&mut self, game: GameId, color: Piece, turn: Piece) {
        if self.state != ConnectionState::Joined(JoinedState::Waiting) {
            tracing::warn!(state = %self.state, %game, "seated outside handshake");
            return;
        }
        self.seat = Some(Seat { game, color });
        self.state = ConnectionState::Joined(turn_state(color, turn));
    }

    /// Follows an authoritative update for the seated game.
    ///
    /// Flips between ActiveTurn and WaitingTurn, and terminates once the
    /// game is finished. Updates for other games are ignored.
    pub fn observe_update(&mut self, update: &GameUpdate) {
        let Some(seat) = self.seat else { return };
        if seat.game != update.id {
            return;
        }
        match self.state {
            ConnectionState::Joined(JoinedState::ActiveTurn)
            | ConnectionState::Joined(JoinedState::WaitingTurn) => {
                self.state = if update.status.is_finished() {
                    ConnectionState::Terminated
                } else {
                    ConnectionState::Joined(turn_state(seat.color, update.turn))
                };
            }
            _ => {}
        }
    }

    /// Leave, drop, or shutdown. Returns `true` the first time only.
    pub fn disconnect(&mut self) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.state = ConnectionState::Terminated;
        true
    }

    // -- gating -------------------------------------------------------------

    /// Gates one inbound frame on the authority side.
    ///
    /// Checks direction, then the bound token, then the transition table.
    /// Nothing here changes state; the caller applies the fact that
    /// results (`identified`, `joined`, `disconnect`) once it has one.
    ///
    /// # Errors
    /// Any [`SessionError`]; the caller reports [`SessionError::code`] to
    /// the peer.
    pub fn admit(&self, envelope: &Envelope) -> Result<Admitted, SessionError> {
        let message = &envelope.message;
        if !message.direction().accepts_from_client() {
            return Err(SessionError::WrongDirection(message.name()));
        }
        if let (Some(bound), Some(sent)) = (&self.token, &envelope.token) {
            if bound != sent {
                return Err(SessionError::Unauthorized("token mismatch".into()));
            }
        }
        self.check(message)?;

        let admitted = match *message {
            Message::Identify => {
                let token = envelope
                    .token
                    .clone()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| SessionError::Unauthorized("missing token".into()))?;
                Admitted::Identify { token }
            }
            Message::Join { id } => Admitted::Join(id),
            Message::Probe { seq, row, col } => Admitted::Probe {
                seq,
                at: Position::new(row, col),
            },
            Message::Place { row, col } => Admitted::Place(Position::new(row, col)),
            Message::Leave => Admitted::Leave,
            // direction() already filtered the rest
            _ => Admitted::Ack,
        };
        Ok(admitted)
    }

    /// Applies the transition table to a client-originated message.
    ///
    /// Used directly by clients before sending, and by [`admit`] on the
    /// authority.
    ///
    /// [`admit`]: ConnectionSession::admit
    pub fn check(&self, message: &Message) -> Result<(), SessionError> {
        use ConnectionState as S;
        use JoinedState as J;

        let out_of_sequence = || SessionError::OutOfSequence {
            message: message.name(),
            state: self.state,
        };
        let unauthorized = || {
            SessionError::Unauthorized(format!("{} before Identify", message.name()))
        };

        match (self.state, message) {
            (S::Terminated, _) => Err(SessionError::Terminated),
            (_, Message::Leave | Message::Ack) => Ok(()),

            (S::Disconnected, _) => Err(unauthorized()),
            (S::Identifying, Message::Identify) => Ok(()),
            (S::Identifying, _) => Err(unauthorized()),

            (S::Joined(J::Waiting), Message::Join { .. }) => Ok(()),
            (S::Joined(J::ActiveTurn), Message::Probe { .. } | Message::Place { .. }) => Ok(()),
            (S::Joined(J::WaitingTurn), Message::Probe { .. }) => Ok(()),
            (S::Joined(J::WaitingTurn), Message::Place { .. }) => Err(SessionError::OutOfTurn),
            (S::Joined(_), _) => Err(out_of_sequence()),
        }
    }
}

fn turn_state(color: Piece, turn: Piece) -> JoinedState {
    if color == turn {
        JoinedState::ActiveTurn
    } else {
        JoinedState::WaitingTurn
    }
}
