//! An async client for a Flipside server.
//!
//! [`GameClient`] owns one WebSocket connection plus the client-side
//! [`ConnectionSession`] and [`Mirror`]. Outgoing intents are checked
//! against the session before they are sent; incoming messages feed both,
//! and anything stale is dropped before the caller sees it.

use flipside_board::{FlipSet, Piece, Position};
use flipside_protocol::{
    Codec, Envelope, ErrorCode, GameId, GameUpdate, JsonCodec, Message, PlayerId,
    Preview,
};
use flipside_session::{ConnectionSession, Mirror, Reconcile};
use flipside_transport::{Connection, WebSocketConnection};

use crate::FlipsideError;

/// Something the server told us that the UI should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Identify succeeded.
    Ready(PlayerId),
    /// Seated in a game.
    Joined {
        game: GameId,
        color: Piece,
        turn: Piece,
    },
    /// Our placement was committed. The matching update follows.
    Accepted,
    /// A newer authoritative game state. Already applied to the mirror.
    Update(GameUpdate),
    /// The answer to our latest probe. Already applied to the mirror.
    Preview(Preview),
    Error { code: ErrorCode, message: String },
    /// The server closed the connection.
    Closed,
}

/// A connected player.
///
/// # Example
///
/// ```rust,no_run
/// use flipside::prelude::*;
///
/// # async fn play(game: GameId) -> Result<(), FlipsideError> {
/// let mut client = GameClient::connect("127.0.0.1:8080", "alpha").await?;
/// client.identify().await?;
/// client.join(game).await?;
/// loop {
///     match client.next_event().await? {
///         ClientEvent::Update(update) => println!("{:?}", update.score),
///         ClientEvent::Closed => break,
///         _ => {}
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct GameClient {
    conn: WebSocketConnection,
    codec: JsonCodec,
    token: String,
    session: ConnectionSession,
    mirror: Mirror,
    closed: bool,
}

impl GameClient {
    /// Opens a connection to `addr` (`host:port`). Nothing is sent yet.
    pub async fn connect(
        addr: &str,
        token: impl Into<String>,
    ) -> Result<Self, FlipsideError> {
        let conn = WebSocketConnection::connect(addr).await?;
        let mut session = ConnectionSession::new();
        session.connect();
        Ok(Self {
            conn,
            codec: JsonCodec,
            token: token.into(),
            session,
            mirror: Mirror::new(),
            closed: false,
        })
    }

    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub async fn identify(&mut self) -> Result<(), FlipsideError> {
        self.send(Message::Identify).await
    }

    pub async fn join(&mut self, game: GameId) -> Result<(), FlipsideError> {
        self.send(Message::Join { id: game }).await
    }

    /// Asks the authority for the flips at `at`. Returns the probe's
    /// sequence number; only the answer to the latest probe is kept.
    pub async fn hover(&mut self, at: Position) -> Result<u64, FlipsideError> {
        let (seq, probe) = self.mirror.begin_probe(at);
        if let Err(e) = self.session.check(&probe) {
            self.mirror.cancel_probe(seq);
            return Err(e.into());
        }
        self.send_unchecked(probe).await?;
        Ok(seq)
    }

    /// Flips at `at` computed from the mirrored board, with no round trip.
    pub fn preview_local(&mut self, at: Position) -> Option<&FlipSet> {
        self.mirror.preview_local(at)
    }

    /// Requests a placement. Fails locally with `OutOfTurn` while the
    /// opponent is to move.
    pub async fn place(&mut self, at: Position) -> Result<(), FlipsideError> {
        self.send(Message::Place {
            row: at.row,
            col: at.col,
        })
        .await
    }

    /// Says goodbye and closes the connection.
    pub async fn leave(&mut self) -> Result<(), FlipsideError> {
        self.mirror.leave();
        let sent = if self.session.is_terminated() {
            Ok(())
        } else {
            self.send(Message::Leave).await
        };
        self.session.disconnect();
        if let Err(e) = self.conn.close().await {
            // The server closes on Leave too; losing that race is fine.
            tracing::debug!(error = %e, "close after leave failed");
        }
        sent
    }

    /// Waits for the next event worth showing.
    ///
    /// Stale updates and superseded previews are swallowed here.
    ///
    /// # Errors
    /// [`FlipsideError::Closed`] when called again after
    /// [`ClientEvent::Closed`] was returned.
    pub async fn next_event(&mut self) -> Result<ClientEvent, FlipsideError> {
        if self.closed {
            return Err(FlipsideError::Closed);
        }
        loop {
            let Some(data) = self.conn.recv().await? else {
                self.closed = true;
                self.session.disconnect();
                return Ok(ClientEvent::Closed);
            };
            let envelope: Envelope = self.codec.decode(&data)?;

            match envelope.message {
                Message::Ready { player } => {
                    self.session.identified(player, self.token.clone());
                    return Ok(ClientEvent::Ready(player));
                }
                Message::Joined { id, color, turn } => {
                    self.session.joined(id, color, turn);
                    self.mirror.seat(id, color);
                    return Ok(ClientEvent::Joined {
                        game: id,
                        color,
                        turn,
                    });
                }
                Message::Ack => return Ok(ClientEvent::Accepted),
                Message::GameUpdate(update) => {
                    if self.mirror.apply_update(&update) == Reconcile::Stale {
                        continue;
                    }
                    self.session.observe_update(&update);
                    return Ok(ClientEvent::Update(update));
                }
                Message::Preview(preview) => {
                    if self.mirror.accept_preview(preview.clone()) == Reconcile::Stale
                    {
                        tracing::debug!(seq = preview.seq, "dropping stale preview");
                        continue;
                    }
                    return Ok(ClientEvent::Preview(preview));
                }
                Message::Error { code, message } => {
                    if code == ErrorCode::Unauthorized && self.session.player().is_none()
                    {
                        self.session.auth_failed();
                    }
                    return Ok(ClientEvent::Error { code, message });
                }
                other => {
                    tracing::warn!(message = other.name(), "unexpected message from server");
                }
            }
        }
    }

    /// Gates `message` on the session, then sends it.
    async fn send(&mut self, message: Message) -> Result<(), FlipsideError> {
        self.session.check(&message)?;
        self.send_unchecked(message).await
    }

    async fn send_unchecked(&self, message: Message) -> Result<(), FlipsideError> {
        let envelope = Envelope::new(message).with_token(self.token.as_str());
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }
}
