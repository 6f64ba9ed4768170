//! Per-connection handler: identify, join, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Identify → authenticate the token → send Ready
//!   2. Receive Join → seat the connection in the game → send Joined
//!   3. Loop: route Probe/Place to the game, forward GameUpdates back
//!
//! Every inbound frame goes through [`ConnectionSession::admit`] first, so
//! nothing reaches the authority out of order.

use std::sync::Arc;

use flipside_authority::{Authority, GameHandle, GameRegistry, UpdateSender};
use flipside_protocol::{Codec, Envelope, ErrorCode, Message};
use flipside_session::{
    Admitted, Authenticator, ConnectionSession, ConnectionState, SessionError,
};
use flipside_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::FlipsideError;
use crate::server::ServerState;

/// What the receive loop should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Drop guard that detaches the connection from its game.
///
/// The handler calls [`leave`](Self::leave) on the way out. If the task
/// unwinds first, `Drop` spawns the same cleanup so the game never keeps
/// pushing updates to a dead connection.
struct SeatGuard<R: GameRegistry> {
    authority: Arc<Authority<R>>,
    handle: GameHandle,
    conn: ConnectionId,
    left: bool,
}

impl<R: GameRegistry> SeatGuard<R> {
    async fn leave(mut self) {
        self.left = true;
        if let Err(e) = self.authority.leave(&self.handle, self.conn).await {
            tracing::debug!(conn_id = %self.conn, error = %e, "leave failed");
        }
    }
}

impl<R: GameRegistry> Drop for SeatGuard<R> {
    fn drop(&mut self) {
        if self.left {
            return;
        }
        let authority = Arc::clone(&self.authority);
        let handle = self.handle.clone();
        let conn = self.conn;
        tokio::spawn(async move {
            let _ = authority.leave(&handle, conn).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, R, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, R, C>>,
) -> Result<(), FlipsideError>
where
    A: Authenticator,
    R: GameRegistry,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = ?conn.peer_addr(), "handling new connection");

    let mut session = ConnectionSession::new();
    session.connect();
    let mut seat: Option<SeatGuard<R>> = None;
    let (updates_tx, mut updates) = mpsc::unbounded_channel();

    let identify_deadline = Instant::now() + state.config.identify_timeout();
    let idle = state.config.idle_timeout();
    let mut idle_deadline = Instant::now() + idle;

    let result = loop {
        let identifying = session.state() == ConnectionState::Identifying;
        let deadline = if identifying {
            identify_deadline.min(idle_deadline)
        } else {
            idle_deadline
        };

        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(%conn_id, "connection closed by peer");
                        break Ok(());
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break Ok(());
                    }
                };
                idle_deadline = Instant::now() + idle;

                match handle_frame(
                    &conn, &state, &mut session, &mut seat, &updates_tx, &data,
                )
                .await
                {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Close) => break Ok(()),
                    Err(e) => break Err(e),
                }
            }
            Some(update) = updates.recv() => {
                session.observe_update(&update);
                if let Err(e) =
                    send(&conn, &state.codec, Message::GameUpdate(update)).await
                {
                    break Err(e);
                }
                if session.is_terminated() {
                    tracing::info!(%conn_id, "game over, closing connection");
                    break Ok(());
                }
            }
            () = sleep_until(deadline) => {
                if identifying {
                    tracing::info!(%conn_id, "identify timed out");
                    let _ = send_error(
                        &conn,
                        &state.codec,
                        ErrorCode::Unauthorized,
                        "connection timed out",
                    )
                    .await;
                } else {
                    tracing::info!(%conn_id, "idle timeout");
                }
                break Ok(());
            }
        }
    };

    session.disconnect();
    if let Some(guard) = seat.take() {
        guard.leave().await;
    }
    let _ = conn.close().await;
    tracing::debug!(%conn_id, player = ?session.player(), "connection finished");
    result
}

/// Decodes, gates, and executes one inbound frame.
async fn handle_frame<A, R, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, R, C>,
    session: &mut ConnectionSession,
    seat: &mut Option<SeatGuard<R>>,
    updates: &UpdateSender,
    data: &[u8],
) -> Result<Flow, FlipsideError>
where
    A: Authenticator,
    R: GameRegistry,
    C: Codec,
{
    let conn_id = conn.id();

    let envelope: Envelope = match state.codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
            send_error(conn, &state.codec, e.code(), e.to_string()).await?;
            return Ok(Flow::Continue);
        }
    };

    let admitted = match session.admit(&envelope) {
        Ok(admitted) => admitted,
        Err(SessionError::Terminated) => return Ok(Flow::Close),
        Err(e) => {
            tracing::debug!(
                %conn_id,
                message = envelope.message.name(),
                state = %session.state(),
                error = %e,
                "message rejected"
            );
            send_error(conn, &state.codec, e.code(), e.to_string()).await?;
            return Ok(Flow::Continue);
        }
    };

    match admitted {
        Admitted::Identify { token } => {
            match state.auth.authenticate(&token).await {
                Ok(player) => {
                    session.identified(player, token);
                    tracing::info!(%conn_id, player_id = %player, "player identified");
                    send(conn, &state.codec, Message::Ready { player }).await?;
                }
                Err(e) => {
                    session.auth_failed();
                    tracing::info!(%conn_id, error = %e, "identify rejected");
                    send_error(conn, &state.codec, e.code(), e.to_string()).await?;
                    return Ok(Flow::Close);
                }
            }
        }

        Admitted::Join(id) => {
            let Some(player) = session.player() else {
                return Ok(Flow::Close);
            };
            match state
                .authority
                .join(id, player, conn_id, updates.clone())
                .await
            {
                Ok((handle, grant)) => {
                    session.joined(id, grant.color, grant.turn);
                    *seat = Some(SeatGuard {
                        authority: Arc::clone(&state.authority),
                        handle,
                        conn: conn_id,
                        left: false,
                    });
                    tracing::info!(
                        %conn_id, player_id = %player, game_id = %id,
                        color = %grant.color, "player joined"
                    );
                    let joined = Message::Joined {
                        id,
                        color: grant.color,
                        turn: grant.turn,
                    };
                    send(conn, &state.codec, joined).await?;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, game_id = %id, error = %e, "join refused");
                    send_error(conn, &state.codec, e.code(), e.to_string()).await?;
                }
            }
        }

        Admitted::Probe { seq, at } => {
            let (Some(guard), Some(s)) = (seat.as_ref(), session.seat()) else {
                return Ok(Flow::Continue);
            };
            let preview = guard.handle.preview(s.color, seq, at);
            send(conn, &state.codec, Message::Preview(preview)).await?;
        }

        Admitted::Place(at) => {
            let Some(guard) = seat.as_ref() else {
                return Ok(Flow::Continue);
            };
            match guard.handle.place(conn_id, at).await {
                Ok(version) => {
                    tracing::debug!(%conn_id, %at, version, "placement committed");
                    send(conn, &state.codec, Message::Ack).await?;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, %at, error = %e, "placement refused");
                    send_error(conn, &state.codec, e.code(), e.to_string()).await?;
                }
            }
        }

        Admitted::Leave => {
            tracing::info!(%conn_id, "client left");
            return Ok(Flow::Close);
        }

        Admitted::Ack => {}
    }

    Ok(Flow::Continue)
}

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: Message,
) -> Result<(), FlipsideError> {
    let bytes = codec.encode(&Envelope::new(message))?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `Error` message to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: ErrorCode,
    message: impl Into<String>,
) -> Result<(), FlipsideError> {
    send(conn, codec, Message::error(code, message)).await
}
