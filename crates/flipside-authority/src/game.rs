//! Game actor: an isolated Tokio task that owns one game's board.
//!
//! All writes go through the actor's command channel, so placements for
//! a game are applied strictly one at a time in arrival order. Reads for
//! hover previews don't queue behind them: the actor publishes an
//! immutable [`GameView`] on a `watch` channel after every change, and
//! [`GameHandle::preview`] computes against whatever view is current.

use std::collections::HashMap;
use std::sync::Arc;

use flipside_board::{BoardSnapshot, Piece, Position, Score};
use flipside_protocol::{GameId, GameStatus, GameUpdate, PlayerId, Preview};
use flipside_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot, watch};

use crate::state::GameState;
use crate::{ArchivedGame, AuthorityError, GameRecord, GameRegistry};

/// Channel the actor uses to push updates to one connection.
///
/// Unbounded so a slow reader never stalls the actor or the opponent.
pub type UpdateSender = mpsc::UnboundedSender<GameUpdate>;

/// The read-only state previews are computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub board: BoardSnapshot,
    pub turn: Piece,
    pub status: GameStatus,
    pub version: u64,
}

/// What a successful join tells the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinGrant {
    pub color: Piece,
    pub turn: Piece,
}

/// Result of removing a connection from a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Connections still attached to the game.
    pub remaining: usize,
    pub finished: bool,
}

/// A snapshot of game metadata, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub id: GameId,
    pub status: GameStatus,
    pub version: u64,
    pub turn: Piece,
    pub score: Score,
    pub connections: usize,
    pub moves: usize,
    /// The participant whose last connection left an unfinished game.
    pub abandoned_by: Option<PlayerId>,
}

/// Commands sent to a game actor through its channel.
pub(crate) enum GameCommand {
    Join {
        player: PlayerId,
        conn: ConnectionId,
        sender: UpdateSender,
        reply: oneshot::Sender<Result<JoinGrant, AuthorityError>>,
    },
    Place {
        conn: ConnectionId,
        at: Position,
        reply: oneshot::Sender<Result<u64, AuthorityError>>,
    },
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<LeaveOutcome>,
    },
    Info {
        reply: oneshot::Sender<GameInfo>,
    },
    Shutdown,
}

/// Handle to a running game actor.
///
/// Cheap to clone: a command sender plus a view receiver. Each connection
/// keeps its own copy after joining.
#[derive(Clone, Debug)]
pub struct GameHandle {
    id: GameId,
    sender: mpsc::Sender<GameCommand>,
    view: watch::Receiver<GameView>,
}

impl GameHandle {
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Seats `conn` (belonging to `player`) and starts pushing updates to
    /// `sender`. The current state is pushed right away.
    pub async fn join(
        &self,
        player: PlayerId,
        conn: ConnectionId,
        sender: UpdateSender,
    ) -> Result<JoinGrant, AuthorityError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            GameCommand::Join {
                player,
                conn,
                sender,
                reply,
            },
            rx,
        )
        .await?
    }

    /// Commits a placement for the color `conn` is seated as. Returns the
    /// new version on success.
    pub async fn place(
        &self,
        conn: ConnectionId,
        at: Position,
    ) -> Result<u64, AuthorityError> {
        let (reply, rx) = oneshot::channel();
        self.request(GameCommand::Place { conn, at, reply }, rx).await?
    }

    /// Detaches `conn`. Unknown connections are ignored.
    pub async fn leave(
        &self,
        conn: ConnectionId,
    ) -> Result<LeaveOutcome, AuthorityError> {
        let (reply, rx) = oneshot::channel();
        self.request(GameCommand::Leave { conn, reply }, rx).await
    }

    pub async fn info(&self) -> Result<GameInfo, AuthorityError> {
        let (reply, rx) = oneshot::channel();
        self.request(GameCommand::Info { reply }, rx).await
    }

    /// Tells the actor to stop. Queued commands ahead of this still run.
    pub async fn shutdown(&self) -> Result<(), AuthorityError> {
        self.sender
            .send(GameCommand::Shutdown)
            .await
            .map_err(|_| AuthorityError::Unavailable(self.id))
    }

    /// The most recently published view.
    pub fn view(&self) -> GameView {
        self.view.borrow().clone()
    }

    /// Flips that `color` would get at `at`, against the current view.
    ///
    /// Read-only and never queued behind commits. Squares that are not
    /// legal for `color` preview as an empty flip set.
    pub fn preview(&self, color: Piece, seq: u64, at: Position) -> Preview {
        let view = self.view.borrow();
        let flips = view.board.preview(color, at).unwrap_or_default();
        Preview {
            seq,
            version: view.version,
            at,
            flips,
        }
    }

    async fn request<T>(
        &self,
        command: GameCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, AuthorityError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| AuthorityError::Unavailable(self.id))?;
        rx.await.map_err(|_| AuthorityError::Unavailable(self.id))
    }
}

struct Seated {
    player: PlayerId,
    color: Piece,
    sender: UpdateSender,
}

/// The internal actor state. Runs inside a Tokio task.
struct GameActor<R: GameRegistry> {
    record: GameRecord,
    state: GameState,
    connections: HashMap<ConnectionId, Seated>,
    abandoned_by: Option<PlayerId>,
    archived: bool,
    view: watch::Sender<GameView>,
    registry: Arc<R>,
    receiver: mpsc::Receiver<GameCommand>,
}

impl<R: GameRegistry> GameActor<R> {
    async fn run(mut self) {
        tracing::info!(game_id = %self.record.id, "game actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                GameCommand::Join {
                    player,
                    conn,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(player, conn, sender));
                }
                GameCommand::Place { conn, at, reply } => {
                    let result = self.handle_place(conn, at);
                    let _ = reply.send(result);
                    self.archive_if_finished().await;
                }
                GameCommand::Leave { conn, reply } => {
                    let _ = reply.send(self.handle_leave(conn));
                }
                GameCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                GameCommand::Shutdown => break,
            }
        }

        tracing::info!(game_id = %self.record.id, "game actor stopped");
    }

    fn handle_join(
        &mut self,
        player: PlayerId,
        conn: ConnectionId,
        sender: UpdateSender,
    ) -> Result<JoinGrant, AuthorityError> {
        let id = self.record.id;
        let color = self
            .record
            .color_of(player)
            .ok_or(AuthorityError::NotParticipant(player, id))?;
        if self.state.status().is_finished() {
            return Err(AuthorityError::GameFinished(id));
        }

        self.connections.insert(
            conn,
            Seated {
                player,
                color,
                sender: sender.clone(),
            },
        );
        tracing::info!(game_id = %id, %player, %color, %conn, "player joined");
        if self.abandoned_by == Some(player) {
            self.abandoned_by = None;
        }

        if self.refresh_presence() {
            // Everyone, including the new connection, hears the change.
            self.publish();
        } else {
            let _ = sender.send(self.state.update());
        }

        Ok(JoinGrant {
            color,
            turn: self.state.turn(),
        })
    }

    fn handle_place(
        &mut self,
        conn: ConnectionId,
        at: Position,
    ) -> Result<u64, AuthorityError> {
        let id = self.record.id;
        let (player, color) = match self.connections.get(&conn) {
            Some(seat) => (seat.player, seat.color),
            None => return Err(AuthorityError::NotSeated(id)),
        };

        if let Err(err) = self.state.commit(color, at) {
            tracing::debug!(game_id = %id, %player, %at, %err, "placement rejected");
            return Err(err);
        }

        let version = self.state.version();
        tracing::info!(game_id = %id, %player, %color, %at, version, "move committed");
        self.publish();
        Ok(version)
    }

    fn handle_leave(&mut self, conn: ConnectionId) -> LeaveOutcome {
        if let Some(seat) = self.connections.remove(&conn) {
            tracing::info!(game_id = %self.record.id, player = %seat.player, %conn, "connection left");
            let still_here = self.connections.values().any(|s| s.player == seat.player);
            if !still_here && !self.state.status().is_finished() {
                self.abandoned_by = Some(seat.player);
            }
            if self.refresh_presence() {
                self.publish();
            }
        }
        LeaveOutcome {
            remaining: self.connections.len(),
            finished: self.state.status().is_finished(),
        }
    }

    /// Recomputes Active/WaitingForPlayers. Returns `true` if it changed.
    fn refresh_presence(&mut self) -> bool {
        let present = |color| self.connections.values().any(|s| s.color == color);
        let both = present(Piece::Black) && present(Piece::White);
        self.state.set_presence(both)
    }

    /// Publishes the current view and pushes the full update to every
    /// connection. Never waits on a reader.
    fn publish(&self) {
        self.view.send_replace(self.state.view());
        let update = self.state.update();
        for seat in self.connections.values() {
            let _ = seat.sender.send(update.clone());
        }
    }

    async fn archive_if_finished(&mut self) {
        if self.archived || !self.state.status().is_finished() {
            return;
        }
        self.archived = true;
        let update = self.state.update();
        tracing::info!(
            game_id = %self.record.id,
            black = update.score.black,
            white = update.score.white,
            winner = ?update.winner,
            "game finished"
        );
        self.registry
            .archive(ArchivedGame {
                id: self.record.id,
                host: self.record.host,
                guest: self.record.guest,
                board: update.board,
                score: update.score,
                winner: update.winner,
                moves: self.state.log().to_vec(),
            })
            .await;
    }

    fn info(&self) -> GameInfo {
        GameInfo {
            id: self.record.id,
            status: self.state.status(),
            version: self.state.version(),
            turn: self.state.turn(),
            score: self.state.board().score(),
            connections: self.connections.len(),
            moves: self.state.log().len(),
            abandoned_by: self.abandoned_by,
        }
    }
}

/// Spawns a new game actor task and returns a handle to it.
pub(crate) fn spawn_game<R: GameRegistry>(
    record: GameRecord,
    registry: Arc<R>,
    channel_size: usize,
) -> GameHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));
    let state = GameState::new(record.id);
    let (view_tx, view_rx) = watch::channel(state.view());
    let id = record.id;

    let actor = GameActor {
        record,
        state,
        connections: HashMap::new(),
        abandoned_by: None,
        archived: false,
        view: view_tx,
        registry,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    GameHandle {
        id,
        sender: tx,
        view: view_rx,
    }
}

#[cfg(test)]
mod tests {
    use flipside_board::FlipSet;

    use super::*;
    use crate::InMemoryRegistry;

    fn spawn() -> (GameHandle, GameRecord) {
        let record = GameRecord {
            id: GameId::new_v4(),
            host: PlayerId(1),
            guest: PlayerId(2),
            finished: false,
        };
        let handle = spawn_game(record.clone(), Arc::new(InMemoryRegistry::new()), 8);
        (handle, record)
    }

    #[tokio::test]
    async fn test_preview_reads_view_without_changing_it() {
        let (handle, _) = spawn();

        let preview = handle.preview(Piece::Black, 7, Position::new(2, 3));

        assert_eq!(preview.seq, 7);
        assert_eq!(preview.version, 0);
        assert_eq!(preview.flips, FlipSet::from(vec![Position::new(3, 3)]));
        assert_eq!(handle.view().version, 0);
    }

    #[tokio::test]
    async fn test_preview_illegal_square_is_empty() {
        let (handle, _) = spawn();

        assert!(handle.preview(Piece::Black, 1, Position::new(0, 0)).flips.is_empty());
        assert!(handle.preview(Piece::Black, 1, Position::new(9, 9)).flips.is_empty());
    }

    #[tokio::test]
    async fn test_join_pushes_snapshot_to_joiner() {
        let (handle, _) = spawn();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let grant = handle.join(PlayerId(1), ConnectionId::new(1), tx).await.unwrap();

        assert_eq!(grant, JoinGrant { color: Piece::Black, turn: Piece::Black });
        let update = rx.recv().await.unwrap();
        assert_eq!(update.status, GameStatus::WaitingForPlayers);
        assert_eq!(update.version, 0);
    }

    #[tokio::test]
    async fn test_place_from_unseated_connection_is_rejected() {
        let (handle, record) = spawn();

        let err = handle.place(ConnectionId::new(9), Position::new(2, 3)).await.unwrap_err();

        assert_eq!(err, AuthorityError::NotSeated(record.id));
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_is_unavailable() {
        let (handle, record) = spawn();

        handle.shutdown().await.unwrap();
        // Let the actor drain and drop its receiver.
        tokio::task::yield_now().await;

        let result = handle.info().await;
        assert_eq!(result, Err(AuthorityError::Unavailable(record.id)));
    }
}
