//! The game registry: the external collaborator that knows which games
//! exist, who plays in them, and what happens to them once they end.
//!
//! Creating games (lobbies, invitations, matchmaking) happens elsewhere.
//! The authority only looks games up by id and hands finished ones back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use flipside_board::{BoardSnapshot, FlipSet, Piece, Position, Score};
use flipside_protocol::{GameId, PlayerId};
use serde::{Deserialize, Serialize};

use crate::RegistryError;

/// Metadata for one game, as the registry knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    /// Plays Black and moves first.
    pub host: PlayerId,
    /// Plays White.
    pub guest: PlayerId,
    #[serde(default)]
    pub finished: bool,
}

impl GameRecord {
    /// The color `player` plays in this game, if they play at all.
    pub fn color_of(&self, player: PlayerId) -> Option<Piece> {
        if player == self.host {
            Some(Piece::Black)
        } else if player == self.guest {
            Some(Piece::White)
        } else {
            None
        }
    }

    pub fn player_of(&self, color: Piece) -> PlayerId {
        match color {
            Piece::Black => self.host,
            Piece::White => self.guest,
        }
    }
}

/// One committed move, as kept in a game's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub piece: Piece,
    pub at: Position,
    pub flips: FlipSet,
    /// The color that had no reply and was skipped right after this move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<Piece>,
}

/// What the authority hands to [`GameRegistry::archive`] when a game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedGame {
    pub id: GameId,
    pub host: PlayerId,
    pub guest: PlayerId,
    pub board: BoardSnapshot,
    pub score: Score,
    /// `None` is a draw.
    pub winner: Option<Piece>,
    pub moves: Vec<MoveRecord>,
}

/// Looks games up and receives them once finished.
///
/// Implement this over whatever store the rest of the application uses.
/// `Send + Sync + 'static` because one registry is shared by every game
/// actor and connection task.
pub trait GameRegistry: Send + Sync + 'static {
    /// Returns the record for `id`.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if no such game was ever created.
    fn lookup(
        &self,
        id: GameId,
    ) -> impl Future<Output = Result<GameRecord, RegistryError>> + Send;

    /// Called exactly once per game, when it finishes. Default: drop it.
    fn archive(&self, game: ArchivedGame) -> impl Future<Output = ()> + Send {
        let _ = game;
        std::future::ready(())
    }
}

/// A map-backed [`GameRegistry`] for development, the bundled binary,
/// and tests.
///
/// Archiving a game marks its record finished, so rejoining it later is
/// refused.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    games: Mutex<HashMap<GameId, GameRecord>>,
    archived: Mutex<Vec<ArchivedGame>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new game between `host` and `guest` and returns its id.
    pub fn create(&self, host: PlayerId, guest: PlayerId) -> GameId {
        let id = GameId::new_v4();
        self.insert(GameRecord {
            id,
            host,
            guest,
            finished: false,
        });
        id
    }

    /// Registers (or replaces) a record.
    pub fn insert(&self, record: GameRecord) {
        tracing::debug!(game_id = %record.id, host = %record.host, guest = %record.guest, "game registered");
        lock(&self.games).insert(record.id, record);
    }

    pub fn get(&self, id: GameId) -> Option<GameRecord> {
        lock(&self.games).get(&id).cloned()
    }

    /// Every game archived so far, oldest first.
    pub fn archived(&self) -> Vec<ArchivedGame> {
        lock(&self.archived).clone()
    }
}

impl FromIterator<GameRecord> for InMemoryRegistry {
    fn from_iter<I: IntoIterator<Item = GameRecord>>(iter: I) -> Self {
        let registry = Self::new();
        for record in iter {
            registry.insert(record);
        }
        registry
    }
}

impl GameRegistry for InMemoryRegistry {
    fn lookup(
        &self,
        id: GameId,
    ) -> impl Future<Output = Result<GameRecord, RegistryError>> + Send {
        std::future::ready(self.get(id).ok_or(RegistryError::NotFound(id)))
    }

    fn archive(&self, game: ArchivedGame) -> impl Future<Output = ()> + Send {
        if let Some(record) = lock(&self.games).get_mut(&game.id) {
            record.finished = true;
        }
        lock(&self.archived).push(game);
        std::future::ready(())
    }
}

/// The maps stay consistent even if a holder panicked, so poisoning is
/// ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
