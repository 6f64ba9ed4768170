//! The authority: an explicit registry of running games, keyed by id.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use flipside_protocol::{GameId, PlayerId};
use flipside_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::game::spawn_game;
use crate::{
    AuthorityError, GameConfig, GameHandle, GameRegistry, JoinGrant, LeaveOutcome,
    UpdateSender,
};

/// Owns every running game actor.
///
/// A game's actor is spawned on the first join and dropped once the game
/// is finished and its last connection has gone. Unfinished games stay
/// up with nobody attached, so either player can come back.
pub struct Authority<R: GameRegistry> {
    registry: Arc<R>,
    config: GameConfig,
    games: Mutex<HashMap<GameId, GameHandle>>,
}

impl<R: GameRegistry> Authority<R> {
    pub fn new(registry: Arc<R>, config: GameConfig) -> Self {
        Self {
            registry,
            config,
            games: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Seats `conn` in game `id`, spawning the game's actor if this is the
    /// first join since it was loaded.
    ///
    /// Returns the handle the connection should use from now on.
    ///
    /// # Errors
    /// - `GameNotFound` (via [`RegistryError`](crate::RegistryError)) for an
    ///   unknown id
    /// - [`AuthorityError::GameFinished`] if the game has already ended
    /// - [`AuthorityError::NotParticipant`] if `player` plays neither color
    pub async fn join(
        &self,
        id: GameId,
        player: PlayerId,
        conn: ConnectionId,
        sender: UpdateSender,
    ) -> Result<(GameHandle, JoinGrant), AuthorityError> {
        let handle = self.load(id).await?;
        let grant = handle.join(player, conn, sender).await?;
        Ok((handle, grant))
    }

    /// Detaches `conn` from the game behind `handle`, and forgets the game
    /// if that was the last connection to a finished game.
    pub async fn leave(
        &self,
        handle: &GameHandle,
        conn: ConnectionId,
    ) -> Result<LeaveOutcome, AuthorityError> {
        let outcome = handle.leave(conn).await?;
        if outcome.finished && outcome.remaining == 0 {
            self.remove(handle.id()).await;
        }
        Ok(outcome)
    }

    /// The running game with this id, if any.
    pub async fn game(&self, id: GameId) -> Option<GameHandle> {
        self.games.lock().await.get(&id).cloned()
    }

    /// Number of running game actors.
    pub async fn game_count(&self) -> usize {
        self.games.lock().await.len()
    }

    /// Stops every game actor.
    pub async fn shutdown(&self) {
        let handles: Vec<GameHandle> =
            self.games.lock().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }

    async fn load(&self, id: GameId) -> Result<GameHandle, AuthorityError> {
        if let Some(handle) = self.games.lock().await.get(&id) {
            return Ok(handle.clone());
        }

        // The map stays unlocked during the lookup and is re-checked after.
        let record = self.registry.lookup(id).await?;
        if record.finished {
            return Err(AuthorityError::GameFinished(id));
        }

        let mut games = self.games.lock().await;
        match games.entry(id) {
            // A concurrent first join got here first.
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let handle = spawn_game(
                    record,
                    Arc::clone(&self.registry),
                    self.config.channel_size,
                );
                entry.insert(handle.clone());
                tracing::info!(game_id = %id, running = games.len(), "game loaded");
                Ok(handle)
            }
        }
    }

    async fn remove(&self, id: GameId) {
        let removed = self.games.lock().await.remove(&id);
        if let Some(handle) = removed {
            let _ = handle.shutdown().await;
            tracing::info!(game_id = %id, "game unloaded");
        }
    }
}
