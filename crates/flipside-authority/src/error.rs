//! Error types for the authority layer.

use flipside_board::MoveError;
use flipside_protocol::{ErrorCode, GameId, PlayerId};

/// Errors from the external game registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no game exists with specified id")]
    NotFound(GameId),

    /// The registry backend could not answer.
    #[error("game registry unavailable: {0}")]
    Unavailable(String),
}

/// Why the authority refused a request.
///
/// Every variant is reported to the requesting connection only; none of
/// them leave a game half-changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("player {0} is not a participant in game {1}")]
    NotParticipant(PlayerId, GameId),

    #[error("game {0} is finished")]
    GameFinished(GameId),

    #[error("not your turn")]
    OutOfTurn,

    #[error(transparent)]
    Move(#[from] MoveError),

    /// The connection never joined this game (or already left it).
    #[error("connection is not seated in game {0}")]
    NotSeated(GameId),

    /// The game's actor has stopped or its queue is closed.
    #[error("game {0} is unavailable")]
    Unavailable(GameId),
}

impl AuthorityError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthorityError::Registry(RegistryError::NotFound(_)) => {
                ErrorCode::GameNotFound
            }
            AuthorityError::Registry(RegistryError::Unavailable(_)) => {
                ErrorCode::Unavailable
            }
            AuthorityError::NotParticipant(..) => ErrorCode::Unauthorized,
            AuthorityError::GameFinished(_) => ErrorCode::GameFinished,
            AuthorityError::OutOfTurn => ErrorCode::OutOfTurn,
            AuthorityError::Move(err) => ErrorCode::from(*err),
            AuthorityError::NotSeated(_) => ErrorCode::OutOfSequence,
            AuthorityError::Unavailable(_) => ErrorCode::Unavailable,
        }
    }
}
