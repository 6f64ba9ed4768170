//! Error types for the session layer.

use flipside_protocol::ErrorCode;

use crate::ConnectionState;

/// Why a connection may not do what it just tried.
///
/// None of these change any game state; the caller reports them to the
/// offending connection and carries on (except [`Terminated`], after
/// which there is nobody left to report to).
///
/// [`Terminated`]: SessionError::Terminated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The token was missing, unknown, or not the one this connection
    /// identified with. Also used for anything attempted before Identify.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Place while the opponent is to move.
    #[error("not your turn")]
    OutOfTurn,

    /// A valid message at the wrong point of the handshake.
    #[error("{message} not allowed while {state}")]
    OutOfSequence {
        message: &'static str,
        state: ConnectionState,
    },

    /// A message only the authority may send arrived from a client (or
    /// the other way round).
    #[error("{0} is not accepted in this direction")]
    WrongDirection(&'static str),

    /// The connection has already terminated.
    #[error("session terminated")]
    Terminated,
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::Unauthorized(_) => ErrorCode::Unauthorized,
            SessionError::OutOfTurn => ErrorCode::OutOfTurn,
            SessionError::OutOfSequence { .. } => ErrorCode::OutOfSequence,
            SessionError::WrongDirection(_) => ErrorCode::MalformedMessage,
            SessionError::Terminated => ErrorCode::Unavailable,
        }
    }
}
