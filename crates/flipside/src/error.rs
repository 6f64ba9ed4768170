//! Unified error type for Flipside.

use std::io;

use flipside_authority::{AuthorityError, RegistryError};
use flipside_protocol::{ErrorCode, ProtocolError};
use flipside_session::SessionError;
use flipside_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `flipside` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum FlipsideError {
    /// A transport-level error (bind, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, handshake order, turn gating).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The authority refused a join or a move.
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// The game registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The config file could not be read.
    #[error("reading config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid JSON for [`FileConfig`].
    ///
    /// [`FileConfig`]: crate::FileConfig
    #[error("parsing config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The server already closed the connection and the client was told
    /// so with [`ClientEvent::Closed`](crate::ClientEvent::Closed).
    #[error("connection closed")]
    Closed,
}

impl FlipsideError {
    /// The wire code a peer would see for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            FlipsideError::Protocol(e) => e.code(),
            FlipsideError::Session(e) => e.code(),
            FlipsideError::Authority(e) => e.code(),
            FlipsideError::Registry(e) => AuthorityError::from(e.clone()).code(),
            _ => ErrorCode::Unavailable,
        }
    }
}
