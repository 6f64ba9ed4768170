//! Error types for the protocol layer.
//!
//! Each crate in Flipside defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the bytes on the wire, not in
//! game rules or connection state.

use crate::ErrorCode;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: not JSON, missing fields, an unknown
    /// `d.type`, or an `op` that disagrees with it.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Every protocol failure is reported to the peer as malformed input.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::MalformedMessage
    }
}
