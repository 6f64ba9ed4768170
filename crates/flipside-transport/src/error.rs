use std::io;

/// Errors that can occur in the transport layer.
///
/// Everything below the framing line ends up here. Codec and game errors
/// live in their own crates.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),

    /// Accepting a TCP connection or completing the WebSocket handshake
    /// failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Dialing a server or its WebSocket handshake failed.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    /// Writing a frame failed. The peer is most likely gone.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Wraps a foreign error (e.g. from tungstenite) as an `io::Error` of
    /// the given kind.
    pub(crate) fn io<E>(kind: io::ErrorKind, err: E) -> io::Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        io::Error::new(kind, err)
    }
}
