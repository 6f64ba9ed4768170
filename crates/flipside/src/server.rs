//! `FlipsideServer` builder and server loop.
//!
//! This ties the layers together: transport → protocol → session →
//! authority. Every accepted connection gets its own handler task; every
//! game gets its own actor inside the [`Authority`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use flipside_authority::{Authority, GameRegistry};
use flipside_protocol::{Codec, JsonCodec};
use flipside_session::Authenticator;
use flipside_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{FlipsideError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A: Authenticator, R: GameRegistry, C: Codec> {
    pub(crate) authority: Arc<Authority<R>>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Flipside server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use flipside::prelude::*;
///
/// # async fn run() -> Result<(), FlipsideError> {
/// let mut tokens = TokenTable::new();
/// tokens.insert("alpha", PlayerId(1));
/// tokens.insert("beta", PlayerId(2));
///
/// let registry = Arc::new(InMemoryRegistry::new());
/// registry.create(PlayerId(1), PlayerId(2));
///
/// let server = FlipsideServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(tokens, registry)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct FlipsideServerBuilder {
    config: ServerConfig,
}

impl FlipsideServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Replaces the whole configuration, bind address included.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses [`JsonCodec`] and [`WebSocketTransport`].
    pub async fn build<A, R>(
        self,
        auth: A,
        registry: Arc<R>,
    ) -> Result<FlipsideServer<A, R, JsonCodec>, FlipsideError>
    where
        A: Authenticator,
        R: GameRegistry,
    {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;
        let authority = Authority::new(registry, self.config.game_config());

        let state = Arc::new(ServerState {
            authority: Arc::new(authority),
            auth,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(FlipsideServer { transport, state })
    }
}

impl Default for FlipsideServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Flipside server.
///
/// Call [`run`](Self::run) or [`run_until`](Self::run_until) to start
/// accepting connections.
pub struct FlipsideServer<A: Authenticator, R: GameRegistry, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, R, C>>,
}

impl<A, R, C> FlipsideServer<A, R, C>
where
    A: Authenticator,
    R: GameRegistry,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, FlipsideError> {
        Ok(self.transport.local_addr()?)
    }

    /// The authority that owns every running game.
    pub fn authority(&self) -> Arc<Authority<R>> {
        Arc::clone(&self.state.authority)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), FlipsideError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops
    /// accepting and stops every game actor.
    ///
    /// Connections already being handled are not waited for.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), FlipsideError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Flipside server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("Flipside server shutting down");
        self.transport.shutdown().await?;
        self.state.authority.shutdown().await;
        Ok(())
    }
}
