//! # Flipside
//!
//! Realtime two-player Othello over WebSockets.
//!
//! One authority process owns the canonical board of every game. It
//! validates and serializes placements, then broadcasts authoritative
//! updates; each client keeps a read-only mirror and reconciles hover
//! previews against it.
//!
//! This crate ties the layers together:
//!
//! - [`FlipsideServer`] — binds a listener and runs one handler task per
//!   connection on top of an [`Authority`](flipside_authority::Authority)
//! - [`GameClient`] — the client side of the same protocol
//! - [`FlipsideError`] — one error type over every layer
//! - [`ServerConfig`] / [`FileConfig`] — settings and the binary's config
//!   file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use flipside::prelude::*;
//!
//! # async fn run() -> Result<(), FlipsideError> {
//! let tokens: TokenTable =
//!     [("alpha", PlayerId(1)), ("beta", PlayerId(2))].into_iter().collect();
//! let registry = Arc::new(InMemoryRegistry::new());
//! let game = registry.create(PlayerId(1), PlayerId(2));
//!
//! let server = FlipsideServerBuilder::new()
//!     .bind("127.0.0.1:8080")
//!     .build(tokens, registry)
//!     .await?;
//! tokio::spawn(server.run());
//!
//! let mut black = GameClient::connect("127.0.0.1:8080", "alpha").await?;
//! black.identify().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
mod server;

pub use client::{ClientEvent, GameClient};
pub use config::{FileConfig, ServerConfig};
pub use error::FlipsideError;
pub use server::{FlipsideServer, FlipsideServerBuilder};

/// Everything needed to run a server or a client.
pub mod prelude {
    pub use flipside_authority::{
        ArchivedGame, GameConfig, GameRecord, GameRegistry, InMemoryRegistry,
    };
    pub use flipside_board::{Board, BoardSnapshot, FlipSet, Piece, Position, Score};
    pub use flipside_protocol::{
        ErrorCode, GameId, GameStatus, GameUpdate, PlayerId, Preview,
    };
    pub use flipside_session::{Authenticator, SessionError, TokenTable};

    pub use crate::{
        ClientEvent, FileConfig, FlipsideError, FlipsideServer,
        FlipsideServerBuilder, GameClient, ServerConfig,
    };
}
