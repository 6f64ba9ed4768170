//! The authority: the single writer of every game's board.
//!
//! Each game runs as an isolated Tokio task (actor model). Commits for
//! one game are queued on that actor's channel and applied one at a
//! time; different games never share state.
//!
//! # Key types
//!
//! - [`Authority`] — the explicit game-id keyed registry of running games
//! - [`GameHandle`] — send commands to one running game, read its view
//! - [`GameRegistry`] — where game metadata comes from and where
//!   finished games go
//! - [`GameConfig`] — actor settings

#![allow(async_fn_in_trait)]

mod authority;
mod config;
mod error;
mod game;
mod registry;
mod state;

pub use authority::Authority;
pub use config::GameConfig;
pub use error::{AuthorityError, RegistryError};
pub use game::{GameHandle, GameInfo, GameView, JoinGrant, LeaveOutcome, UpdateSender};
pub use registry::{ArchivedGame, GameRecord, GameRegistry, InMemoryRegistry, MoveRecord};
