//! Per-connection session state for Flipside.
//!
//! This crate answers "may this connection do that, right now?":
//!
//! 1. **Authentication** — resolving a token to a player ([`Authenticator`]).
//! 2. **Gating** — the per-connection state machine ([`ConnectionSession`])
//!    that admits or rejects each message according to where the
//!    connection is in its Identify → Join → play lifecycle.
//! 3. **Mirroring** — the client's read-only copy of the game
//!    ([`Mirror`]), which applies authoritative updates in version order
//!    and reconciles hover previews.
//!
//! # How it fits in the stack
//!
//! ```text
//! Authority (above)  ← owns the canonical board, trusts what this layer admits
//!     ↕
//! Session (this crate)  ← identity, handshake order, turn gating
//!     ↕
//! Protocol (below)  ← Envelope, Message, PlayerId, GameId
//! ```
//!
//! The same [`ConnectionSession`] runs on both ends: the server uses
//! [`ConnectionSession::admit`] on inbound frames, and the client uses
//! [`ConnectionSession::check`] before sending.

mod auth;
mod error;
mod mirror;
mod state;

pub use auth::{Authenticator, TokenTable};
pub use error::SessionError;
pub use mirror::{Mirror, Reconcile};
pub use state::{Admitted, ConnectionSession, ConnectionState, JoinedState, Seat};
