//! Wire protocol for Flipside.
//!
//! This crate defines the "language" that clients and the authority speak:
//!
//! - **Types** ([`PlayerId`], [`GameId`], [`GameStatus`], [`ErrorCode`]) —
//!   identities and enumerations shared by both sides.
//! - **Messages** ([`Envelope`], [`Message`], [`GameUpdate`], [`Preview`]) —
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Wire format
//!
//! Every frame is one JSON object:
//!
//! ```text
//! { "op": 8, "t": "<token>", "d": { "type": "Place", "row": 2, "col": 3 } }
//! ```
//!
//! `d.type` is the only discriminator. `op` is derived from it 1:1 and is
//! checked on decode; `t` is optional.

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{Envelope, GameUpdate, LastMove, Message, OpCode, Preview};
pub use types::{Direction, ErrorCode, GameId, GameStatus, PlayerId};
