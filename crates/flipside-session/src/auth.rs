//! Authentication hook for resolving a session token to a player.
//!
//! Flipside does not log anyone in. Some external collaborator (a cookie
//! store, an auth provider, a test) hands out tokens; the server only
//! needs to turn the token that arrives with `Identify` back into a
//! [`PlayerId`]. That lookup is the [`Authenticator`] trait.

use std::collections::HashMap;
use std::future::Future;

use flipside_protocol::PlayerId;
use rand::Rng;

use crate::SessionError;

/// Validates a client's session token and returns their identity.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for the lifetime of the server.
///
/// # Example
///
/// ```rust
/// use flipside_protocol::PlayerId;
/// use flipside_session::{Authenticator, SessionError};
///
/// /// Accepts any numeric token as the player id. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     fn authenticate(
///         &self,
///         token: &str,
///     ) -> impl Future<Output = Result<PlayerId, SessionError>> + Send {
///         let result = token
///             .parse()
///             .map(PlayerId)
///             .map_err(|_| SessionError::Unauthorized("token must be a number".into()));
///         std::future::ready(result)
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Resolves `token` to the one player it belongs to.
    ///
    /// # Errors
    /// [`SessionError::Unauthorized`] if the token is unknown or expired.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<PlayerId, SessionError>> + Send;
}

/// A fixed token → player map.
///
/// Used by the bundled server binary (seeded from its config file) and
/// by tests. Tokens are registered up front; the table is read-only once
/// the server owns it.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, PlayerId>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a known token. Replaces any previous owner.
    pub fn insert(&mut self, token: impl Into<String>, player: PlayerId) {
        self.tokens.insert(token.into(), player);
    }

    /// Mints a fresh random token for `player` and returns it.
    ///
    /// The token is 32 lowercase hex characters (128 bits).
    pub fn issue(&mut self, player: PlayerId) -> String {
        let token = generate_token();
        self.tokens.insert(token.clone(), player);
        token
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn lookup(&self, token: &str) -> Result<PlayerId, SessionError> {
        if token.is_empty() {
            return Err(SessionError::Unauthorized("missing token".into()));
        }
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| SessionError::Unauthorized("invalid user token".into()))
    }
}

impl<T: Into<String>> FromIterator<(T, PlayerId)> for TokenTable {
    fn from_iter<I: IntoIterator<Item = (T, PlayerId)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().map(|(t, p)| (t.into(), p)).collect(),
        }
    }
}

impl Authenticator for TokenTable {
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<PlayerId, SessionError>> + Send {
        std::future::ready(self.lookup(token))
    }
}

fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
