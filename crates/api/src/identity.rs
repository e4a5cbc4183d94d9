//! Bearer token -> user resolution.
//!
//! Issuing and verifying real credentials happens elsewhere; the API only needs
//! to turn a presented token into a user id.

use std::collections::HashMap;

use storefront_core::UserId;

pub trait IdentityProvider: Send + Sync {
    /// The user a bearer token belongs to, if any.
    fn resolve(&self, bearer: &str) -> Option<UserId>;
}

/// Fixed table of opaque tokens, configured through `API_TOKENS`.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenIdentity {
    pub fn new(tokens: impl IntoIterator<Item = (String, UserId)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn resolve(&self, bearer: &str) -> Option<UserId> {
        self.tokens.get(bearer).copied()
    }
}
