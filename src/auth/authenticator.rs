//! Bearer token → (quote, role) resolution

use std::sync::Arc;
use tracing::debug;

use super::token::{short_identifier, TokenHasher};
use crate::db::QuoteDoc;
use crate::store::DocumentStore;
use crate::types::{CountersignError, Result, Role};

/// Resolves bearer tokens against the document store
pub struct TokenAuthenticator {
    hasher: TokenHasher,
    store: Arc<dyn DocumentStore>,
}

impl TokenAuthenticator {
    pub fn new(hasher: TokenHasher, store: Arc<dyn DocumentStore>) -> Self {
        Self { hasher, store }
    }

    pub fn hasher(&self) -> &TokenHasher {
        &self.hasher
    }

    /// Find the quote and role the token was issued for.
    ///
    /// Fails with [`CountersignError::Unauthorized`] when no quote carries the
    /// token's identifier. Store failures propagate unchanged.
    pub async fn resolve(&self, token: &str) -> Result<(QuoteDoc, Role)> {
        let identifier = self.hasher.identifier(token);

        let quote = self
            .store
            .find_by_token_identifier(&identifier)
            .await?
            .ok_or(CountersignError::Unauthorized)?;

        let role = quote
            .role_for_identifier(&identifier)
            .ok_or(CountersignError::Unauthorized)?;

        debug!(
            quote_id = %quote.quote_id,
            role = %role,
            identifier = %short_identifier(&identifier),
            "Token resolved"
        );
        Ok((quote, role))
    }
}
