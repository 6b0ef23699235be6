//! In-memory document store
//!
//! Quotes and blobs live in process memory behind async locks. The quote map
//! lock is held across the check and the write in `commit_signature`, which
//! gives the same at-most-once guarantee as the conditional update in MongoDB.

use bson::DateTime as BsonDateTime;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{DocumentStore, SignatureRecord};
use crate::db::{Metadata, QuoteDoc};
use crate::types::{BlobKind, BlobRef, CountersignError, Result, Role};

#[derive(Debug, Clone)]
struct StoredBlob {
    blob_ref: BlobRef,
    kind: BlobKind,
    quote_id: String,
    role: Option<Role>,
    bytes: Bytes,
}

/// Simple in-memory document store
#[derive(Default)]
pub struct InMemoryDocumentStore {
    quotes: Arc<RwLock<HashMap<String, QuoteDoc>>>,
    /// Append-only, in upload order
    blobs: Arc<RwLock<Vec<StoredBlob>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a quote. Fails if the quote id is taken.
    pub async fn insert_quote(&self, mut quote: QuoteDoc) -> Result<()> {
        let mut quotes = self.quotes.write().await;
        if quotes.contains_key(&quote.quote_id) {
            return Err(CountersignError::Persistence(format!(
                "quote {} already exists",
                quote.quote_id
            )));
        }
        quote.status = quote.derived_status();
        if quote.metadata == Metadata::default() {
            quote.metadata = Metadata::new();
        }
        quotes.insert(quote.quote_id.clone(), quote);
        Ok(())
    }

    /// Number of stored blobs matching kind, quote and role
    pub async fn blob_count(&self, kind: BlobKind, quote_id: &str, role: Option<Role>) -> usize {
        self.blobs
            .read()
            .await
            .iter()
            .filter(|b| b.kind == kind && b.quote_id == quote_id && b.role == role)
            .count()
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_by_token_identifier(&self, identifier: &str) -> Result<Option<QuoteDoc>> {
        Ok(self
            .quotes
            .read()
            .await
            .values()
            .find(|q| q.role_for_identifier(identifier).is_some())
            .cloned())
    }

    async fn find_quote(&self, quote_id: &str) -> Result<Option<QuoteDoc>> {
        Ok(self.quotes.read().await.get(quote_id).cloned())
    }

    async fn get_blob(
        &self,
        kind: BlobKind,
        quote_id: &str,
        role: Option<Role>,
    ) -> Result<Option<Bytes>> {
        Ok(self
            .blobs
            .read()
            .await
            .iter()
            .rev()
            .find(|b| {
                b.kind == kind && b.quote_id == quote_id && (role.is_none() || b.role == role)
            })
            .map(|b| b.bytes.clone()))
    }

    async fn get_blob_by_ref(&self, blob_ref: BlobRef) -> Result<Option<Bytes>> {
        Ok(self
            .blobs
            .read()
            .await
            .iter()
            .find(|b| b.blob_ref == blob_ref)
            .map(|b| b.bytes.clone()))
    }

    async fn put_blob(
        &self,
        bytes: Bytes,
        kind: BlobKind,
        quote_id: &str,
        role: Option<Role>,
    ) -> Result<BlobRef> {
        let blob_ref = BlobRef::new();
        self.blobs.write().await.push(StoredBlob {
            blob_ref,
            kind,
            quote_id: quote_id.to_string(),
            role,
            bytes,
        });
        Ok(blob_ref)
    }

    async fn commit_signature(
        &self,
        quote_id: &str,
        role: Role,
        record: SignatureRecord,
    ) -> Result<bool> {
        let mut quotes = self.quotes.write().await;
        let Some(quote) = quotes.get_mut(quote_id) else {
            return Ok(false);
        };
        if quote.party(role).signed {
            return Ok(false);
        }

        let party = quote.party_mut(role);
        party.signed = true;
        party.signed_at = Some(BsonDateTime::from_chrono(record.signed_at));
        party.signed_artifact_ref = Some(record.artifact_ref);
        quote.status = quote.derived_status();
        quote.metadata.updated_at = Some(BsonDateTime::now());
        Ok(true)
    }
}
