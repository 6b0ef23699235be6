//! Document store interface
//!
//! The signing workflow reads quotes and blobs and performs its one state
//! transition through [`DocumentStore`]. Implementations:
//!
//! - [`MongoDocumentStore`]: `quotes` collection plus GridFS (production)
//! - [`InMemoryDocumentStore`]: process-local maps (tests, local development)

pub mod memory;
pub mod mongo;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::db::QuoteDoc;
use crate::types::{BlobKind, BlobRef, Result, Role};

pub use memory::InMemoryDocumentStore;
pub use mongo::MongoDocumentStore;

/// The completed-signature fields written for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureRecord {
    pub signed_at: DateTime<Utc>,
    pub artifact_ref: BlobRef,
}

/// Trait for quote and blob storage (allows swapping backends and test doubles)
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Quote whose buyer or seller carries this token identifier
    async fn find_by_token_identifier(&self, identifier: &str) -> Result<Option<QuoteDoc>>;

    /// Quote by its caller-assigned id
    async fn find_quote(&self, quote_id: &str) -> Result<Option<QuoteDoc>>;

    /// Most recently stored blob of `kind` for the quote (and role, when given)
    async fn get_blob(
        &self,
        kind: BlobKind,
        quote_id: &str,
        role: Option<Role>,
    ) -> Result<Option<Bytes>>;

    /// Blob by reference
    async fn get_blob_by_ref(&self, blob_ref: BlobRef) -> Result<Option<Bytes>>;

    /// Store a new immutable blob
    async fn put_blob(
        &self,
        bytes: Bytes,
        kind: BlobKind,
        quote_id: &str,
        role: Option<Role>,
    ) -> Result<BlobRef>;

    /// Atomically mark `role` signed with `record` and recompute the status,
    /// only if `role` is not signed yet.
    ///
    /// Returns `false` when the quote is missing or the role was already
    /// signed; nothing is written in that case.
    async fn commit_signature(
        &self,
        quote_id: &str,
        role: Role,
        record: SignatureRecord,
    ) -> Result<bool>;
}
