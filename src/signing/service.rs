//! Signing Controller
//!
//! Runs the sign operation end to end against a [`DocumentStore`]. The only
//! write that changes workflow state is `commit_signature`, conditional on the
//! role still being unsigned, so concurrent attempts for one role settle on a
//! single referenced artifact.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::session::{signed_filename, SigningSession};
use crate::auth::TokenAuthenticator;
use crate::compositor::{self, SignatureAnchor};
use crate::db::QuoteDoc;
use crate::store::{DocumentStore, SignatureRecord};
use crate::types::{BlobKind, CountersignError, QuoteStatus, Result, Role};

/// Signed PDF returned to the caller
#[derive(Debug, Clone)]
pub struct SignedArtifact {
    pub quote_id: String,
    pub role: Role,
    pub bytes: Bytes,
    /// True when an earlier signature's artifact was returned instead of a
    /// freshly composed one
    pub reused: bool,
}

impl SignedArtifact {
    pub fn filename(&self) -> String {
        signed_filename(&self.quote_id, self.role)
    }
}

/// Orchestrates signing attempts
pub struct SigningController {
    authenticator: TokenAuthenticator,
    store: Arc<dyn DocumentStore>,
}

impl SigningController {
    pub fn new(authenticator: TokenAuthenticator, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            authenticator,
            store,
        }
    }

    /// Resolve a token to the signing form's view of its quote
    pub async fn session(&self, token: &str) -> Result<SigningSession> {
        let (quote, role) = self.authenticator.resolve(token).await?;
        Ok(SigningSession::from_quote(&quote, role))
    }

    /// Sign the quote the token belongs to with `image` (PNG or JPEG).
    ///
    /// Returns the signed PDF. If the role has already signed, the stored
    /// artifact comes back unchanged and `image` is ignored.
    pub async fn sign(&self, token: &str, image: Bytes) -> Result<SignedArtifact> {
        let (quote, role) = self.authenticator.resolve(token).await?;

        if quote.party(role).signed {
            debug!(quote_id = %quote.quote_id, role = %role, "Already signed, returning stored artifact");
            return self.existing_artifact(&quote, role).await;
        }

        let original = self
            .store
            .get_blob(BlobKind::Original, &quote.quote_id, None)
            .await?
            .ok_or_else(|| {
                warn!(quote_id = %quote.quote_id, role = %role, "Original PDF missing from store");
                CountersignError::MissingOriginal(quote.quote_id.clone())
            })?;

        let anchor = SignatureAnchor::for_role(role);
        let signed = tokio::task::spawn_blocking(move || {
            compositor::compose_at(&original, &image, anchor)
        })
        .await
        .map_err(|e| CountersignError::Internal(format!("compose task failed: {}", e)))??;
        let signed = Bytes::from(signed);

        let artifact_ref = self
            .store
            .put_blob(signed.clone(), BlobKind::Signed, &quote.quote_id, Some(role))
            .await?;

        let record = SignatureRecord {
            signed_at: Utc::now(),
            artifact_ref,
        };
        let committed = match self
            .store
            .commit_signature(&quote.quote_id, role, record)
            .await
        {
            Ok(committed) => committed,
            Err(e) => {
                error!(
                    quote_id = %quote.quote_id,
                    role = %role,
                    blob = %artifact_ref,
                    error = %e,
                    "Failed to record signature; stored blob is orphaned"
                );
                return Err(e);
            }
        };

        if !committed {
            // Another request signed this role between our read and write
            warn!(
                quote_id = %quote.quote_id,
                role = %role,
                blob = %artifact_ref,
                "Lost signing race; returning the recorded artifact"
            );
            let current = self
                .store
                .find_quote(&quote.quote_id)
                .await?
                .filter(|q| q.party(role).signed)
                .ok_or_else(|| {
                    CountersignError::Internal(format!(
                        "quote {} changed during signing",
                        quote.quote_id
                    ))
                })?;
            return self.existing_artifact(&current, role).await;
        }

        info!(
            quote_id = %quote.quote_id,
            role = %role,
            status = %status_after(&quote, role),
            size = signed.len(),
            "Quote signed"
        );

        Ok(SignedArtifact {
            quote_id: quote.quote_id,
            role,
            bytes: signed,
            reused: false,
        })
    }

    /// Artifact recorded for an already signed role. Quotes written before
    /// artifact references were kept fall back to the latest signed blob; a
    /// reference that no longer resolves is an error, never a fallback.
    async fn existing_artifact(&self, quote: &QuoteDoc, role: Role) -> Result<SignedArtifact> {
        let found = match quote.party(role).artifact() {
            Some(blob_ref) => self.store.get_blob_by_ref(blob_ref).await?,
            None => {
                self.store
                    .get_blob(BlobKind::Signed, &quote.quote_id, Some(role))
                    .await?
            }
        };
        let bytes = found.ok_or_else(|| {
            error!(quote_id = %quote.quote_id, role = %role, "Signed artifact missing");
            CountersignError::Internal(format!(
                "signed artifact missing for quote {} ({})",
                quote.quote_id, role
            ))
        })?;

        Ok(SignedArtifact {
            quote_id: quote.quote_id.clone(),
            role,
            bytes,
            reused: true,
        })
    }
}

fn status_after(quote: &QuoteDoc, role: Role) -> QuoteStatus {
    match role {
        Role::Buyer => QuoteStatus::from_flags(true, quote.seller.signed),
        Role::Seller => QuoteStatus::from_flags(quote.buyer.signed, true),
    }
}
