//! Quote document schema
//!
//! One document per quote, holding both signing parties. Field names match
//! the collection written by earlier deployments (`token_hash`, `file_id`).

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::{BlobRef, QuoteStatus, Role};

/// Collection name for quotes
pub const QUOTE_COLLECTION: &str = "quotes";

/// One signing party of a quote
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PartyDoc {
    /// HMAC of the party's bearer token. The token itself is never stored.
    #[serde(rename = "token_hash")]
    pub token_identifier: String,

    #[serde(default)]
    pub signed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime>,

    /// Reference to the signed PDF blob
    #[serde(rename = "file_id", default, skip_serializing_if = "Option::is_none")]
    pub signed_artifact_ref: Option<BlobRef>,
}

impl PartyDoc {
    pub fn unsigned(token_identifier: impl Into<String>) -> Self {
        Self {
            token_identifier: token_identifier.into(),
            signed: false,
            signed_at: None,
            signed_artifact_ref: None,
        }
    }

    /// Artifact reference of a completed signature
    pub fn artifact(&self) -> Option<BlobRef> {
        if self.signed {
            self.signed_artifact_ref
        } else {
            None
        }
    }
}

/// Quote document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct QuoteDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub quote_id: String,

    /// Stored copy of the derived status, kept for external readers
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: QuoteStatus,

    pub buyer: PartyDoc,

    pub seller: PartyDoc,

    #[serde(default)]
    pub metadata: Metadata,
}

impl QuoteDoc {
    /// Create an unsigned quote for the two token identifiers
    pub fn new(
        quote_id: impl Into<String>,
        buyer_identifier: impl Into<String>,
        seller_identifier: impl Into<String>,
    ) -> Self {
        Self {
            _id: None,
            quote_id: quote_id.into(),
            status: QuoteStatus::Pending,
            buyer: PartyDoc::unsigned(buyer_identifier),
            seller: PartyDoc::unsigned(seller_identifier),
            metadata: Metadata::new(),
        }
    }

    pub fn party(&self, role: Role) -> &PartyDoc {
        match role {
            Role::Buyer => &self.buyer,
            Role::Seller => &self.seller,
        }
    }

    pub fn party_mut(&mut self, role: Role) -> &mut PartyDoc {
        match role {
            Role::Buyer => &mut self.buyer,
            Role::Seller => &mut self.seller,
        }
    }

    /// Status derived from the two `signed` flags
    pub fn derived_status(&self) -> QuoteStatus {
        QuoteStatus::from_flags(self.buyer.signed, self.seller.signed)
    }

    /// Which role, if any, holds the given token identifier. Buyer wins a tie.
    pub fn role_for_identifier(&self, identifier: &str) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.party(*role).token_identifier == identifier)
    }
}

/// Legacy rows may carry a malformed status string; the flags are
/// authoritative, so anything unrecognised reads as pending.
fn lenient_status<'de, D>(deserializer: D) -> Result<QuoteStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("buyer_signed") => QuoteStatus::BuyerSigned,
        Some("seller_signed") => QuoteStatus::SellerSigned,
        Some("fully_signed") => QuoteStatus::FullySigned,
        _ => QuoteStatus::Pending,
    })
}

impl IntoIndexes for QuoteDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "quote_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("quote_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "buyer.token_hash": 1 },
                Some(
                    IndexOptions::builder()
                        .name("buyer_token_hash_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "seller.token_hash": 1 },
                Some(
                    IndexOptions::builder()
                        .name("seller_token_hash_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
