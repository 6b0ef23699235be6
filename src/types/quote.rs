//! Quote workflow vocabulary: roles, status and blob references

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two signing parties on a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Buyer, Role::Seller];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall signing status of a quote.
///
/// Always derived from the two parties' `signed` flags via [`QuoteStatus::from_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Pending,
    BuyerSigned,
    SellerSigned,
    FullySigned,
}

impl QuoteStatus {
    pub fn from_flags(buyer_signed: bool, seller_signed: bool) -> Self {
        match (buyer_signed, seller_signed) {
            (true, true) => QuoteStatus::FullySigned,
            (true, false) => QuoteStatus::BuyerSigned,
            (false, true) => QuoteStatus::SellerSigned,
            (false, false) => QuoteStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::BuyerSigned => "buyer_signed",
            QuoteStatus::SellerSigned => "seller_signed",
            QuoteStatus::FullySigned => "fully_signed",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stored blob holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    Original,
    Signed,
}

impl BlobKind {
    /// Value of `metadata.type` on GridFS files
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobKind::Original => "quote_original",
            BlobKind::Signed => "quote_signed",
        }
    }
}

/// Store-assigned reference to an immutable blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(ObjectId);

impl BlobRef {
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    pub fn from_object_id(id: ObjectId) -> Self {
        Self(id)
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for BlobRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
