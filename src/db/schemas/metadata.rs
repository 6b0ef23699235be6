//! Common metadata for stored documents
//!
//! Tracks creation and update timestamps.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for stored documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            updated_at: Some(now),
            created_at: Some(now),
        }
    }
}
