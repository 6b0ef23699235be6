//! Read-only view of a token's signing position

use serde::Serialize;

use crate::db::QuoteDoc;
use crate::types::{QuoteStatus, Role};

/// What a bearer token may sign, as shown on the signing form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningSession {
    pub quote_id: String,
    pub role: Role,
    /// Whether this role has already signed
    pub signed: bool,
    pub status: QuoteStatus,
}

impl SigningSession {
    pub fn from_quote(quote: &QuoteDoc, role: Role) -> Self {
        Self {
            quote_id: quote.quote_id.clone(),
            role,
            signed: quote.party(role).signed,
            status: quote.derived_status(),
        }
    }

    /// Suggested download name for this role's signed copy
    pub fn filename(&self) -> String {
        signed_filename(&self.quote_id, self.role)
    }
}

/// `{quote_id}-{role}-signed.pdf`
pub fn signed_filename(quote_id: &str, role: Role) -> String {
    format!("{}-{}-signed.pdf", quote_id, role)
}
