//! Bearer token identifiers
//!
//! A bearer token is turned into a stable identifier with HMAC-SHA256 keyed by
//! the server's signing secret. Only the identifier is stored; without the
//! secret an identifier leaked from the database cannot be turned back into a
//! usable token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;

use crate::types::CountersignError;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes in a freshly issued token
const TOKEN_BYTES: usize = 32;

/// Keyed hasher for bearer tokens.
///
/// Holds the already-keyed MAC state; each call clones it, so hashing never
/// fails and the secret is read once at startup.
#[derive(Clone)]
pub struct TokenHasher {
    mac: HmacSha256,
}

impl TokenHasher {
    pub fn new(secret: &str) -> Result<Self, CountersignError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(CountersignError::Config("signing secret must not be empty".into()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| CountersignError::Config(format!("invalid signing secret: {e}")))?;
        Ok(Self { mac })
    }

    /// Lowercase hex HMAC-SHA256 of the token
    pub fn identifier(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Mint a new random token together with its identifier.
    ///
    /// The token is only ever available here; hand it to the party out of band.
    pub fn issue(&self) -> IssuedToken {
        let mut raw = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let identifier = self.identifier(&token);
        IssuedToken { token, identifier }
    }
}

impl fmt::Debug for TokenHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenHasher").finish_non_exhaustive()
    }
}

/// A newly minted bearer token and the identifier to store for it
pub struct IssuedToken {
    pub token: String,
    pub identifier: String,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Shortened identifier for log lines
pub fn short_identifier(identifier: &str) -> &str {
    identifier.get(..12).unwrap_or(identifier)
}
