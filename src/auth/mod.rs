//! Token authentication for Countersign
//!
//! Provides:
//! - Keyed token identifiers (HMAC-SHA256 with the server secret)
//! - Token issuance for seeding quotes
//! - Resolution of a bearer token to its quote and role

pub mod authenticator;
pub mod token;

pub use authenticator::TokenAuthenticator;
pub use token::{short_identifier, IssuedToken, TokenHasher};
