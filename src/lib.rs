//! Countersign - two-party quote co-signing
//!
//! A quote PDF is countersigned by a buyer and a seller. Each party holds an
//! opaque bearer token; presenting it together with a signature image stamps
//! the image onto page 1 of the original quote and advances the quote's
//! signing status.
//!
//! ## Components
//!
//! - **auth**: keyed token identifiers and token → (quote, role) resolution
//! - **compositor**: deterministic signature overlay onto a PDF page
//! - **signing**: the signing workflow controller and its state machine
//! - **store**: the document/blob store interface with in-memory and
//!   MongoDB/GridFS implementations
//! - **server** / **routes**: the thin HTTP surface

pub mod auth;
pub mod compositor;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod signing;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CountersignError, Result};
