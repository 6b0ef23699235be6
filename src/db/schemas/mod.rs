//! Database schemas for Countersign
//!
//! Defines MongoDB document structures for quotes.

mod metadata;
mod quote;

pub use metadata::Metadata;
pub use quote::{PartyDoc, QuoteDoc, QUOTE_COLLECTION};
