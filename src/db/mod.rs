//! Database layer for Countersign
//!
//! MongoDB client wrapper, typed collections and document schemas.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{Metadata, PartyDoc, QuoteDoc, QUOTE_COLLECTION};
