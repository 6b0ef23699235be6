//! Shared types for Countersign

mod error;
mod quote;

pub use error::{CountersignError, Result};
pub use quote::{BlobKind, BlobRef, QuoteStatus, Role};
