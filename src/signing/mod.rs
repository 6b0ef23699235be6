//! Quote Signing Workflow
//!
//! Orchestrates one signing attempt for a bearer token: resolve the token to
//! its quote and role, compose the signature onto the original PDF, store the
//! signed copy and record the signature.
//!
//! # State machine
//!
//! ```text
//!             ┌──────────────┐
//!       ┌────▶│ buyer_signed │────┐
//!       │     └──────────────┘    ▼
//!  pending                    fully_signed
//!       │     ┌───────────────┐   ▲
//!       └────▶│ seller_signed │───┘
//!             └───────────────┘
//! ```
//!
//! Each role moves from unsigned to signed exactly once. Repeating a
//! signature returns the stored artifact instead of composing a new one.

pub mod service;
pub mod session;

pub use service::{SignedArtifact, SigningController};
pub use session::SigningSession;
