//! HTTP routes for Countersign

pub mod health;
pub mod sign;

pub use health::{health_check, version_info};
pub use sign::{error_response, handle_sign_form, handle_sign_submit};
