//! Core types and error handling for fetchbin.
//!
//! - [`error`] - The stage-tagged error taxonomy and CLI error reporting

pub mod error;

pub use error::{ErrorContext, FetchbinError, user_friendly_error};

/// Result alias used by the provisioning stages.
pub type Result<T> = std::result::Result<T, FetchbinError>;
