//! Error Types
//!
//! Standardized error types shared across stratus crates.
//!
//! # Example
//!
//! ```
//! use stratus_core::{CoreError, LogicalName, Result};
//!
//! fn parse_name(raw: &str) -> Result<LogicalName> {
//!     LogicalName::new(raw)
//! }
//!
//! assert!(parse_name("video-table").is_ok());
//! assert!(parse_name("").is_err());
//! ```

use thiserror::Error;

/// Standardized error type for stratus core types.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// A logical name failed validation.
    #[error("invalid logical name '{name}': {reason}")]
    InvalidLogicalName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A typed ID failed to parse.
    #[error("failed to parse {id_type}: {message}")]
    InvalidId {
        /// The type of ID that failed to parse.
        id_type: &'static str,
        /// The underlying parse error message.
        message: String,
    },
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
