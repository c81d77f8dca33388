//! stratus Core Library
//!
//! Shared types for the stratus provisioning orchestrator.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (`LogicalName`, `RunId`)
//! - [`error`] - Standardized error types (`CoreError`)
//!
//! # Example
//!
//! ```
//! use stratus_core::{LogicalName, RunId};
//!
//! let name = LogicalName::new("controller-lambda").unwrap();
//! let run = RunId::new();
//!
//! assert_eq!(name.as_str(), "controller-lambda");
//! assert_ne!(run, RunId::new());
//! ```

pub mod error;
pub mod ids;

// Re-export main types for convenient access
pub use error::{CoreError, Result};
pub use ids::{LogicalName, RunId};
