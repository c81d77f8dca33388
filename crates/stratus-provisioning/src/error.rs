//! Provisioning engine error types.

use thiserror::Error;

use stratus_core::{CoreError, LogicalName};

use crate::graph::GraphError;
use crate::validate::ValidationError;

/// Error that can occur while planning or applying a deployment.
///
/// Everything here is fatal to the run as a whole. Failures of individual
/// remote calls are not errors of the engine; they are recorded per
/// declaration in the [`ApplyReport`](crate::report::ApplyReport).
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Graph construction failed (cycle or unknown dependency).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A declaration failed pre-scheduling validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A reference could not be substituted when its declaration was
    /// dispatched.
    ///
    /// The graph guarantees the source has been created by then, so this
    /// is a bug in declaration construction (typically a reference to an
    /// attribute the source never resolves), not a runtime race.
    #[error("unresolved reference in '{declaration}': {source_name}.{attribute}")]
    UnresolvedReference {
        /// The declaration being substituted.
        declaration: LogicalName,
        /// The referenced declaration.
        source_name: LogicalName,
        /// The referenced attribute.
        attribute: String,
    },

    /// A logical name failed validation during construction.
    #[error(transparent)]
    Name(#[from] CoreError),

    /// Internal scheduler invariant violated.
    #[error("internal scheduler error: {message}")]
    Internal { message: String },
}

impl ProvisioningError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for provisioning operations.
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;
