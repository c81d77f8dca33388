//! CLI error types and exit codes

use thiserror::Error;

use stratus_provisioning::ProvisioningError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Deployment incomplete (failed or skipped declarations)
/// - 4: Validation or graph error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Deployment incomplete: {failed} failed, {skipped} skipped, {cancelled} cancelled")]
    Incomplete {
        failed: usize,
        skipped: usize,
        cancelled: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation(_) => 4,
            CliError::Io(_) => 1,
            CliError::Serialization(_) => 1,
            CliError::Incomplete { .. } => 2,
            CliError::Provisioning(inner) => match inner {
                ProvisioningError::Graph(_)
                | ProvisioningError::Validation(_)
                | ProvisioningError::Name(_) => 4,
                ProvisioningError::UnresolvedReference { .. }
                | ProvisioningError::Internal { .. } => 1,
            },
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}
