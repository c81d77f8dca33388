//! Pre-scheduling validation.
//!
//! Everything here runs before the scheduler dispatches anything, so a
//! declaration set that fails validation causes zero remote calls.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use stratus_core::LogicalName;
use stratus_provider::ResourceKind;

use crate::declaration::{Declaration, Value};
use crate::rest::MAX_INTEGRATION_TIMEOUT_MS;
use crate::stream::StartingPosition;

/// A declaration set failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Two declarations share a logical name.
    #[error("duplicate logical name '{name}'")]
    DuplicateName {
        /// The duplicated name.
        name: LogicalName,
    },

    /// An integration timeout is outside the provider bound.
    #[error("integration '{name}' timeout {timeout_ms} ms is out of bounds (must be positive and at most {MAX_INTEGRATION_TIMEOUT_MS} ms)")]
    IntegrationTimeoutOutOfBounds {
        /// The integration declaration.
        name: LogicalName,
        /// The rejected timeout.
        timeout_ms: i64,
    },

    /// A required property is missing.
    #[error("declaration '{name}' is missing required property '{property}'")]
    MissingProperty {
        /// The declaration.
        name: LogicalName,
        /// The missing property.
        property: &'static str,
    },

    /// A stream binding declares an unknown starting position.
    #[error("stream binding '{name}' has invalid starting position '{value}' (expected LATEST or TRIM_HORIZON)")]
    InvalidStartingPosition {
        /// The stream binding declaration.
        name: LogicalName,
        /// The rejected value.
        value: String,
    },

    /// A stream binding's event source is not a table declaration.
    #[error("stream binding '{binding}' sources from '{target}', which is not a table")]
    StreamSourceNotATable {
        /// The stream binding declaration.
        binding: LogicalName,
        /// The referenced declaration.
        target: LogicalName,
    },

    /// A stream binding sources from a table without streaming enabled.
    #[error("stream binding '{binding}' sources from table '{table}' which does not enable streaming")]
    StreamSourceNotStreaming {
        /// The stream binding declaration.
        binding: LogicalName,
        /// The table declaration.
        table: LogicalName,
    },
}

/// Validate a declaration set.
///
/// Returns the first violation found; declarations are checked in input
/// order.
pub fn validate(declarations: &[Declaration]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for declaration in declarations {
        if !seen.insert(declaration.name().clone()) {
            return Err(ValidationError::DuplicateName {
                name: declaration.name().clone(),
            });
        }
    }

    let by_name: BTreeMap<&LogicalName, &Declaration> = declarations
        .iter()
        .map(|declaration| (declaration.name(), declaration))
        .collect();

    for declaration in declarations {
        match declaration.kind() {
            ResourceKind::Integration => validate_integration(declaration)?,
            ResourceKind::StreamBinding => validate_stream_binding(declaration, &by_name)?,
            _ => {}
        }
    }
    Ok(())
}

fn validate_integration(declaration: &Declaration) -> Result<(), ValidationError> {
    // A timeout supplied by reference cannot be checked before the run.
    let Some(Value::Literal(raw)) = declaration.property("timeout_ms") else {
        return Ok(());
    };
    let Some(timeout_ms) = raw.as_i64() else {
        return Err(ValidationError::IntegrationTimeoutOutOfBounds {
            name: declaration.name().clone(),
            timeout_ms: -1,
        });
    };
    if timeout_ms <= 0 || timeout_ms as u64 > MAX_INTEGRATION_TIMEOUT_MS {
        return Err(ValidationError::IntegrationTimeoutOutOfBounds {
            name: declaration.name().clone(),
            timeout_ms,
        });
    }
    Ok(())
}

fn validate_stream_binding(
    declaration: &Declaration,
    by_name: &BTreeMap<&LogicalName, &Declaration>,
) -> Result<(), ValidationError> {
    match declaration.property("starting_position") {
        None => {
            return Err(ValidationError::MissingProperty {
                name: declaration.name().clone(),
                property: "starting_position",
            });
        }
        Some(Value::Literal(raw)) => {
            let text = raw.as_str().unwrap_or_default();
            if text.parse::<StartingPosition>().is_err() {
                return Err(ValidationError::InvalidStartingPosition {
                    name: declaration.name().clone(),
                    value: text.to_string(),
                });
            }
        }
        Some(Value::Reference { .. }) => {}
    }

    // When the event source is a reference we can check the table's
    // declared streaming mode before anything runs.
    if let Some(Value::Reference { source, .. }) = declaration.property("event_source_arn") {
        if let Some(table) = by_name.get(source) {
            if table.kind() != ResourceKind::Table {
                return Err(ValidationError::StreamSourceNotATable {
                    binding: declaration.name().clone(),
                    target: source.clone(),
                });
            }
            let streaming = table
                .property("stream_enabled")
                .and_then(Value::as_literal)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if !streaming {
                return Err(ValidationError::StreamSourceNotStreaming {
                    binding: declaration.name().clone(),
                    table: source.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Declaration;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn integration(timeout_ms: i64) -> Declaration {
        Declaration::builder(ResourceKind::Integration, name("video-integration"))
            .literal("timeout_ms", timeout_ms)
            .build()
    }

    fn streaming_table() -> Declaration {
        Declaration::builder(ResourceKind::Table, name("video"))
            .literal("stream_enabled", true)
            .build()
    }

    fn binding(position: &str) -> Declaration {
        Declaration::builder(ResourceKind::StreamBinding, name("trigger"))
            .literal("starting_position", position)
            .reference("event_source_arn", name("video"), "stream_arn")
            .build()
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let declarations = vec![streaming_table(), streaming_table()];
        assert_eq!(
            validate(&declarations),
            Err(ValidationError::DuplicateName { name: name("video") })
        );
    }

    #[test]
    fn test_timeout_at_bound_accepted() {
        assert!(validate(&[integration(29_000)]).is_ok());
    }

    #[test]
    fn test_timeout_above_bound_rejected() {
        assert_eq!(
            validate(&[integration(30_000)]),
            Err(ValidationError::IntegrationTimeoutOutOfBounds {
                name: name("video-integration"),
                timeout_ms: 30_000,
            })
        );
    }

    #[test]
    fn test_timeout_must_be_positive() {
        assert!(validate(&[integration(0)]).is_err());
        assert!(validate(&[integration(-5)]).is_err());
    }

    #[test]
    fn test_stream_binding_against_streaming_table() {
        assert!(validate(&[streaming_table(), binding("LATEST")]).is_ok());
        assert!(validate(&[streaming_table(), binding("TRIM_HORIZON")]).is_ok());
    }

    #[test]
    fn test_stream_binding_bad_position() {
        assert_eq!(
            validate(&[streaming_table(), binding("YESTERDAY")]),
            Err(ValidationError::InvalidStartingPosition {
                name: name("trigger"),
                value: "YESTERDAY".to_string(),
            })
        );
    }

    #[test]
    fn test_stream_binding_requires_streaming_table() {
        let table = Declaration::builder(ResourceKind::Table, name("video")).build();
        assert_eq!(
            validate(&[table, binding("LATEST")]),
            Err(ValidationError::StreamSourceNotStreaming {
                binding: name("trigger"),
                table: name("video"),
            })
        );
    }

    #[test]
    fn test_stream_binding_source_must_be_table() {
        let bucket = Declaration::builder(ResourceKind::Bucket, name("video")).build();
        assert_eq!(
            validate(&[bucket, binding("LATEST")]),
            Err(ValidationError::StreamSourceNotATable {
                binding: name("trigger"),
                target: name("video"),
            })
        );
    }
}
