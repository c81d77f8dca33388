//! Strongly Typed Identifiers
//!
//! This module provides type-safe identifier types for stratus.
//! Using the newtype pattern, these types prevent accidental misuse of
//! different ID types at compile time.
//!
//! # Example
//!
//! ```
//! use stratus_core::{LogicalName, RunId};
//!
//! let table = LogicalName::new("video-table").unwrap();
//! let run = RunId::new();
//!
//! // Type safety: cannot pass a RunId where a LogicalName is expected
//! fn requires_name(name: &LogicalName) -> String {
//!     name.to_string()
//! }
//!
//! let result = requires_name(&table);
//! // requires_name(&run); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// Macro to define a strongly-typed UUID-backed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s)
                    .map(Self)
                    .map_err(|e| CoreError::InvalidId {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id! {
    /// Identifier for a single deployment run.
    ///
    /// A fresh `RunId` is minted for every plan/apply invocation and
    /// appears in tracing spans and apply reports.
    RunId
}

/// The logical name of a resource declaration.
///
/// Logical names identify declarations within a deployment and are the
/// addressing scheme for cross-resource references. They must be unique
/// within a declaration set.
///
/// Valid names are non-empty and consist of ASCII alphanumerics, `-`,
/// `_`, and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalName(String);

impl LogicalName {
    /// Create a logical name, validating the character set.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::InvalidLogicalName {
                name,
                reason: "must not be empty",
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(CoreError::InvalidLogicalName {
                name,
                reason: "may only contain ASCII alphanumerics, '-', '_' and '.'",
            });
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LogicalName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogicalName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LogicalName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalName> for String {
    fn from(name: LogicalName) -> Self {
        name.0
    }
}

impl AsRef<str> for LogicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_run_id_round_trip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_logical_name_valid() {
        let name = LogicalName::new("controller_lambda-v2.0").unwrap();
        assert_eq!(name.as_str(), "controller_lambda-v2.0");
    }

    #[test]
    fn test_logical_name_empty() {
        assert!(LogicalName::new("").is_err());
    }

    #[test]
    fn test_logical_name_bad_characters() {
        assert!(LogicalName::new("video table").is_err());
        assert!(LogicalName::new("video/table").is_err());
    }

    #[test]
    fn test_logical_name_ordering_is_lexicographic() {
        let a = LogicalName::new("alpha").unwrap();
        let b = LogicalName::new("beta").unwrap();
        assert!(a < b);
    }
}
