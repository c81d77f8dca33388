//! Table stream bindings.
//!
//! A stream binding wires a table's ordered change feed (insert/update/
//! delete records, carrying old and new item images when the table
//! enables them) to a consumer function. The binding depends on the table
//! being created with streaming enabled and on the consumer function
//! existing.
//!
//! Records are delivered at least once; consumers must tolerate
//! redelivery. That contract is documented here and carried by the
//! binding, not enforced by it.

use std::fmt;
use std::str::FromStr;

use stratus_core::LogicalName;
use stratus_provider::ResourceKind;

use crate::declaration::Declaration;

/// Where consumption starts when a binding first attaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartingPosition {
    /// Start at the tip of the stream.
    #[default]
    Latest,
    /// Start at the oldest retained record.
    TrimHorizon,
}

impl StartingPosition {
    /// The string representation used in resource properties.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StartingPosition::Latest => "LATEST",
            StartingPosition::TrimHorizon => "TRIM_HORIZON",
        }
    }
}

impl fmt::Display for StartingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StartingPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LATEST" => Ok(StartingPosition::Latest),
            "TRIM_HORIZON" => Ok(StartingPosition::TrimHorizon),
            other => Err(format!("unknown starting position: {other}")),
        }
    }
}

/// Builder for a stream binding declaration.
#[derive(Debug)]
pub struct StreamBindingBuilder {
    name: LogicalName,
    table: LogicalName,
    function: LogicalName,
    starting_position: StartingPosition,
}

impl StreamBindingBuilder {
    /// Bind `table`'s change stream to `function`.
    #[must_use]
    pub fn new(name: LogicalName, table: LogicalName, function: LogicalName) -> Self {
        Self {
            name,
            table,
            function,
            starting_position: StartingPosition::default(),
        }
    }

    /// Set the starting position (default [`StartingPosition::Latest`]).
    #[must_use]
    pub fn starting_position(mut self, position: StartingPosition) -> Self {
        self.starting_position = position;
        self
    }

    /// Emit the binding declaration.
    #[must_use]
    pub fn build(self) -> Declaration {
        Declaration::builder(ResourceKind::StreamBinding, self.name)
            .reference("event_source_arn", self.table, "stream_arn")
            .reference("function", self.function, "arn")
            .literal("starting_position", self.starting_position.as_str())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Value;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    #[test]
    fn test_starting_position_round_trip() {
        for position in [StartingPosition::Latest, StartingPosition::TrimHorizon] {
            assert_eq!(position.as_str().parse::<StartingPosition>(), Ok(position));
        }
        assert!("AT_TIMESTAMP".parse::<StartingPosition>().is_err());
    }

    #[test]
    fn test_binding_references_table_and_function() {
        let binding = StreamBindingBuilder::new(
            name("openSearchLambdaTrigger"),
            name("video"),
            name("opensearchTransformer"),
        )
        .starting_position(StartingPosition::Latest)
        .build();

        assert_eq!(binding.kind(), ResourceKind::StreamBinding);
        assert_eq!(
            binding.property("event_source_arn"),
            Some(&Value::reference(name("video"), "stream_arn"))
        );
        assert_eq!(
            binding.property("function"),
            Some(&Value::reference(name("opensearchTransformer"), "arn"))
        );
        assert_eq!(
            binding.property("starting_position"),
            Some(&Value::literal("LATEST"))
        );
    }
}
