//! Resource declarations and property values.
//!
//! A [`Declaration`] is an immutable description of one desired resource:
//! its kind, logical name, property values, and explicit dependencies.
//! Property values are either concrete JSON ([`Value::Literal`]) or a
//! [`Value::Reference`] to an attribute of another declaration that only
//! resolves once that resource is provisioned.
//!
//! In manifests, a reference is written as a single-key object:
//!
//! ```yaml
//! uri:
//!   $ref: controllerLambda.invocation_address
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;

use stratus_core::LogicalName;
use stratus_provider::ResourceKind;

const REF_KEY: &str = "$ref";

/// A property value of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A concrete scalar or JSON document, passed through untouched.
    Literal(serde_json::Value),
    /// A reference to an attribute of another declaration, unresolved
    /// until that declaration's remote call returns.
    Reference {
        /// Logical name of the referenced declaration.
        source: LogicalName,
        /// Attribute to read from the referenced declaration.
        attribute: String,
    },
}

impl Value {
    /// Create a literal value.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Create a reference to another declaration's attribute.
    pub fn reference(source: LogicalName, attribute: impl Into<String>) -> Self {
        Self::Reference {
            source,
            attribute: attribute.into(),
        }
    }

    /// View this value as a reference, if it is one.
    #[must_use]
    pub fn as_reference(&self) -> Option<(&LogicalName, &str)> {
        match self {
            Value::Reference { source, attribute } => Some((source, attribute)),
            Value::Literal(_) => None,
        }
    }

    /// View this value as a literal, if it is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Literal(value) => Some(value),
            Value::Reference { .. } => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Literal(value) => value.serialize(serializer),
            Value::Reference { source, attribute } => {
                json!({ REF_KEY: format!("{source}.{attribute}") }).serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if let Some(map) = raw.as_object() {
            if map.len() == 1 {
                if let Some(target) = map.get(REF_KEY) {
                    let target = target.as_str().ok_or_else(|| {
                        DeError::custom("$ref target must be a 'name.attribute' string")
                    })?;
                    let (source, attribute) = target.split_once('.').ok_or_else(|| {
                        DeError::custom(format!(
                            "$ref target '{target}' must have the form 'name.attribute'"
                        ))
                    })?;
                    let source = LogicalName::new(source).map_err(DeError::custom)?;
                    return Ok(Value::Reference {
                        source,
                        attribute: attribute.to_string(),
                    });
                }
            }
        }
        Ok(Value::Literal(raw))
    }
}

/// An immutable description of one desired resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    name: LogicalName,
    kind: ResourceKind,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    depends_on: BTreeSet<LogicalName>,
}

impl Declaration {
    /// Start building a declaration.
    #[must_use]
    pub fn builder(kind: ResourceKind, name: LogicalName) -> DeclarationBuilder {
        DeclarationBuilder {
            declaration: Declaration {
                name,
                kind,
                properties: BTreeMap::new(),
                depends_on: BTreeSet::new(),
            },
        }
    }

    /// The declaration's logical name.
    #[must_use]
    pub fn name(&self) -> &LogicalName {
        &self.name
    }

    /// The kind of resource declared.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The declared properties, in name order.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Get a property value.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// The explicitly declared dependencies.
    #[must_use]
    pub fn depends_on(&self) -> &BTreeSet<LogicalName> {
        &self.depends_on
    }

    /// Iterate over every reference in the declaration's properties.
    pub fn references(&self) -> impl Iterator<Item = (&LogicalName, &str)> {
        self.properties.values().filter_map(Value::as_reference)
    }

    /// All dependencies: explicit entries plus reference-induced ones.
    pub fn dependencies(&self) -> BTreeSet<&LogicalName> {
        self.depends_on
            .iter()
            .chain(self.references().map(|(source, _)| source))
            .collect()
    }
}

/// Builder for [`Declaration`].
#[derive(Debug)]
pub struct DeclarationBuilder {
    declaration: Declaration,
}

impl DeclarationBuilder {
    /// Set a property to an arbitrary value.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.declaration.properties.insert(name.into(), value);
        self
    }

    /// Set a property to a literal value.
    #[must_use]
    pub fn literal(self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.property(name, Value::literal(value))
    }

    /// Set a property to a reference to another declaration's attribute.
    #[must_use]
    pub fn reference(
        self,
        name: impl Into<String>,
        source: LogicalName,
        attribute: impl Into<String>,
    ) -> Self {
        self.property(name, Value::reference(source, attribute))
    }

    /// Add an explicit dependency.
    #[must_use]
    pub fn depends_on(mut self, name: LogicalName) -> Self {
        self.declaration.depends_on.insert(name);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Declaration {
        self.declaration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    #[test]
    fn test_builder_collects_properties_and_dependencies() {
        let decl = Declaration::builder(ResourceKind::Integration, name("video-integration"))
            .literal("type", "AWS_PROXY")
            .literal("timeout_ms", 29_000)
            .reference("uri", name("controllerLambda"), "invocation_address")
            .depends_on(name("postVideoMethod"))
            .build();

        assert_eq!(decl.kind(), ResourceKind::Integration);
        assert_eq!(decl.properties().len(), 3);
        assert_eq!(
            decl.references().collect::<Vec<_>>(),
            vec![(&name("controllerLambda"), "invocation_address")]
        );

        let deps = decl.dependencies();
        assert!(deps.contains(&name("postVideoMethod")));
        assert!(deps.contains(&name("controllerLambda")));
    }

    #[test]
    fn test_value_ref_deserialization() {
        let value: Value = serde_json::from_str(r#"{"$ref": "video.stream_arn"}"#).unwrap();
        assert_eq!(
            value.as_reference(),
            Some((&name("video"), "stream_arn"))
        );
    }

    #[test]
    fn test_value_literal_object_is_not_a_ref() {
        let value: Value =
            serde_json::from_str(r#"{"$ref": "video.stream_arn", "other": 1}"#).unwrap();
        assert!(value.as_literal().is_some());
    }

    #[test]
    fn test_value_bad_ref_target() {
        let result: Result<Value, _> = serde_json::from_str(r#"{"$ref": "no-dot"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_value_serialization_round_trip() {
        let original = Value::reference(name("video"), "stream_arn");
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, decoded);

        let literal = Value::literal(json!({"Version": "2012-10-17"}));
        let encoded = serde_json::to_string(&literal).unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(literal, decoded);
    }
}
