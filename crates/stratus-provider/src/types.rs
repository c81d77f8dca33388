//! Provider operation types
//!
//! Types crossing the provisioning/provider boundary: resource kinds,
//! fully resolved specs, provider-assigned identifiers, and resolved
//! attribute maps.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use stratus_core::LogicalName;

/// The kind of cloud resource a declaration describes.
///
/// Kinds are a closed set; the provisioning protocol never needs open
/// extension, and a closed enum keeps substitution and validation
/// exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// An identity role assumable by a service principal.
    Role,
    /// Attachment of a managed policy to a role.
    PolicyAttachment,
    /// A compute function.
    Function,
    /// An append-only table.
    Table,
    /// An object storage bucket.
    Bucket,
    /// The root of a REST API.
    RestApi,
    /// A path resource under a REST API.
    Resource,
    /// An HTTP method on a path resource.
    Method,
    /// The backend integration for a method.
    Integration,
    /// A deployed snapshot of an API's configuration.
    Deployment,
    /// A named, routable stage of a deployment.
    Stage,
    /// An invoke permission granted to a calling principal.
    Permission,
    /// A binding from a table's change stream to a consumer function.
    StreamBinding,
}

impl ResourceKind {
    /// Get all resource kinds.
    #[must_use]
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Role,
            ResourceKind::PolicyAttachment,
            ResourceKind::Function,
            ResourceKind::Table,
            ResourceKind::Bucket,
            ResourceKind::RestApi,
            ResourceKind::Resource,
            ResourceKind::Method,
            ResourceKind::Integration,
            ResourceKind::Deployment,
            ResourceKind::Stage,
            ResourceKind::Permission,
            ResourceKind::StreamBinding,
        ]
    }

    /// Get the string representation used in manifests and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Role => "role",
            ResourceKind::PolicyAttachment => "policy_attachment",
            ResourceKind::Function => "function",
            ResourceKind::Table => "table",
            ResourceKind::Bucket => "bucket",
            ResourceKind::RestApi => "rest_api",
            ResourceKind::Resource => "resource",
            ResourceKind::Method => "method",
            ResourceKind::Integration => "integration",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Stage => "stage",
            ResourceKind::Permission => "permission",
            ResourceKind::StreamBinding => "stream_binding",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::all()
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown resource kind: {s}"))
    }
}

/// Provider-assigned identifier of a live resource.
///
/// Opaque to the provisioning core; only the provider that minted it can
/// interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a resource ID from a provider value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attributes of a resource that are only known once it exists.
///
/// Backed by an ordered map so that identical deployments produce
/// identical attribute listings (and reports) run after run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedAttributes {
    attributes: BTreeMap<String, Value>,
}

impl ResolvedAttributes {
    /// Create an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Set an attribute using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Get a string attribute.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Check if an attribute exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Get the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over all attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    /// Convert into the underlying map.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.attributes
    }
}

impl FromIterator<(String, Value)> for ResolvedAttributes {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

/// A fully resolved resource description handed to a provider.
///
/// Every property is a concrete JSON value; reference substitution has
/// already happened by the time a spec reaches the call layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Logical name of the declaration this spec came from.
    pub name: LogicalName,
    /// The kind of resource to provision.
    pub kind: ResourceKind,
    /// Concrete property values, in name order.
    pub properties: BTreeMap<String, Value>,
}

impl ResourceSpec {
    /// Create a new spec.
    #[must_use]
    pub fn new(name: LogicalName, kind: ResourceKind) -> Self {
        Self {
            name,
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Set a property using builder pattern.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Get a property value.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Get a string property.
    #[must_use]
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(Value::as_str)
    }

    /// Get a boolean property.
    #[must_use]
    pub fn property_bool(&self, name: &str) -> Option<bool> {
        self.property(name).and_then(Value::as_bool)
    }
}

/// The result of a successful create or update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provisioned {
    /// Provider-assigned identifier.
    pub id: ResourceId,
    /// Attributes resolved by the remote call.
    pub attributes: ResolvedAttributes,
}

impl Provisioned {
    /// Create a new provisioning result.
    #[must_use]
    pub fn new(id: ResourceId, attributes: ResolvedAttributes) -> Self {
        Self { id, attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in ResourceKind::all() {
            let parsed: ResourceKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_kind_unknown() {
        assert!("queue".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_resolved_attributes_ordering() {
        let attrs = ResolvedAttributes::new()
            .with("zeta", "z")
            .with("alpha", "a");
        let names: Vec<&str> = attrs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_spec_property_accessors() {
        let spec = ResourceSpec::new(
            LogicalName::new("video-table").unwrap(),
            ResourceKind::Table,
        )
        .with_property("stream_enabled", true)
        .with_property("hash_key", "id");

        assert_eq!(spec.property_bool("stream_enabled"), Some(true));
        assert_eq!(spec.property_str("hash_key"), Some("id"));
        assert!(spec.property("range_key").is_none());
    }
}
