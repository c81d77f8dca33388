//! In-memory provisioning backend.
//!
//! Stores resources keyed by logical name and synthesizes the attributes a
//! real control plane would assign (ARNs, generated identifiers, stream
//! endpoints). Used by the engine's tests and as the CLI's local backend.
//!
//! Synthesis is deterministic per stored resource: an update, or a create
//! that finds the resource already present, returns the same identifier
//! and the same generated attribute values, so repeated applies converge.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use stratus_core::LogicalName;

use crate::error::{ProviderError, ProviderResult};
use crate::traits::{CreateOp, DeleteOp, LookupOp, Provider, UpdateOp};
use crate::types::{Provisioned, ResolvedAttributes, ResourceId, ResourceKind, ResourceSpec};

const ACCOUNT_ID: &str = "123456789012";
const DEFAULT_REGION: &str = "us-east-1";

/// How an injected failure should present itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Transient control-plane failure (retryable).
    Transient,
    /// Permanent call failure (not retryable).
    Permanent,
}

#[derive(Debug, Clone)]
struct StoredResource {
    kind: ResourceKind,
    seq: u64,
    provisioned: Provisioned,
}

#[derive(Debug, Default)]
struct Inner {
    resources: BTreeMap<LogicalName, StoredResource>,
    failures: BTreeMap<LogicalName, FailureMode>,
    next_seq: u64,
}

/// In-memory provider.
pub struct MemoryProvider {
    region: String,
    inner: RwLock<Inner>,
}

impl MemoryProvider {
    /// Create a provider for the default region.
    #[must_use]
    pub fn new() -> Self {
        Self::with_region(DEFAULT_REGION)
    }

    /// Create a provider for a specific region.
    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// The region this provider provisions into.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Inject a failure for all future calls touching `name`.
    pub async fn fail_on(&self, name: LogicalName, mode: FailureMode) {
        self.inner.write().await.failures.insert(name, mode);
    }

    /// Remove an injected failure.
    pub async fn clear_failure(&self, name: &LogicalName) {
        self.inner.write().await.failures.remove(name);
    }

    /// Number of live resources.
    pub async fn resource_count(&self) -> usize {
        self.inner.read().await.resources.len()
    }

    /// Whether a resource exists for a logical name.
    pub async fn contains(&self, name: &LogicalName) -> bool {
        self.inner.read().await.resources.contains_key(name)
    }

    fn check_failure(inner: &Inner, name: &LogicalName) -> ProviderResult<()> {
        match inner.failures.get(name) {
            Some(FailureMode::Transient) => Err(ProviderError::Unavailable {
                message: format!("injected transient failure for '{name}'"),
            }),
            Some(FailureMode::Permanent) => Err(ProviderError::call_failed(format!(
                "injected failure for '{name}'"
            ))),
            None => Ok(()),
        }
    }

    /// Synthesize the attributes a control plane would assign.
    fn synthesize(&self, spec: &ResourceSpec, seq: u64) -> Provisioned {
        let region = &self.region;
        // Providers name resources after the declared name property when
        // one is given, falling back to the logical name.
        let resource_name = spec
            .property_str("name")
            .unwrap_or_else(|| spec.name.as_str())
            .to_string();

        let mut attrs = ResolvedAttributes::new();
        let id = match spec.kind {
            ResourceKind::Role => {
                attrs.set("name", resource_name.clone());
                attrs.set(
                    "arn",
                    format!("arn:aws:iam::{ACCOUNT_ID}:role/{resource_name}"),
                );
                ResourceId::new(resource_name)
            }
            ResourceKind::PolicyAttachment => ResourceId::new(format!("att-{seq:04}")),
            ResourceKind::Function => {
                attrs.set("name", resource_name.clone());
                attrs.set(
                    "arn",
                    format!("arn:aws:lambda:{region}:{ACCOUNT_ID}:function:{resource_name}"),
                );
                ResourceId::new(resource_name)
            }
            ResourceKind::Table => {
                let arn = format!("arn:aws:dynamodb:{region}:{ACCOUNT_ID}:table/{resource_name}");
                attrs.set("name", resource_name.clone());
                attrs.set("arn", arn.clone());
                if spec.property_bool("stream_enabled").unwrap_or(false) {
                    attrs.set("stream_arn", format!("{arn}/stream/{seq:08}"));
                }
                ResourceId::new(resource_name)
            }
            ResourceKind::Bucket => {
                attrs.set("name", resource_name.clone());
                attrs.set("arn", format!("arn:aws:s3:::{resource_name}"));
                ResourceId::new(resource_name)
            }
            ResourceKind::RestApi => {
                let api_id = format!("api-{seq:04}");
                attrs.set("root_resource_id", format!("rtr-{seq:04}"));
                attrs.set(
                    "execution_arn",
                    format!("arn:aws:execute-api:{region}:{ACCOUNT_ID}:{api_id}"),
                );
                ResourceId::new(api_id)
            }
            ResourceKind::Resource => ResourceId::new(format!("res-{seq:04}")),
            ResourceKind::Method => {
                if let Some(verb) = spec.property_str("http_method") {
                    attrs.set("http_method", verb.to_string());
                }
                ResourceId::new(format!("mth-{seq:04}"))
            }
            ResourceKind::Integration => ResourceId::new(format!("int-{seq:04}")),
            ResourceKind::Deployment => ResourceId::new(format!("dep-{seq:04}")),
            ResourceKind::Stage => {
                if let (Some(api_id), Some(stage_name)) =
                    (spec.property_str("rest_api"), spec.property_str("stage_name"))
                {
                    attrs.set(
                        "invoke_url",
                        format!("https://{api_id}.execute-api.{region}.amazonaws.com/{stage_name}"),
                    );
                }
                ResourceId::new(format!("stg-{seq:04}"))
            }
            ResourceKind::Permission => ResourceId::new(format!("prm-{seq:04}")),
            ResourceKind::StreamBinding => ResourceId::new(format!("esm-{seq:04}")),
        };
        attrs.set("id", Value::String(id.as_str().to_string()));

        Provisioned::new(id, attrs)
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn display_name(&self) -> &str {
        "memory"
    }

    async fn test_connection(&self) -> ProviderResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CreateOp for MemoryProvider {
    async fn create(&self, spec: &ResourceSpec) -> ProviderResult<Provisioned> {
        let mut inner = self.inner.write().await;
        Self::check_failure(&inner, &spec.name)?;

        if let Some(existing) = inner.resources.get(&spec.name) {
            // Matching resource already live: report its identity instead
            // of minting a duplicate.
            debug!(name = %spec.name, id = %existing.provisioned.id, "create found existing resource");
            return Ok(existing.provisioned.clone());
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let provisioned = self.synthesize(spec, seq);
        inner.resources.insert(
            spec.name.clone(),
            StoredResource {
                kind: spec.kind,
                seq,
                provisioned: provisioned.clone(),
            },
        );
        debug!(name = %spec.name, kind = %spec.kind, id = %provisioned.id, "created resource");
        Ok(provisioned)
    }
}

#[async_trait]
impl UpdateOp for MemoryProvider {
    async fn update(&self, id: &ResourceId, spec: &ResourceSpec) -> ProviderResult<Provisioned> {
        let mut inner = self.inner.write().await;
        Self::check_failure(&inner, &spec.name)?;

        let Some((name, stored)) = inner
            .resources
            .iter()
            .find(|(_, r)| r.provisioned.id == *id)
            .map(|(n, r)| (n.clone(), r.clone()))
        else {
            return Err(ProviderError::ResourceNotFound { id: id.clone() });
        };

        if stored.kind != spec.kind {
            return Err(ProviderError::invalid_spec(
                spec.name.as_str(),
                format!("kind changed from {} to {}", stored.kind, spec.kind),
            ));
        }

        // Re-synthesize with the original sequence number so generated
        // attribute values are stable across updates.
        let provisioned = self.synthesize(spec, stored.seq);
        inner.resources.insert(
            name.clone(),
            StoredResource {
                kind: spec.kind,
                seq: stored.seq,
                provisioned: provisioned.clone(),
            },
        );
        debug!(name = %name, id = %provisioned.id, "updated resource");
        Ok(provisioned)
    }
}

#[async_trait]
impl DeleteOp for MemoryProvider {
    async fn delete(&self, id: &ResourceId) -> ProviderResult<()> {
        let mut inner = self.inner.write().await;
        let name = inner
            .resources
            .iter()
            .find(|(_, r)| r.provisioned.id == *id)
            .map(|(n, _)| n.clone());
        match name {
            Some(name) => {
                inner.resources.remove(&name);
                debug!(name = %name, id = %id, "deleted resource");
                Ok(())
            }
            None => Err(ProviderError::ResourceNotFound { id: id.clone() }),
        }
    }
}

#[async_trait]
impl LookupOp for MemoryProvider {
    async fn find(&self, name: &LogicalName) -> ProviderResult<Option<Provisioned>> {
        let inner = self.inner.read().await;
        Ok(inner.resources.get(name).map(|r| r.provisioned.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_function_synthesizes_arn() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("controllerLambda"), ResourceKind::Function)
            .with_property("name", "controller_lambda");

        let provisioned = provider.create(&spec).await.unwrap();
        assert_eq!(
            provisioned.attributes.get_str("arn"),
            Some("arn:aws:lambda:us-east-1:123456789012:function:controller_lambda")
        );
    }

    #[tokio::test]
    async fn test_streaming_table_gets_stream_arn() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("video"), ResourceKind::Table)
            .with_property("name", "video")
            .with_property("stream_enabled", true);

        let provisioned = provider.create(&spec).await.unwrap();
        let stream_arn = provisioned.attributes.get_str("stream_arn").unwrap();
        assert!(stream_arn.starts_with("arn:aws:dynamodb:us-east-1:123456789012:table/video/stream/"));
    }

    #[tokio::test]
    async fn test_non_streaming_table_has_no_stream_arn() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("video"), ResourceKind::Table);

        let provisioned = provider.create(&spec).await.unwrap();
        assert!(!provisioned.attributes.has("stream_arn"));
    }

    #[tokio::test]
    async fn test_create_twice_reports_existing_identity() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("rawVideoBucket"), ResourceKind::Bucket);

        let first = provider.create(&spec).await.unwrap();
        let second = provider.create(&spec).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.resource_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_preserves_generated_attributes() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("video-api"), ResourceKind::RestApi);

        let created = provider.create(&spec).await.unwrap();
        let updated = provider.update(&created.id, &spec).await.unwrap();
        assert_eq!(created, updated);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("video-api"), ResourceKind::RestApi);

        let result = provider.update(&ResourceId::new("missing"), &spec).await;
        assert!(matches!(
            result,
            Err(ProviderError::ResourceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_injected_failure_modes() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("video"), ResourceKind::Table);

        provider.fail_on(name("video"), FailureMode::Transient).await;
        let err = provider.create(&spec).await.unwrap_err();
        assert!(err.is_transient());

        provider.fail_on(name("video"), FailureMode::Permanent).await;
        let err = provider.create(&spec).await.unwrap_err();
        assert!(!err.is_transient());

        provider.clear_failure(&name("video")).await;
        assert!(provider.create(&spec).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_resource() {
        let provider = MemoryProvider::new();
        let spec = ResourceSpec::new(name("rawVideoBucket"), ResourceKind::Bucket);

        let provisioned = provider.create(&spec).await.unwrap();
        provider.delete(&provisioned.id).await.unwrap();
        assert!(!provider.contains(&name("rawVideoBucket")).await);
        assert!(provider.find(&name("rawVideoBucket")).await.unwrap().is_none());
    }
}
