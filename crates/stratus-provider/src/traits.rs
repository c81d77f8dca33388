//! Provider traits
//!
//! Capability-based trait definitions for provisioning backends.

use async_trait::async_trait;

use stratus_core::LogicalName;

use crate::error::ProviderResult;
use crate::types::{Provisioned, ResourceId, ResourceSpec};

/// Base trait for all provisioning backends.
///
/// Provides common functionality every backend must implement, regardless
/// of which operations it supports.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the display name for this provider instance.
    fn display_name(&self) -> &str;

    /// Test connectivity to the control plane.
    ///
    /// Returns `Ok(())` if the provider is reachable, or an error
    /// describing what went wrong.
    async fn test_connection(&self) -> ProviderResult<()>;

    /// Check if the provider is currently healthy.
    ///
    /// A lightweight check, different from `test_connection` which may
    /// perform a more thorough validation.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Capability for creating resources.
#[async_trait]
pub trait CreateOp: Provider {
    /// Create a new resource from a fully resolved spec.
    ///
    /// # Returns
    /// The provider-assigned identifier and the attributes resolved by
    /// the remote call.
    async fn create(&self, spec: &ResourceSpec) -> ProviderResult<Provisioned>;
}

/// Capability for updating existing resources.
#[async_trait]
pub trait UpdateOp: Provider {
    /// Update an existing resource to match a spec.
    ///
    /// # Arguments
    /// * `id` - The provider-assigned identifier of the resource
    /// * `spec` - The desired state
    ///
    /// # Returns
    /// The (possibly unchanged) identifier and refreshed attributes.
    async fn update(&self, id: &ResourceId, spec: &ResourceSpec) -> ProviderResult<Provisioned>;
}

/// Capability for deleting resources.
#[async_trait]
pub trait DeleteOp: Provider {
    /// Delete a resource.
    async fn delete(&self, id: &ResourceId) -> ProviderResult<()>;
}

/// Capability for locating resources by logical name.
///
/// This is what makes re-applies idempotent: before creating, the
/// scheduler asks the provider whether a resource for this declaration
/// already exists. Providers that can report existing-resource identity
/// let a rerun converge instead of duplicating.
#[async_trait]
pub trait LookupOp: Provider {
    /// Find the live resource for a logical name, if one exists.
    async fn find(&self, name: &LogicalName) -> ProviderResult<Option<Provisioned>>;
}

/// Marker trait for providers that support the full provisioning
/// protocol.
pub trait FullProvision: CreateOp + UpdateOp + DeleteOp + LookupOp {}

// Blanket implementation for any provider that implements all operations
impl<T> FullProvision for T where T: CreateOp + UpdateOp + DeleteOp + LookupOp {}
