//! # Provider Framework
//!
//! The remote call layer for stratus provisioning.
//!
//! The provisioning core decides *what* to create and *in which order*;
//! this crate defines the contract it speaks to do so. A provider turns a
//! fully resolved [`ResourceSpec`] into a live resource and reports back
//! the attributes that only exist once the resource does (assigned
//! identifiers, ARNs, stream endpoints).
//!
//! - Capability-based traits ([`CreateOp`], [`UpdateOp`], [`DeleteOp`],
//!   [`LookupOp`]) so partial backends stay honest about what they support
//! - [`ProviderError`] with transient/permanent classification for retry
//!   decisions
//! - [`RetryPolicy`] with bounded exponential backoff over transient
//!   failures (the scheduler itself never retries)
//! - [`MemoryProvider`], an in-memory backend with per-kind attribute
//!   synthesis, used by tests and the CLI's local backend
//!
//! Authentication and wire transport to a real cloud control plane are out
//! of scope; implementations of these traits own that entirely.

pub mod error;
pub mod memory;
pub mod resilience;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use error::{ProviderError, ProviderResult};
pub use memory::{FailureMode, MemoryProvider};
pub use resilience::{RetryConfig, RetryPolicy};
pub use traits::{CreateOp, DeleteOp, FullProvision, LookupOp, Provider, UpdateOp};
pub use types::{Provisioned, ResolvedAttributes, ResourceId, ResourceKind, ResourceSpec};
