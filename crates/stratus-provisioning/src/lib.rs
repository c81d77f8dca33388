//! # Provisioning Engine
//!
//! Dependency resolution and scheduling for stratus deployments.
//!
//! A deployment is a set of [`Declaration`]s, each describing one desired
//! cloud resource. Declarations may reference attributes of other
//! declarations that only exist once those resources are provisioned
//! (an assigned ARN, a stream endpoint). This crate turns such a set into
//! a correct execution:
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌───────────────┐
//! │ Declarations │────►│ Dependency Graph │────►│   Scheduler   │
//! │  (desired)   │     │  (cycle check)   │     │ (worker pool) │
//! └──────────────┘     └──────────────────┘     └───────┬───────┘
//!                                                       │
//!                          ┌────────────────────────────┤
//!                          ▼                            ▼
//!                   ┌─────────────┐             ┌───────────────┐
//!                   │  Attribute  │◄────────────│   Provider    │
//!                   │   Futures   │  resolved   │ (remote calls)│
//!                   └─────────────┘  attributes └───────────────┘
//! ```
//!
//! - **Dependency graph**: explicit `depends_on` entries plus every
//!   cross-declaration reference induce edges; cycles are rejected before
//!   a single remote call is issued.
//! - **Scheduler**: declarations run as soon as all of their dependencies
//!   are `Created`, concurrently up to a configurable bound; failures mark
//!   the whole dependent subtree as skipped without touching resources
//!   that already exist.
//! - **Attribute futures**: write-once cells carrying resolved attributes
//!   into still-pending declarations, with continuation callbacks for
//!   derived values such as a function's invocation address.
//! - **Sub-protocols**: builders for the role/policy binding order, the
//!   REST resource tree, and table-stream-to-function bindings.

pub mod declaration;
pub mod error;
pub mod future;
pub mod graph;
pub mod iam;
pub mod record;
pub mod report;
pub mod rest;
pub mod scheduler;
pub mod stream;
pub mod validate;

// Re-exports for convenience
pub use declaration::{Declaration, DeclarationBuilder, Value};
pub use error::{ProvisioningError, ProvisioningResult};
pub use future::{AttributeFuture, FutureError, FutureTable};
pub use graph::{DependencyGraph, GraphError};
pub use iam::{Principal, RoleBinding, RoleConsumerOrdering, RolePolicyBinder, TrustPolicy, TrustStatement};
pub use record::{ProvisionStatus, ProvisioningRecord, RecordStore};
pub use report::{ApplyReport, Outcome, Plan};
pub use rest::{ApiTree, ApiTreeAssembler, AuthMode, invocation_address, MAX_INTEGRATION_TIMEOUT_MS};
pub use scheduler::{AbortHandle, ProvisioningScheduler, SchedulerConfig};
pub use stream::{StartingPosition, StreamBindingBuilder};
pub use validate::ValidationError;
