//! Provisioning scheduler.
//!
//! Walks the dependency graph and drives every declaration through
//! `Pending → InFlight → Created | Failed`, dispatching remote calls to a
//! worker pool as declarations become eligible. A declaration is eligible
//! only once all of its dependencies are `Created`; eligible declarations
//! with no relationship to each other run concurrently, bounded by the
//! configured pool width.
//!
//! Failure handling: a failed remote call marks the declaration `Failed`
//! and its entire dependent subtree `Skipped` without issuing their
//! calls. Resources that already reached `Created` are left untouched, so
//! a rerun resumes from the first non-created declaration. The scheduler
//! never retries; retry policy belongs to the call layer.
//!
//! Abort: a cooperative flag. In-flight calls complete (remote side
//! effects cannot be recalled mid-flight) but nothing new is dispatched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, instrument, warn};

use stratus_core::{LogicalName, RunId};
use stratus_provider::{FullProvision, Provisioned, ProviderError, ResourceKind, ResourceSpec};

use crate::declaration::{Declaration, Value};
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::future::FutureTable;
use crate::graph::DependencyGraph;
use crate::record::RecordStore;
use crate::report::{ApplyReport, Plan};
use crate::rest;
use crate::validate;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of remote calls allowed in flight at once.
    pub concurrency: usize,
    /// Region provisioned into; used for derived addresses.
    pub region: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            region: "us-east-1".to_string(),
        }
    }
}

/// Handle for requesting a cooperative abort of a running apply.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Request the abort. In-flight calls finish; nothing new starts.
    pub fn abort(&self) {
        info!("Abort requested");
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of one worker's remote call.
struct Completion {
    name: LogicalName,
    result: Result<Provisioned, ProviderError>,
    duration_ms: u64,
}

/// The provisioning scheduler.
pub struct ProvisioningScheduler<P> {
    provider: Arc<P>,
    config: SchedulerConfig,
    abort: Arc<AtomicBool>,
}

impl<P: FullProvision + 'static> ProvisioningScheduler<P> {
    /// Create a scheduler with default configuration.
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_config(provider, SchedulerConfig::default())
    }

    /// Create a scheduler with explicit configuration.
    pub fn with_config(provider: Arc<P>, config: SchedulerConfig) -> Self {
        Self {
            provider,
            config,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle that can abort a running apply.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            flag: self.abort.clone(),
        }
    }

    /// Build the execution plan without issuing any remote call.
    ///
    /// Validation and cycle detection both happen here, so a bad
    /// declaration set fails before anything touches the provider.
    pub fn plan(&self, declarations: &[Declaration]) -> ProvisioningResult<Plan> {
        validate::validate(declarations)?;
        let graph = DependencyGraph::build(declarations)?;
        Ok(Plan {
            run_id: RunId::new(),
            waves: graph.waves().to_vec(),
        })
    }

    /// Apply a declaration set: plan it, then drive every declaration to
    /// a terminal state.
    ///
    /// Returns an error only for pre-execution failures (validation,
    /// cycles) and fatal programming errors (unresolved references).
    /// Remote call failures are recorded per declaration in the report.
    #[instrument(skip(self, declarations), fields(declarations = declarations.len()))]
    pub async fn apply(&self, declarations: &[Declaration]) -> ProvisioningResult<ApplyReport> {
        let run_id = RunId::new();
        let started_at = chrono::Utc::now();
        validate::validate(declarations)?;
        let graph = DependencyGraph::build(declarations)?;

        let by_name: BTreeMap<LogicalName, Declaration> = declarations
            .iter()
            .map(|declaration| (declaration.name().clone(), declaration.clone()))
            .collect();
        let mut records = RecordStore::new(by_name.keys().cloned());

        // One future per referenced attribute, plus derivation chains.
        let mut futures = FutureTable::new();
        for declaration in declarations {
            for (source, attribute) in declaration.references() {
                futures.entry(source, attribute);
            }
        }
        register_derivations(declarations, &mut futures, &self.config.region);

        let mut waiting_on: BTreeMap<LogicalName, usize> = by_name
            .keys()
            .map(|name| (name.clone(), graph.dependencies_of(name).count()))
            .collect();
        let mut ready: BTreeSet<LogicalName> = waiting_on
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| name.clone())
            .collect();

        info!(
            run_id = %run_id,
            declarations = by_name.len(),
            waves = graph.waves().len(),
            concurrency = self.config.concurrency,
            "Starting apply run"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let mut in_flight = 0usize;
        let mut fatal: Option<ProvisioningError> = None;

        loop {
            if fatal.is_none() {
                // Dispatch everything currently eligible, sorted by name
                // for stable ordering among unrelated declarations.
                let batch: Vec<LogicalName> = std::mem::take(&mut ready).into_iter().collect();
                for name in batch {
                    if self.abort.load(Ordering::Relaxed) {
                        debug!(name = %name, "abort requested, not dispatching");
                        records.mark_cancelled(&name);
                        continue;
                    }
                    let Some(declaration) = by_name.get(&name) else {
                        fatal = Some(ProvisioningError::internal(format!(
                            "no declaration for '{name}'"
                        )));
                        break;
                    };
                    let spec = match substitute(declaration, &futures) {
                        Ok(spec) => spec,
                        Err(error) => {
                            fatal = Some(error);
                            break;
                        }
                    };
                    records.mark_in_flight(&name);
                    in_flight += 1;
                    debug!(name = %name, kind = %declaration.kind(), "dispatching declaration");

                    let provider = self.provider.clone();
                    let semaphore = semaphore.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        // Held for the duration of the call; bounds
                        // outstanding remote calls.
                        let _permit = semaphore.acquire_owned().await.ok();
                        let started = Instant::now();
                        let result = provision(provider.as_ref(), &spec).await;
                        let _ = tx.send(Completion {
                            name: spec.name.clone(),
                            result,
                            duration_ms: started.elapsed().as_millis() as u64,
                        });
                    });
                }
            }

            if in_flight == 0 {
                break;
            }

            let Some(completion) = rx.recv().await else {
                return Err(ProvisioningError::internal(
                    "completion channel closed with work in flight",
                ));
            };
            in_flight -= 1;

            let name = completion.name;
            match completion.result {
                Ok(provisioned) => {
                    info!(
                        name = %name,
                        id = %provisioned.id,
                        duration_ms = completion.duration_ms,
                        "declaration created"
                    );
                    futures.fulfill_from(&name, &provisioned.attributes);
                    records.mark_created(&name, provisioned);

                    for dependent in graph.dependents_of(&name) {
                        if let Some(count) = waiting_on.get_mut(dependent) {
                            *count = count.saturating_sub(1);
                            if *count == 0 && records.is_pending(dependent) {
                                ready.insert(dependent.clone());
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        name = %name,
                        error = %error,
                        duration_ms = completion.duration_ms,
                        "declaration failed"
                    );
                    records.mark_failed(&name, error.to_string());

                    // The whole dependent subtree is skipped without a call.
                    for dependent in graph.transitive_dependents(&name) {
                        if records.is_pending(&dependent) {
                            debug!(name = %dependent, cause = %name, "skipping dependent");
                            records.mark_skipped(&dependent, name.clone());
                        }
                    }
                }
            }
        }

        if let Some(error) = fatal {
            return Err(error);
        }

        // Whatever is still pending was never unblocked before an abort.
        for name in records.pending_names() {
            records.mark_cancelled(&name);
        }

        let report = ApplyReport::from_records(run_id, started_at, &records);
        info!(
            run_id = %run_id,
            created = report.created_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            cancelled = report.cancelled_count(),
            "Apply run finished"
        );
        Ok(report)
    }
}

/// Substitute every reference in a declaration's properties from the
/// fulfilled attribute futures.
fn substitute(
    declaration: &Declaration,
    futures: &FutureTable,
) -> ProvisioningResult<ResourceSpec> {
    let mut spec = ResourceSpec::new(declaration.name().clone(), declaration.kind());
    for (property, value) in declaration.properties() {
        let concrete = match value {
            Value::Literal(raw) => raw.clone(),
            // The graph only dispatches after every dependency is
            // created, so an empty future here is a declaration bug, not
            // a race.
            Value::Reference { source, attribute } => futures
                .get(source, attribute)
                .and_then(|future| future.get())
                .ok_or_else(|| ProvisioningError::UnresolvedReference {
                    declaration: declaration.name().clone(),
                    source_name: source.clone(),
                    attribute: attribute.clone(),
                })?,
        };
        spec.properties.insert(property.clone(), concrete);
    }
    Ok(spec)
}

/// Create-or-update against the call layer.
async fn provision<P: FullProvision + ?Sized>(
    provider: &P,
    spec: &ResourceSpec,
) -> Result<Provisioned, ProviderError> {
    match provider.find(&spec.name).await? {
        Some(existing) => {
            debug!(name = %spec.name, id = %existing.id, "resource exists, updating");
            provider.update(&existing.id, spec).await
        }
        None => provider.create(spec).await,
    }
}

/// Chain derived attributes off provider-resolved ones.
///
/// Each derivation is a continuation on the base attribute's future,
/// invoked exactly once at fulfillment.
fn register_derivations(declarations: &[Declaration], futures: &mut FutureTable, region: &str) {
    for declaration in declarations {
        match declaration.kind() {
            ResourceKind::Function => {
                let base = futures.entry(declaration.name(), "arn");
                let derived = futures.entry(declaration.name(), "invocation_address");
                let region = region.to_string();
                base.on_fulfilled(move |arn| {
                    if let Some(arn) = arn.as_str() {
                        if derived
                            .fulfill(rest::invocation_address(&region, arn).into())
                            .is_err()
                        {
                            warn!("invocation address derived twice");
                        }
                    }
                });
            }
            ResourceKind::RestApi => {
                let base = futures.entry(declaration.name(), "execution_arn");
                let derived = futures.entry(declaration.name(), "execution_arn_wildcard");
                base.on_fulfilled(move |arn| {
                    if let Some(arn) = arn.as_str() {
                        if derived.fulfill(rest::invoke_source_arn(arn).into()).is_err() {
                            warn!("invoke source arn derived twice");
                        }
                    }
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratus_provider::{MemoryProvider, ResolvedAttributes};

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    #[test]
    fn test_substitute_literal_passthrough() {
        let declaration = Declaration::builder(ResourceKind::Bucket, name("rawVideoBucket"))
            .literal("bucket", "raw-video-bucket-123")
            .build();
        let futures = FutureTable::new();

        let spec = substitute(&declaration, &futures).unwrap();
        assert_eq!(spec.property_str("bucket"), Some("raw-video-bucket-123"));
    }

    #[test]
    fn test_substitute_unresolved_reference_is_fatal() {
        let declaration = Declaration::builder(ResourceKind::Integration, name("integration"))
            .reference("uri", name("fn"), "invocation_address")
            .build();
        let mut futures = FutureTable::new();
        futures.entry(&name("fn"), "invocation_address");

        let error = substitute(&declaration, &futures).unwrap_err();
        assert!(matches!(
            error,
            ProvisioningError::UnresolvedReference { .. }
        ));
    }

    #[test]
    fn test_derivation_computes_invocation_address() {
        let function = Declaration::builder(ResourceKind::Function, name("fn")).build();
        let mut futures = FutureTable::new();
        register_derivations(std::slice::from_ref(&function), &mut futures, "us-east-1");

        let attrs = ResolvedAttributes::new().with("arn", "fn-123");
        futures.fulfill_from(&name("fn"), &attrs);

        let derived = futures.get(&name("fn"), "invocation_address").unwrap();
        assert_eq!(
            derived.get(),
            Some(json!(
                "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/fn-123/invocations"
            ))
        );
    }

    #[tokio::test]
    async fn test_plan_is_pure() {
        let provider = Arc::new(MemoryProvider::new());
        let scheduler = ProvisioningScheduler::new(provider.clone());
        let declarations = vec![
            Declaration::builder(ResourceKind::Bucket, name("bucket")).build(),
            Declaration::builder(ResourceKind::Table, name("table"))
                .depends_on(name("bucket"))
                .build(),
        ];

        let plan = scheduler.plan(&declarations).unwrap();
        assert_eq!(plan.waves, vec![vec![name("bucket")], vec![name("table")]]);
        assert_eq!(provider.resource_count().await, 0);
    }

    #[tokio::test]
    async fn test_cycle_fails_before_any_call() {
        let provider = Arc::new(MemoryProvider::new());
        let scheduler = ProvisioningScheduler::new(provider.clone());
        let declarations = vec![
            Declaration::builder(ResourceKind::Bucket, name("a"))
                .depends_on(name("b"))
                .build(),
            Declaration::builder(ResourceKind::Bucket, name("b"))
                .depends_on(name("a"))
                .build(),
        ];

        let error = scheduler.apply(&declarations).await.unwrap_err();
        assert!(matches!(
            error,
            ProvisioningError::Graph(crate::graph::GraphError::CyclicDependency { .. })
        ));
        assert_eq!(provider.resource_count().await, 0);
    }
}
