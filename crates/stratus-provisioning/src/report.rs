//! Plan and apply results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stratus_core::{LogicalName, RunId};
use stratus_provider::{ResolvedAttributes, ResourceId};

use crate::record::{ProvisionStatus, RecordStore};

/// The execution plan for a declaration set: topological waves, computed
/// without issuing any remote call.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// Identifier of this planning run.
    pub run_id: RunId,
    /// Declarations grouped into waves; everything in a wave is mutually
    /// independent, and each wave only depends on earlier ones.
    pub waves: Vec<Vec<LogicalName>>,
}

impl Plan {
    /// Total number of declarations planned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    /// Whether the plan is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }
}

/// Terminal outcome of one declaration in an apply run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The resource exists and its attributes are resolved.
    Created {
        /// Provider-assigned identifier.
        id: ResourceId,
        /// Attributes resolved by the remote call.
        attributes: ResolvedAttributes,
    },
    /// The remote call failed.
    Failed {
        /// The failure reported by the call layer.
        error: String,
    },
    /// Never attempted: an upstream declaration failed.
    Skipped {
        /// The root-cause declaration.
        cause: LogicalName,
    },
    /// Never attempted: the run was aborted.
    Cancelled,
}

/// Per-declaration outcomes of an apply run.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    /// Identifier of this apply run.
    pub run_id: RunId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Terminal outcome per declaration, in name order.
    pub outcomes: BTreeMap<LogicalName, Outcome>,
}

impl ApplyReport {
    /// Build a report from the scheduler's record store.
    ///
    /// Every record must be terminal by the time this is called.
    pub(crate) fn from_records(
        run_id: RunId,
        started_at: DateTime<Utc>,
        records: &RecordStore,
    ) -> Self {
        let outcomes = records
            .iter()
            .map(|(name, record)| {
                let outcome = match record.status {
                    ProvisionStatus::Created => match &record.provisioned {
                        Some(provisioned) => Outcome::Created {
                            id: provisioned.id.clone(),
                            attributes: provisioned.attributes.clone(),
                        },
                        None => Outcome::Failed {
                            error: "created without provisioning result".to_string(),
                        },
                    },
                    ProvisionStatus::Failed => Outcome::Failed {
                        error: record
                            .error
                            .clone()
                            .unwrap_or_else(|| "unknown failure".to_string()),
                    },
                    ProvisionStatus::Skipped => Outcome::Skipped {
                        cause: record
                            .blocked_on
                            .clone()
                            .unwrap_or_else(|| name.clone()),
                    },
                    // Pending/InFlight cannot survive the scheduler loop;
                    // treat them as cancelled if they somehow do.
                    ProvisionStatus::Cancelled
                    | ProvisionStatus::Pending
                    | ProvisionStatus::InFlight => Outcome::Cancelled,
                };
                (name.clone(), outcome)
            })
            .collect();
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        }
    }

    /// Outcome for one declaration.
    #[must_use]
    pub fn outcome(&self, name: &LogicalName) -> Option<&Outcome> {
        self.outcomes.get(name)
    }

    /// Resolved attributes of a created declaration.
    #[must_use]
    pub fn resolved_attributes(&self, name: &LogicalName) -> Option<&ResolvedAttributes> {
        match self.outcomes.get(name) {
            Some(Outcome::Created { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }

    /// Number of declarations that reached `Created`.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Created { .. }))
    }

    /// Number of declarations that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    /// Number of declarations skipped due to upstream failures.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    /// Number of declarations cancelled by an abort.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Cancelled))
    }

    /// Whether every declaration reached `Created`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.created_count() == self.outcomes.len()
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| predicate(o)).count()
    }
}
