//! Provisioning records.
//!
//! One record per declaration tracks its progress through a deployment
//! run. The store is owned by the scheduler loop, which is the single
//! writer; workers report results over a channel and never touch records
//! directly. Dependents only ever observe a record once it has reached a
//! terminal state. Records live for exactly one run.

use std::collections::BTreeMap;

use stratus_core::LogicalName;
use stratus_provider::{Provisioned, ResolvedAttributes};

/// Progress of a single declaration within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStatus {
    /// Not yet dispatched.
    Pending,
    /// Remote call in progress.
    InFlight,
    /// Remote call succeeded; attributes are resolved.
    Created,
    /// Remote call failed.
    Failed,
    /// Never dispatched because an upstream declaration failed.
    Skipped,
    /// Never dispatched because the run was aborted.
    Cancelled,
}

impl ProvisionStatus {
    /// Whether this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProvisionStatus::Created
                | ProvisionStatus::Failed
                | ProvisionStatus::Skipped
                | ProvisionStatus::Cancelled
        )
    }
}

/// Per-declaration provisioning state.
#[derive(Debug, Clone)]
pub struct ProvisioningRecord {
    /// Current status.
    pub status: ProvisionStatus,
    /// Result of the remote call, present once `Created`.
    pub provisioned: Option<Provisioned>,
    /// Failure message, present once `Failed`.
    pub error: Option<String>,
    /// Root-cause declaration, present once `Skipped`.
    pub blocked_on: Option<LogicalName>,
}

impl ProvisioningRecord {
    fn pending() -> Self {
        Self {
            status: ProvisionStatus::Pending,
            provisioned: None,
            error: None,
            blocked_on: None,
        }
    }

    /// Resolved attributes, present once `Created`.
    #[must_use]
    pub fn resolved_attributes(&self) -> Option<&ResolvedAttributes> {
        self.provisioned.as_ref().map(|p| &p.attributes)
    }
}

/// The record arena for one deployment run.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: BTreeMap<LogicalName, ProvisioningRecord>,
}

impl RecordStore {
    /// Create a store with a `Pending` record per declaration.
    pub fn new(names: impl IntoIterator<Item = LogicalName>) -> Self {
        Self {
            records: names
                .into_iter()
                .map(|name| (name, ProvisioningRecord::pending()))
                .collect(),
        }
    }

    /// Get a record.
    #[must_use]
    pub fn get(&self, name: &LogicalName) -> Option<&ProvisioningRecord> {
        self.records.get(name)
    }

    /// Current status of a declaration.
    #[must_use]
    pub fn status(&self, name: &LogicalName) -> Option<ProvisionStatus> {
        self.records.get(name).map(|r| r.status)
    }

    /// Whether a record exists and is still `Pending`.
    #[must_use]
    pub fn is_pending(&self, name: &LogicalName) -> bool {
        self.status(name) == Some(ProvisionStatus::Pending)
    }

    /// Mark a declaration dispatched.
    pub fn mark_in_flight(&mut self, name: &LogicalName) {
        if let Some(record) = self.records.get_mut(name) {
            record.status = ProvisionStatus::InFlight;
        }
    }

    /// Mark a declaration created with its provisioning result.
    pub fn mark_created(&mut self, name: &LogicalName, provisioned: Provisioned) {
        if let Some(record) = self.records.get_mut(name) {
            record.status = ProvisionStatus::Created;
            record.provisioned = Some(provisioned);
        }
    }

    /// Mark a declaration failed.
    pub fn mark_failed(&mut self, name: &LogicalName, error: impl Into<String>) {
        if let Some(record) = self.records.get_mut(name) {
            record.status = ProvisionStatus::Failed;
            record.error = Some(error.into());
        }
    }

    /// Mark a declaration skipped because of an upstream failure.
    pub fn mark_skipped(&mut self, name: &LogicalName, cause: LogicalName) {
        if let Some(record) = self.records.get_mut(name) {
            record.status = ProvisionStatus::Skipped;
            record.blocked_on = Some(cause);
        }
    }

    /// Mark a declaration cancelled by an abort request.
    pub fn mark_cancelled(&mut self, name: &LogicalName) {
        if let Some(record) = self.records.get_mut(name) {
            record.status = ProvisionStatus::Cancelled;
        }
    }

    /// Names of declarations still `Pending`.
    #[must_use]
    pub fn pending_names(&self) -> Vec<LogicalName> {
        self.records
            .iter()
            .filter(|(_, record)| record.status == ProvisionStatus::Pending)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Iterate over all records in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&LogicalName, &ProvisioningRecord)> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_provider::ResourceId;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut store = RecordStore::new([name("a"), name("b")]);
        assert!(store.is_pending(&name("a")));

        store.mark_in_flight(&name("a"));
        assert_eq!(store.status(&name("a")), Some(ProvisionStatus::InFlight));
        assert!(!ProvisionStatus::InFlight.is_terminal());

        let provisioned = Provisioned::new(
            ResourceId::new("res-0001"),
            ResolvedAttributes::new().with("arn", "arn:aws:s3:::bucket"),
        );
        store.mark_created(&name("a"), provisioned);
        assert_eq!(store.status(&name("a")), Some(ProvisionStatus::Created));
        assert_eq!(
            store
                .get(&name("a"))
                .and_then(ProvisioningRecord::resolved_attributes)
                .and_then(|attrs| attrs.get_str("arn")),
            Some("arn:aws:s3:::bucket")
        );
    }

    #[test]
    fn test_skip_records_cause() {
        let mut store = RecordStore::new([name("a"), name("b")]);
        store.mark_failed(&name("a"), "boom");
        store.mark_skipped(&name("b"), name("a"));

        let record = store.get(&name("b")).unwrap();
        assert_eq!(record.status, ProvisionStatus::Skipped);
        assert_eq!(record.blocked_on, Some(name("a")));
    }

    #[test]
    fn test_pending_names() {
        let mut store = RecordStore::new([name("a"), name("b"), name("c")]);
        store.mark_cancelled(&name("b"));
        assert_eq!(store.pending_names(), vec![name("a"), name("c")]);
    }
}
