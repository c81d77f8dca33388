//! Attribute futures.
//!
//! An [`AttributeFuture`] carries one resource attribute whose value only
//! exists after the owning resource is provisioned. It is created empty
//! when scheduling begins, fulfilled exactly once when the remote call
//! completes, and never mutated afterwards.
//!
//! Downstream work that needs the value registers a continuation with
//! [`AttributeFuture::on_fulfilled`]; each continuation runs exactly once,
//! at fulfillment (or immediately, if the value is already present). This
//! is how derived attributes such as a function's invocation address are
//! chained off provider-resolved ones.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::warn;

use stratus_core::LogicalName;
use stratus_provider::ResolvedAttributes;

/// Error fulfilling an attribute future.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FutureError {
    /// The future was already fulfilled; values are write-once.
    #[error("attribute future already fulfilled")]
    AlreadyFulfilled,
}

type Continuation = Box<dyn FnOnce(&serde_json::Value) + Send>;

#[derive(Default)]
struct State {
    value: Option<serde_json::Value>,
    continuations: Vec<Continuation>,
}

/// A write-once cell for a single resolved attribute.
#[derive(Default)]
pub struct AttributeFuture {
    state: Mutex<State>,
}

impl AttributeFuture {
    /// Create an empty future.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the value has been resolved.
    pub fn is_fulfilled(&self) -> bool {
        self.state.lock().map(|s| s.value.is_some()).unwrap_or(false)
    }

    /// Get the resolved value, if any.
    pub fn get(&self) -> Option<serde_json::Value> {
        self.state.lock().ok().and_then(|s| s.value.clone())
    }

    /// Fulfill the future, running every registered continuation.
    ///
    /// Returns [`FutureError::AlreadyFulfilled`] on a second call; the
    /// stored value is never replaced.
    pub fn fulfill(&self, value: serde_json::Value) -> Result<(), FutureError> {
        let continuations = {
            let Ok(mut state) = self.state.lock() else {
                return Ok(());
            };
            if state.value.is_some() {
                return Err(FutureError::AlreadyFulfilled);
            }
            state.value = Some(value.clone());
            std::mem::take(&mut state.continuations)
        };
        // Continuations run outside the lock; they may fulfill other
        // futures.
        for continuation in continuations {
            continuation(&value);
        }
        Ok(())
    }

    /// Register a continuation invoked exactly once with the resolved
    /// value.
    ///
    /// If the future is already fulfilled the continuation runs
    /// immediately on the calling thread.
    pub fn on_fulfilled(&self, continuation: impl FnOnce(&serde_json::Value) + Send + 'static) {
        {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if state.value.is_none() {
                state.continuations.push(Box::new(continuation));
                return;
            }
        }
        // Already fulfilled: run immediately, outside the lock.
        if let Some(value) = self.get() {
            continuation(&value);
        }
    }
}

impl std::fmt::Debug for AttributeFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeFuture")
            .field("fulfilled", &self.is_fulfilled())
            .finish()
    }
}

/// All attribute futures of one deployment run, keyed by owning
/// declaration and attribute name.
#[derive(Debug, Default)]
pub struct FutureTable {
    futures: BTreeMap<(LogicalName, String), Arc<AttributeFuture>>,
}

impl FutureTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the future for `name.attribute`.
    pub fn entry(&mut self, name: &LogicalName, attribute: &str) -> Arc<AttributeFuture> {
        self.futures
            .entry((name.clone(), attribute.to_string()))
            .or_default()
            .clone()
    }

    /// Get the future for `name.attribute`, if registered.
    #[must_use]
    pub fn get(&self, name: &LogicalName, attribute: &str) -> Option<&Arc<AttributeFuture>> {
        self.futures.get(&(name.clone(), attribute.to_string()))
    }

    /// Fulfill every future owned by `name` from a resolved attribute
    /// map.
    ///
    /// Futures for attributes the provider did not resolve are left
    /// empty; derivation continuations may still fulfill them, and a
    /// reference to one that stays empty surfaces as an unresolved
    /// reference when its reader is dispatched.
    pub fn fulfill_from(&self, name: &LogicalName, attributes: &ResolvedAttributes) {
        for ((owner, attribute), future) in &self.futures {
            if owner != name {
                continue;
            }
            if let Some(value) = attributes.get(attribute) {
                if let Err(FutureError::AlreadyFulfilled) = future.fulfill(value.clone()) {
                    warn!(owner = %owner, attribute = %attribute, "attribute future fulfilled twice");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    #[test]
    fn test_fulfill_once() {
        let future = AttributeFuture::new();
        assert!(!future.is_fulfilled());
        assert!(future.get().is_none());

        future.fulfill(json!("arn:aws:lambda:us-east-1:123:function:f")).unwrap();
        assert!(future.is_fulfilled());
        assert_eq!(
            future.get(),
            Some(json!("arn:aws:lambda:us-east-1:123:function:f"))
        );
    }

    #[test]
    fn test_second_fulfill_rejected() {
        let future = AttributeFuture::new();
        future.fulfill(json!(1)).unwrap();
        assert_eq!(future.fulfill(json!(2)), Err(FutureError::AlreadyFulfilled));
        // Value never mutated after first fulfillment
        assert_eq!(future.get(), Some(json!(1)));
    }

    #[test]
    fn test_continuation_runs_at_fulfillment() {
        let future = AttributeFuture::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = calls.clone();
        future.on_fulfilled(move |value| {
            assert_eq!(value, &json!("fn-123"));
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        future.fulfill(json!("fn-123")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_continuation_runs_immediately_when_already_fulfilled() {
        let future = AttributeFuture::new();
        future.fulfill(json!("fn-123")).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        future.on_fulfilled(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_continuation_may_fulfill_another_future() {
        let mut table = FutureTable::new();
        let base = table.entry(&name("fn"), "arn");
        let derived = table.entry(&name("fn"), "invocation_address");

        let target = derived.clone();
        base.on_fulfilled(move |arn| {
            let uri = format!("uri-for-{}", arn.as_str().unwrap_or_default());
            let _ = target.fulfill(json!(uri));
        });

        let attrs = ResolvedAttributes::new().with("arn", "fn-123");
        table.fulfill_from(&name("fn"), &attrs);

        assert_eq!(derived.get(), Some(json!("uri-for-fn-123")));
    }

    #[test]
    fn test_fulfill_from_skips_missing_attributes() {
        let mut table = FutureTable::new();
        let present = table.entry(&name("table"), "arn");
        let absent = table.entry(&name("table"), "stream_arn");

        let attrs = ResolvedAttributes::new().with("arn", "arn:aws:dynamodb:...:table/video");
        table.fulfill_from(&name("table"), &attrs);

        assert!(present.is_fulfilled());
        assert!(!absent.is_fulfilled());
    }
}
