//! Remote resource state containers.
//!
//! A slice tracks one remote resource through `pending -> fulfilled | rejected`.
//! Every dispatch is tagged with a per-slice sequence number; only the most
//! recently issued ticket may write its result, so an older request that
//! resolves late is dropped instead of overwriting newer state.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::SliceError;

/// Snapshot of a remote resource.
///
/// `loading` and a non-empty `error` are never set together.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<SliceError>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> ResourceState<T> {
    fn pending(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn fulfilled(&mut self, data: Option<T>) {
        self.data = data;
        self.loading = false;
        self.error = None;
    }

    fn rejected(&mut self, error: SliceError) {
        self.loading = false;
        self.error = Some(error);
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

/// Handle for one dispatched operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// What happened to a resolved operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Applied,
    /// A newer dispatch (or an abandon) superseded this one.
    Stale,
}

struct Inner<T> {
    state: ResourceState<T>,
    issued: u64,
}

pub struct ResourceSlice<T> {
    name: &'static str,
    inner: Mutex<Inner<T>>,
}

impl<T> std::fmt::Debug for ResourceSlice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSlice").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<T: Clone> ResourceSlice<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                state: ResourceState::default(),
                issued: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // The lock is only ever held for a field update, never across an await.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ResourceState<T> {
        self.lock().state.clone()
    }

    /// Mark the resource pending and hand out the ticket that may settle it.
    pub fn begin(&self) -> Ticket {
        let mut inner = self.lock();
        inner.issued += 1;
        inner.state.pending();
        tracing::debug!(slice = self.name, seq = inner.issued, "pending");
        Ticket(inner.issued)
    }

    /// Apply the outcome of `ticket` if it is still the latest one issued.
    pub fn settle(&self, ticket: Ticket, outcome: Result<Option<T>, SliceError>) -> Settlement {
        let mut inner = self.lock();
        if ticket.0 != inner.issued {
            tracing::debug!(
                slice = self.name,
                seq = ticket.0,
                latest = inner.issued,
                "discarding stale result"
            );
            return Settlement::Stale;
        }

        match outcome {
            Ok(data) => {
                tracing::debug!(slice = self.name, seq = ticket.0, "fulfilled");
                inner.state.fulfilled(data);
            }
            Err(error) => {
                tracing::debug!(slice = self.name, seq = ticket.0, %error, "rejected");
                inner.state.rejected(error);
            }
        }
        Settlement::Applied
    }

    /// Run `operation` as one dispatch: pending first, then its outcome
    /// unless something newer was dispatched meanwhile.
    pub async fn dispatch<F>(&self, operation: F) -> Settlement
    where
        F: Future<Output = Result<Option<T>, SliceError>>,
    {
        let ticket = self.begin();
        let outcome = operation.await;
        self.settle(ticket, outcome)
    }

    /// Forget every in-flight operation; their results will be discarded.
    /// Data and error are kept.
    pub fn abandon(&self) {
        let mut inner = self.lock();
        inner.issued += 1;
        inner.state.loading = false;
    }

    /// Back to the initial state, discarding in-flight operations.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.issued += 1;
        inner.state = ResourceState::default();
    }
}
