//! Pending lookup requests for one resource type.
//!
//! Callers append under a short mutex hold. The processor swaps the whole
//! buffer out under the same mutex and works on the detached snapshot, so
//! no lock is held while the store is queried and requests made during a
//! fetch land in the next cycle.
use crate::future::{FutureResult, Promise, promise};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct LookupRequest<T> {
    /// Store field the value is matched against.
    pub key: String,
    pub value: String,
    promise: Promise<T>,
}

impl<T> LookupRequest<T> {
    pub fn into_promise(self) -> Promise<T> {
        self.promise
    }
}

#[derive(Debug)]
pub struct PendingQueue<T> {
    requests: Mutex<Vec<LookupRequest<T>>>,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a lookup and return its future. Never waits on the store.
    pub fn push(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> FutureResult<T> {
        let (promise, future) = promise();
        self.lock().push(LookupRequest {
            key: key.into(),
            value: value.into(),
            promise,
        });
        future
    }

    /// Take everything queued so far, leaving the queue empty.
    pub fn drain(&self) -> Vec<LookupRequest<T>> {
        let mut requests = self.lock();
        let capacity = requests.len();
        std::mem::replace(&mut *requests, Vec::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the Vec half-updated, so
    // a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<LookupRequest<T>>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
