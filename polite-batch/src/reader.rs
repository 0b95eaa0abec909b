use crate::{FutureResult, PendingQueue};
use std::sync::Arc;

/// Cheap, cloneable front end handed to crawl workers.
pub struct BatchReader<T> {
    queue: Arc<PendingQueue<T>>,
    key_field: Arc<str>,
}

impl<T> Clone for BatchReader<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            key_field: self.key_field.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BatchReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchReader")
            .field("key_field", &self.key_field)
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl<T> BatchReader<T> {
    pub fn new(queue: Arc<PendingQueue<T>>, key_field: impl Into<Arc<str>>) -> Self {
        Self {
            queue,
            key_field: key_field.into(),
        }
    }

    /// Queue a lookup of records whose `key` field equals `value`. Returns
    /// at once; the future resolves on the processor's next tick.
    pub fn get_one_async(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> FutureResult<T> {
        self.queue.push(key, value)
    }

    /// [`BatchReader::get_one_async`] on the configured key field.
    pub fn get_one(&self, value: impl Into<String>) -> FutureResult<T> {
        self.queue.push(self.key_field.as_ref(), value)
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Lookups waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
