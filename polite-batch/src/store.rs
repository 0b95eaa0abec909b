//! Capabilities a resource type and its backing store provide to the batch
//! layer.
use crate::BatchError;
use async_trait::async_trait;
use std::sync::Arc;

/// Records expose the value that identifies them, usually their URL. The
/// processor routes each fetched record to the waiters queued under the
/// value of the field that was queried: [`HasLookupKey::lookup_key`] for the
/// configured key field, [`HasLookupKey::lookup_value`] for any other.
pub trait HasLookupKey {
    fn lookup_key(&self) -> &str;

    /// Value of a secondary lookup field. Records looked up only by their key
    /// keep the default, and lookups on other fields then resolve as not
    /// found.
    fn lookup_value(&self, field: &str) -> Option<&str> {
        let _ = field;
        None
    }
}

/// "Find all records where `field` is one of `values`."
#[async_trait]
pub trait BulkFetch<T>: Send + Sync {
    async fn fetch_in(
        &self,
        field: &str,
        values: &[String],
    ) -> Result<Vec<T>, BatchError>;
}

pub type AbstractStore<T> = Arc<dyn BulkFetch<T> + Send + Sync>;
