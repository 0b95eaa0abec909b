//! In-process store indexed by each record's lookup key.
use crate::{BatchError, BulkFetch, HasLookupKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{
    PoisonError, RwLock,
    atomic::{AtomicUsize, Ordering},
};

#[derive(Debug)]
pub struct MemoryStore<T> {
    key_field: String,
    records: RwLock<HashMap<String, T>>,
    fetches: AtomicUsize,
}

impl<T> MemoryStore<T>
where
    T: HasLookupKey + Clone,
{
    /// `key_field` is the only field this store can be queried on.
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            records: RwLock::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_records(
        key_field: impl Into<String>,
        records: impl IntoIterator<Item = T>,
    ) -> Self {
        let store = Self::new(key_field);
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace the record stored under its lookup key.
    pub fn insert(&self, record: T) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.lookup_key().to_string(), record);
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bulk fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<T> BulkFetch<T> for MemoryStore<T>
where
    T: HasLookupKey + Clone + Send + Sync,
{
    async fn fetch_in(
        &self,
        field: &str,
        values: &[String],
    ) -> Result<Vec<T>, BatchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if field != self.key_field {
            return Err(BatchError::UnsupportedField(field.to_string()));
        }

        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values
            .iter()
            .filter_map(|value| records.get(value).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        url: String,
        hits: u32,
    }

    impl HasLookupKey for Doc {
        fn lookup_key(&self) -> &str {
            &self.url
        }
    }

    fn doc(url: &str, hits: u32) -> Doc {
        Doc {
            url: url.to_string(),
            hits,
        }
    }

    #[tokio::test]
    async fn test_fetch_in_returns_matches_only() {
        let store =
            MemoryStore::with_records("url", [doc("a", 1), doc("b", 2), doc("c", 3)]);
        let found = store
            .fetch_in("url", &["c".to_string(), "zzz".to_string(), "a".to_string()])
            .await
            .unwrap();

        assert_eq!(found, vec![doc("c", 3), doc("a", 1)]);
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_field() {
        let store = MemoryStore::with_records("url", [doc("a", 1)]);
        let result = store.fetch_in("domain", &["a".to_string()]).await;
        assert!(matches!(result, Err(BatchError::UnsupportedField(f)) if f == "domain"));
    }

    #[test]
    fn test_insert_replaces_and_remove() {
        let store = MemoryStore::new("url");
        store.insert(doc("a", 1));
        store.insert(doc("a", 5));
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove("a"), Some(doc("a", 5)));
        assert!(store.is_empty());
    }
}
