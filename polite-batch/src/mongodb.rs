use crate::{BatchError, BulkFetch};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// MongoDB-backed bulk lookups: one `find({field: {$in: values}})` per call.
#[derive(Debug, Clone)]
pub struct MongoStore<T>
where
    T: Send + Sync,
{
    pub collection: Collection<T>,
}

impl<T> MongoStore<T>
where
    T: Send + Sync,
{
    pub fn new(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection(collection_name),
        }
    }

    /// Index the lookup field so `$in` queries stay cheap as the
    /// collection grows.
    pub async fn setup_index(&self, field: &str) -> Result<(), BatchError> {
        let mut keys = Document::new();
        keys.insert(field, 1);
        let index = IndexModel::builder().keys(keys).build();
        self.collection.create_index(index).await?;
        info!(field, "lookup index ready");
        Ok(())
    }
}

#[async_trait]
impl<T> BulkFetch<T> for MongoStore<T>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    async fn fetch_in(
        &self,
        field: &str,
        values: &[String],
    ) -> Result<Vec<T>, BatchError> {
        let mut filter = Document::new();
        filter.insert(field, doc! { "$in": values.to_vec() });

        let cursor = self.collection.find(filter).await?;
        let records: Vec<T> = cursor.try_collect().await?;
        debug!(field, asked = values.len(), found = records.len(), "bulk fetch");
        Ok(records)
    }
}
