use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    /// The store matched nothing. Not a failure: waiters get the sentinel.
    #[error("No documents matched the lookup")]
    NoDocuments,

    #[error("Lookup field `{0}` is not supported by this store")]
    UnsupportedField(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Batch processor stopped before resolving the request")]
    ProcessorGone,

    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}
