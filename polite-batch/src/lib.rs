//! Coalesced lookups against a backing store.
//!
//! Crawl workers ask for one record at a time ("has this host's robots.txt
//! been fetched?"). Rather than hitting the store once per question, every
//! lookup is queued and a [`BatchProcessor`] drains the queue on a fixed
//! tick, issues a single `field ∈ values` query for all distinct values, and
//! hands each caller its record through a [`FutureResult`].
//!
//! Absence is not an error: a value with no matching record resolves to
//! `T::default()`. Store failures are logged and resolved the same way, so
//! callers never block on a broken store; they show up in
//! [`ProcessorStats::fetch_failures`].
//!
//! Backends:
//! - [`MemoryStore`], in-process
//! - `MongoStore` (with the "mongodb" feature)
#![warn(clippy::unwrap_used)]

mod error;
mod future;
mod memory;
#[cfg(feature = "mongodb")]
mod mongodb;
mod pending;
mod processor;
mod reader;
mod runtime;
mod store;

pub use error::BatchError;
pub use future::{FutureResult, Promise, promise};
pub use memory::MemoryStore;
#[cfg(feature = "mongodb")]
pub use self::mongodb::MongoStore;
pub use pending::{LookupRequest, PendingQueue};
pub use processor::{
    BatchContext, BatchProcessor, ProcessorOptions, ProcessorOptionsBuilder,
    ProcessorOptionsBuilderError, ProcessorStats, TickReport,
};
pub use reader::BatchReader;
pub use runtime::{BatchRuntime, spawn_batch_runtime};
pub use store::{AbstractStore, BulkFetch, HasLookupKey};
