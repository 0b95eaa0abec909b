use crate::{
    AbstractStore, BatchContext, BatchProcessor, BatchReader, HasLookupKey,
    ProcessorOptions, ProcessorStats,
};
use tokio::sync::{broadcast, watch};

/// Handle returned by [`spawn_batch_runtime`]: lookups go through `reader`,
/// counters through `stats`.
pub struct BatchRuntime<T> {
    pub reader: BatchReader<T>,
    pub stats: watch::Receiver<ProcessorStats>,
    terminate: broadcast::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl<T> BatchRuntime<T> {
    /// Stop ticking, flush what is still queued and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.terminate.send(());
        let _ = self.handle.await;
    }
}

impl<T> std::fmt::Debug for BatchRuntime<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRuntime")
            .field("reader", &self.reader)
            .field("stats", &*self.stats.borrow())
            .finish()
    }
}

/// Start a processor for one resource type on the current tokio runtime.
pub fn spawn_batch_runtime<T>(
    store: AbstractStore<T>,
    options: ProcessorOptions,
) -> BatchRuntime<T>
where
    T: HasLookupKey + Default + Clone + Send + Sync + 'static,
{
    let processor = BatchProcessor::new(BatchContext::new(store), options);
    let reader = processor.reader();
    let stats = processor.subscribe();
    let (terminate, terminate_rx) = broadcast::channel(1);
    let handle = tokio::spawn(processor.run(terminate_rx));

    BatchRuntime {
        reader,
        stats,
        terminate,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::{sync::Arc, time::Duration};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct HostDoc {
        url: String,
        allowed: bool,
    }

    impl HasLookupKey for HostDoc {
        fn lookup_key(&self) -> &str {
            &self.url
        }
    }

    fn options(tick_ms: u64) -> ProcessorOptions {
        ProcessorOptions {
            tick_interval: Duration::from_millis(tick_ms),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_resolves_on_tick() {
        let store = Arc::new(MemoryStore::with_records(
            "url",
            [HostDoc {
                url: "https://a.com/robots.txt".to_string(),
                allowed: true,
            }],
        ));
        let runtime = spawn_batch_runtime(store.clone(), options(100));

        let hit = runtime.reader.get_one("https://a.com/robots.txt");
        let miss = runtime.reader.get_one("https://b.com/robots.txt");
        assert!(hit.await.unwrap().allowed);
        assert_eq!(miss.await.unwrap(), HostDoc::default());
        assert_eq!(store.fetch_count(), 1);

        runtime.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_coalesce() {
        let records = (0..5).map(|i| HostDoc {
            url: format!("https://host{i}.com/robots.txt"),
            allowed: i % 2 == 0,
        });
        let store = Arc::new(MemoryStore::with_records("url", records));
        let runtime = spawn_batch_runtime(store.clone(), options(50));

        let mut handles = Vec::new();
        for caller in 0..40 {
            let reader = runtime.reader.clone();
            handles.push(tokio::spawn(async move {
                let url = format!("https://host{}.com/robots.txt", caller % 5);
                let doc = reader.get_one(url.clone()).await.unwrap();
                (url, doc)
            }));
        }
        for handle in handles {
            let (url, doc) = handle.await.unwrap();
            assert_eq!(doc.url, url);
        }

        // 40 callers, 5 distinct hosts: far fewer fetches than callers.
        assert!(store.fetch_count() <= 2, "fetches: {}", store.fetch_count());
        assert_eq!(runtime.stats.borrow().requests, 40);
        runtime.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending() {
        let store = Arc::new(MemoryStore::<HostDoc>::new("url"));
        let runtime = spawn_batch_runtime(store, options(60_000));
        // let the first (immediate) tick pass
        tokio::task::yield_now().await;

        let pending = runtime.reader.get_one("https://late.com/robots.txt");
        runtime.shutdown().await;
        assert_eq!(pending.await.unwrap(), HostDoc::default());
    }
}
