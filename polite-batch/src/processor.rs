use crate::{
    AbstractStore, BatchError, HasLookupKey, PendingQueue, Promise,
    reader::BatchReader,
};
use derive_builder::Builder;
use indexmap::IndexMap;
use polite_config::BatchSettings;
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{broadcast, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument, warn};

#[derive(Builder, Clone, Debug)]
#[builder(public, setter(into))]
pub struct ProcessorOptions {
    #[builder(default = "std::time::Duration::from_millis(200)")]
    pub tick_interval: Duration,
    /// Field used by [`BatchReader::get_one`].
    #[builder(default = "String::from(\"url\")")]
    pub key_field: String,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            key_field: "url".to_string(),
        }
    }
}

impl ProcessorOptions {
    pub fn from_settings(settings: &BatchSettings) -> Self {
        Self {
            tick_interval: settings.tick_interval(),
            key_field: settings.key_field.clone(),
        }
    }
}

/// The store and pending queue of one resource type.
pub struct BatchContext<T> {
    pub store: AbstractStore<T>,
    pub queue: Arc<PendingQueue<T>>,
}

impl<T> BatchContext<T> {
    pub fn new(store: AbstractStore<T>) -> Self {
        Self {
            store,
            queue: Arc::new(PendingQueue::new()),
        }
    }
}

impl<T> Clone for BatchContext<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BatchContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchContext")
            .field("pending", &self.queue.len())
            .finish()
    }
}

/// What a single drain cycle did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub drained: usize,
    pub distinct: usize,
    pub fetches: usize,
    pub records: usize,
    pub delivered: usize,
    pub sentinels: usize,
    pub fetch_failures: usize,
    /// Fetched records that expose no value for the queried field.
    pub unroutable: usize,
}

/// Running totals since the processor started.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub ticks: u64,
    pub requests: u64,
    pub fetches: u64,
    pub records: u64,
    pub delivered: u64,
    pub sentinels: u64,
    pub fetch_failures: u64,
    pub unroutable: u64,
}

impl ProcessorStats {
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.requests += report.drained as u64;
        self.fetches += report.fetches as u64;
        self.records += report.records as u64;
        self.delivered += report.delivered as u64;
        self.sentinels += report.sentinels as u64;
        self.fetch_failures += report.fetch_failures as u64;
        self.unroutable += report.unroutable as u64;
    }
}

/// Periodically turns queued point lookups into one bulk query per lookup
/// field and fans the results back out.
///
/// Every request drained in a cycle is resolved in that cycle: with the
/// matching record, or with `T::default()` when the store has none or the
/// fetch failed.
pub struct BatchProcessor<T> {
    ctx: BatchContext<T>,
    options: ProcessorOptions,
    stats: ProcessorStats,
    stats_tx: watch::Sender<ProcessorStats>,
}

impl<T> BatchProcessor<T>
where
    T: HasLookupKey + Default + Clone + Send + Sync + 'static,
{
    pub fn new(ctx: BatchContext<T>, options: ProcessorOptions) -> Self {
        let (stats_tx, _) = watch::channel(ProcessorStats::default());
        Self {
            ctx,
            options,
            stats: ProcessorStats::default(),
            stats_tx,
        }
    }

    pub fn reader(&self) -> BatchReader<T> {
        BatchReader::new(self.ctx.queue.clone(), self.options.key_field.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessorStats> {
        self.stats_tx.subscribe()
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    /// Drain, deduplicate, fetch and dispatch once.
    pub async fn run_once(&mut self) -> TickReport {
        let requests = self.ctx.queue.drain();
        let mut report = TickReport {
            drained: requests.len(),
            ..Default::default()
        };
        if requests.is_empty() {
            self.record(&report);
            return report;
        }

        // field -> value -> waiters
        let mut waiting: IndexMap<String, IndexMap<String, Vec<Promise<T>>>> =
            IndexMap::new();
        for request in requests {
            let key = request.key.clone();
            let value = request.value.clone();
            waiting
                .entry(key)
                .or_default()
                .entry(value)
                .or_default()
                .push(request.into_promise());
        }

        for (field, mut by_value) in waiting {
            report.distinct += by_value.len();
            let values: Vec<String> = by_value.keys().cloned().collect();

            report.fetches += 1;
            let records = match self.ctx.store.fetch_in(&field, &values).await {
                Ok(records) => records,
                Err(BatchError::NoDocuments) => {
                    debug!(field = field.as_str(), values = values.len(), "no documents");
                    Vec::new()
                }
                Err(e) => {
                    error!(
                        field = field.as_str(),
                        values = values.len(),
                        "bulk fetch failed, resolving waiters as not found: {}",
                        e
                    );
                    report.fetch_failures += 1;
                    Vec::new()
                }
            };
            report.records += records.len();

            let is_key_field = field == self.options.key_field;
            let mut unroutable = 0;
            for record in records {
                let value = if is_key_field {
                    Some(record.lookup_key())
                } else {
                    record.lookup_value(&field)
                };
                let Some(value) = value else {
                    unroutable += 1;
                    continue;
                };
                let Some(promises) = by_value.swap_remove(value) else {
                    continue;
                };
                for promise in promises {
                    report.delivered += 1;
                    if !promise.resolve(record.clone()) {
                        debug!(value, "waiter went away");
                    }
                }
            }
            if unroutable > 0 {
                report.unroutable += unroutable;
                warn!(
                    field = field.as_str(),
                    unroutable,
                    "fetched records carry no value for the lookup field"
                );
            }

            for (_, promises) in by_value {
                for promise in promises {
                    report.sentinels += 1;
                    let _ = promise.resolve(T::default());
                }
            }
        }

        debug!(
            drained = report.drained,
            distinct = report.distinct,
            records = report.records,
            sentinels = report.sentinels,
            "batch dispatched"
        );
        self.record(&report);
        report
    }

    /// Tick until `terminate` fires, then drain one last time so nothing
    /// queued before shutdown is left waiting.
    #[instrument(skip_all, fields(resource = std::any::type_name::<T>()))]
    pub async fn run(mut self, mut terminate: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            tick_ms = self.options.tick_interval.as_millis() as u64,
            "batch processor started"
        );

        loop {
            tokio::select! {
                _ = terminate.recv() => {
                    info!("Terminating batch processor");
                    break;
                },
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let report = self.run_once().await;
                    if started.elapsed() > self.options.tick_interval {
                        warn!(
                            drained = report.drained,
                            pending = self.ctx.queue.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "drain cycle slower than tick interval, lookups are queueing up"
                        );
                    }
                }
            }
        }

        let report = self.run_once().await;
        info!(
            flushed = report.drained,
            ticks = self.stats.ticks,
            requests = self.stats.requests,
            "batch processor stopped"
        );
    }

    fn record(&mut self, report: &TickReport) {
        self.stats.record(report);
        self.stats_tx.send_replace(self.stats.clone());
    }
}

impl<T> std::fmt::Debug for BatchProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("ctx", &self.ctx)
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish()
    }
}
