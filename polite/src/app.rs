use polite_batch::{
    AbstractStore, BatchRuntime, HasLookupKey, ProcessorOptions, spawn_batch_runtime,
};
use polite_config::{ConfigError, Configurable, PoliteConfig};
use polite_schedule::{
    DomainScheduler, ScheduleSummary, Task, TaskReport, WorkerBatch, tasks_from_lines,
};
use serde::{Serialize, de::DeserializeOwned};
use std::path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Record on line {line} is invalid: {source}")]
    Record {
        line: usize,
        source: serde_json::Error,
    },
}

/// Schedule for one crawl cycle, as handed to the dispatch loop.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulePlan {
    pub summary: ScheduleSummary,
    pub batches: Vec<WorkerBatch>,
}

/// Application context: the raw YAML document plus the typed settings
/// derived from it.
#[derive(Debug, Clone)]
pub struct Polite {
    config: serde_yaml::Value,
    settings: PoliteConfig,
}

impl Configurable for Polite {
    fn config(&self) -> &serde_yaml::Value {
        &self.config
    }
}

impl Polite {
    pub fn from_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<Self, AppError> {
        let config = Self::load_config(config_file_path)?;
        Self::from_value(config)
    }

    pub fn from_value(config: serde_yaml::Value) -> Result<Self, AppError> {
        let settings = PoliteConfig::from_config(&config)?;
        Ok(Self { config, settings })
    }

    pub fn settings(&self) -> &PoliteConfig {
        &self.settings
    }

    /// Read `URL[, source-URL]` lines. Malformed lines are logged and skipped.
    pub fn load_tasks(
        &self,
        input_path: impl AsRef<path::Path>,
    ) -> Result<Vec<Task>, AppError> {
        let lines = Self::load_text_file_lines(input_path)?;
        let total = lines.iter().filter(|l| !l.trim().is_empty()).count();
        let tasks = tasks_from_lines(lines);
        info!(records = total, tasks = tasks.len(), "input loaded");
        Ok(tasks)
    }

    /// Load JSON-lines records, e.g. a robots cache dump for a memory store.
    pub fn load_records<T>(
        &self,
        records_path: impl AsRef<path::Path>,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned,
    {
        Self::load_text_file_lines(records_path)?
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| AppError::Record {
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    pub fn scheduler(&self) -> DomainScheduler {
        DomainScheduler::from_settings(&self.settings.schedule)
    }

    pub fn plan(&self, tasks: Vec<Task>) -> SchedulePlan {
        let batches = self.scheduler().schedule(tasks);
        SchedulePlan {
            summary: ScheduleSummary::from_batches(&batches),
            batches,
        }
    }

    /// Report skeletons for every planned task, in dispatch order.
    pub fn task_reports(&self, plan: &SchedulePlan) -> Vec<TaskReport> {
        plan.batches
            .iter()
            .flat_map(|batch| batch.tasks())
            .map(|task| TaskReport::new(task, None))
            .collect()
    }

    /// Start a lookup processor for one resource type with the configured
    /// tick and key field. Needs a running tokio runtime.
    pub fn spawn_lookups<T>(&self, store: AbstractStore<T>) -> BatchRuntime<T>
    where
        T: HasLookupKey + Default + Clone + Send + Sync + 'static,
    {
        spawn_batch_runtime(store, ProcessorOptions::from_settings(&self.settings.batch))
    }
}
