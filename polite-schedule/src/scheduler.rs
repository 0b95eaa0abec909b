//! Domain-aware politeness scheduler.
//!
//! A scheduling run has three steps:
//!
//! 1. tasks are grouped by domain, domains ordered by first appearance in
//!    the input and each domain keeping its arrival order;
//! 2. domain groups are packed into worker batches of at most
//!    `stress_limit` tasks; a group is never split, so a single large domain
//!    may overflow its batch;
//! 3. every group of `N` tasks gets offsets `start + k * window / N` with one
//!    random `start` in `[0, window / N)`, and each batch is stable-sorted by
//!    offset.
//!
//! The result is one dispatch sequence per worker where requests to the same
//! host are evenly spaced and hosts are out of phase with each other.
use crate::task::Task;
use indexmap::{IndexMap, IndexSet};
use polite_config::ScheduleSettings;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Tasks assigned to a single worker, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerBatch {
    tasks: Vec<Task>,
}

impl WorkerBatch {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Distinct domains in this batch, in order of their first dispatch.
    pub fn domains(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .map(|task| task.domain.as_str())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Offset of the last dispatch in the batch.
    pub fn span(&self) -> Duration {
        self.tasks
            .last()
            .map(Task::schedule)
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub batches: usize,
    pub tasks: usize,
    pub domains: usize,
    pub largest_batch: usize,
}

impl ScheduleSummary {
    pub fn from_batches(batches: &[WorkerBatch]) -> Self {
        Self {
            batches: batches.len(),
            tasks: batches.iter().map(WorkerBatch::len).sum(),
            domains: batches.iter().map(|b| b.domains().len()).sum(),
            largest_batch: batches.iter().map(WorkerBatch::len).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainScheduler {
    stress_limit: usize,
    spread_window: Duration,
}

impl DomainScheduler {
    pub fn new(stress_limit: usize, spread_window: Duration) -> Self {
        Self {
            stress_limit,
            spread_window,
        }
    }

    pub fn from_settings(settings: &ScheduleSettings) -> Self {
        Self::new(settings.stress_limit(), settings.spread_window())
    }

    pub fn stress_limit(&self) -> usize {
        self.stress_limit
    }

    pub fn spread_window(&self) -> Duration {
        self.spread_window
    }

    pub fn schedule(&self, tasks: Vec<Task>) -> Vec<WorkerBatch> {
        self.schedule_with_rng(tasks, &mut rand::rng())
    }

    /// Same as [`DomainScheduler::schedule`], drawing jitter from `rng`.
    /// A seeded generator makes the whole plan reproducible.
    pub fn schedule_with_rng<R>(&self, tasks: Vec<Task>, rng: &mut R) -> Vec<WorkerBatch>
    where
        R: Rng + ?Sized,
    {
        let groups = group_by_domain(tasks);
        let packed = pack_groups(groups, self.stress_limit);

        let batches: Vec<WorkerBatch> = packed
            .into_iter()
            .enumerate()
            .map(|(idx, groups)| {
                let batch = self.flatten_batch(groups, rng);
                debug!(
                    batch = idx,
                    tasks = batch.len(),
                    span_ms = batch.span().as_millis() as u64,
                    "worker batch ready"
                );
                batch
            })
            .collect();

        let summary = ScheduleSummary::from_batches(&batches);
        info!(
            batches = summary.batches,
            tasks = summary.tasks,
            domains = summary.domains,
            largest_batch = summary.largest_batch,
            "schedule built"
        );
        batches
    }

    fn flatten_batch<R>(&self, groups: Vec<Vec<Task>>, rng: &mut R) -> WorkerBatch
    where
        R: Rng + ?Sized,
    {
        let mut tasks = Vec::with_capacity(groups.iter().map(Vec::len).sum());
        for mut group in groups {
            let start = random_start(step_for(self.spread_window, group.len()), rng);
            let offsets = spread_offsets(group.len(), self.spread_window, start);
            for (task, offset) in group.iter_mut().zip(offsets) {
                task.set_schedule(offset);
            }
            tasks.append(&mut group);
        }
        // stable: equal offsets keep their relative order
        tasks.sort_by_key(Task::schedule);
        WorkerBatch { tasks }
    }
}

/// Group tasks by domain. Domains are keyed in order of first appearance and
/// each group keeps the arrival order of its tasks.
pub fn group_by_domain(tasks: Vec<Task>) -> IndexMap<String, Vec<Task>> {
    let mut groups: IndexMap<String, Vec<Task>> = IndexMap::new();
    for task in tasks {
        groups.entry(task.domain.clone()).or_default().push(task);
    }
    groups
}

/// Pack whole domain groups into batches of at most `stress_limit` tasks.
///
/// A group that does not fit closes the current batch. Groups are never
/// split, so a batch may exceed the limit when it holds a single oversized
/// domain. Empty batches are never emitted.
pub fn pack_groups(
    groups: IndexMap<String, Vec<Task>>,
    stress_limit: usize,
) -> Vec<Vec<Vec<Task>>> {
    let mut batches = Vec::new();
    let mut current: Vec<Vec<Task>> = Vec::new();
    let mut current_len = 0;

    for (_, group) in groups {
        if !current.is_empty() && current_len + group.len() > stress_limit {
            batches.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += group.len();
        current.push(group);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Offsets for `n` requests to one host: `start`, `start + window / n`, ...
pub fn spread_offsets(n: usize, window: Duration, start: Duration) -> Vec<Duration> {
    let step = step_for(window, n);
    std::iter::successors(Some(start), |offset| Some(*offset + step))
        .take(n)
        .collect()
}

fn step_for(window: Duration, n: usize) -> Duration {
    if n == 0 {
        return window;
    }
    window / u32::try_from(n).unwrap_or(u32::MAX)
}

/// Uniform draw from `[0, step)` at nanosecond resolution.
fn random_start<R>(step: Duration, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let step_nanos = u64::try_from(step.as_nanos()).unwrap_or(u64::MAX);
    if step_nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rng.random_range(0..step_nanos))
}
