//! Domain-aware politeness scheduling for the prober.
//!
//! Turns a flat list of probe [`Task`]s into [`WorkerBatch`]es. Each batch
//! holds whole domains only, and every domain's probes are spread evenly over
//! the configured window with a random phase, so no host sees a burst.
//!
//! The [`report`] module holds the printable structures a dispatch loop fills
//! in once probes have finished.
#![warn(clippy::unwrap_used)]

pub mod report;
pub mod scheduler;
pub mod task;

pub use report::{
    DstChange, ProbeOutcome, ResponseReport, RetryOutcome, RetryReport, TaskReport,
    self_tag,
};
pub use scheduler::{
    DomainScheduler, ScheduleSummary, WorkerBatch, group_by_domain, pack_groups,
    spread_offsets,
};
pub use task::{Task, TaskError, parse_task_line, tasks_from_lines};

// Re-export
pub use url;
