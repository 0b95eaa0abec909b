//! # polite
//!
//! Scheduling and data-access core of a polite web prober.
//!
//! - `schedule`: spreads probes over time and across workers so that no
//!   single host receives a burst of requests.
//! - `batch`: coalesces concurrent point lookups (per-host caches such as
//!   robots.txt) into one bulk store query per tick.
//! - `config`: YAML configuration shared by both.
//!
//! [`Polite`] ties them together for an application: it owns the loaded
//! configuration, ingests task lists, builds schedules and starts lookup
//! processors with the configured timing.
pub mod app;
pub mod records;

pub use app::{AppError, Polite, SchedulePlan};
pub use records::{RobotsRecord, robots_url};

pub use polite_batch as batch;
pub use polite_config as config;
pub use polite_schedule as schedule;

// re-export
pub use serde;
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;
