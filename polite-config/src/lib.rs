pub mod config;
pub mod settings;

pub use config::{ConfigError, Configurable};
pub use settings::{BatchSettings, PoliteConfig, ReportSettings, ScheduleSettings};
