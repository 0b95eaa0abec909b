//! Typed settings for the prober.
//!
//! Values are read from the same YAML document the [`Configurable`] trait
//! loads. Every section is optional and falls back to its defaults:
//!
//! ```yaml
//! schedule:
//!     worker_stress: 10          # soft cap of tasks per worker batch
//!     expected_runtime_ms: 60000 # window a domain's probes are spread over
//! batch:
//!     tick_interval_ms: 200      # pending lookup drain period
//!     key_field: url             # store field lookups are matched on
//! report:
//!     self_tag_buffer_len: 1024  # body prefix hashed into the self tag
//! ```
//!
//! [`Configurable`]: crate::Configurable
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fs, path, time::Duration};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub worker_stress: usize,
    pub expected_runtime_ms: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            worker_stress: 50,
            expected_runtime_ms: 60_000,
        }
    }
}

impl ScheduleSettings {
    pub fn stress_limit(&self) -> usize {
        self.worker_stress
    }

    pub fn spread_window(&self) -> Duration {
        Duration::from_millis(self.expected_runtime_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub tick_interval_ms: u64,
    pub key_field: String,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            key_field: "url".to_string(),
        }
    }
}

impl BatchSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub self_tag_buffer_len: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            self_tag_buffer_len: 1024,
        }
    }
}

/// Root settings object. Built once at startup and handed to the scheduler
/// and to each batch processor explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoliteConfig {
    pub schedule: ScheduleSettings,
    pub batch: BatchSettings,
    pub report: ReportSettings,
}

impl PoliteConfig {
    /// Build settings from an already parsed YAML document.
    pub fn from_config(config: &serde_yaml::Value) -> Result<Self, ConfigError> {
        let settings: PoliteConfig = match config {
            serde_yaml::Value::Null => PoliteConfig::default(),
            value => serde_yaml::from_value(value.clone())?,
        };
        settings.validate()?;
        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    pub fn from_file(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config_file_path)?;
        let config: serde_yaml::Value = serde_yaml::from_str(&content)?;
        Self::from_config(&config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.worker_stress == 0 {
            return Err(invalid("schedule.worker_stress", "must be at least 1"));
        }
        if self.schedule.expected_runtime_ms == 0 {
            return Err(invalid("schedule.expected_runtime_ms", "must be positive"));
        }
        if self.batch.tick_interval_ms == 0 {
            return Err(invalid("batch.tick_interval_ms", "must be positive"));
        }
        if self.batch.key_field.trim().is_empty() {
            return Err(invalid("batch.key_field", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_for_empty_document() {
        let config = PoliteConfig::from_config(&serde_yaml::Value::Null).unwrap();
        assert_eq!(config, PoliteConfig::default());
        assert_eq!(config.batch.key_field, "url");
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            r#"
            schedule:
              worker_stress: 10
            batch:
              tick_interval_ms: 50
            "#,
        )
        .unwrap();
        let config = PoliteConfig::from_config(&yaml).unwrap();

        assert_eq!(config.schedule.stress_limit(), 10);
        assert_eq!(config.schedule.spread_window(), Duration::from_secs(60));
        assert_eq!(config.batch.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.report.self_tag_buffer_len, 1024);
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("batch:\n  tick_interval_ms: 0").unwrap();
        let err = PoliteConfig::from_config(&yaml).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, .. } if key == "batch.tick_interval_ms")
        );
    }

    #[test]
    fn test_zero_stress_rejected() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("schedule:\n  worker_stress: 0").unwrap();
        assert!(PoliteConfig::from_config(&yaml).is_err());
    }

    #[test]
    fn test_wrong_type_is_yaml_error() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("schedule:\n  worker_stress: lots").unwrap();
        assert!(matches!(
            PoliteConfig::from_config(&yaml),
            Err(ConfigError::YamlParse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("polite.yml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "schedule:\n  expected_runtime_ms: 10000\nreport:\n  self_tag_buffer_len: 64"
        )
        .unwrap();

        let config = PoliteConfig::from_file(&path).unwrap();
        assert_eq!(config.schedule.spread_window(), Duration::from_secs(10));
        assert_eq!(config.report.self_tag_buffer_len, 64);
    }
}
