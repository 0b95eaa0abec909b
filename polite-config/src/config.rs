use std::{
    fs,
    io::{self, BufRead},
    path,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Line parsing error: {0}")]
    LineParse(String),
    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

/// Anything that owns a parsed YAML document: a crawl context, a CLI app, a
/// test harness. Gives uniform file loading and dotted-path lookups.
pub trait Configurable {
    fn config(&self) -> &serde_yaml::Value;

    // read configuration from yaml config
    fn load_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<serde_yaml::Value, ConfigError> {
        let content: String = fs::read_to_string(config_file_path)?;
        let config: serde_yaml::Value = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load Vec<String> from file with path `file_path`, one entry per line.
    /// Input lists for the prober (`URL[, source-URL]`) are read this way.
    fn load_text_file_lines(
        file_path: impl AsRef<path::Path>,
    ) -> Result<Vec<String>, ConfigError> {
        let file = fs::File::open(file_path)?;
        let lines = io::BufReader::new(file)
            .lines()
            .map(|l| l.map_err(|e| ConfigError::LineParse(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Extract Value from config using dot notation i.e. "schedule.worker_stress"
    fn get_config_value(&self, key: &str) -> Option<&serde_yaml::Value> {
        if key.is_empty() {
            return None;
        }
        let keys: Vec<&str> = key.split('.').collect();
        lookup_path(self.config(), &keys)
    }
}

fn lookup_path<'a>(
    config: &'a serde_yaml::Value,
    keys: &[&str],
) -> Option<&'a serde_yaml::Value> {
    let (head, rest) = keys.split_first()?;
    let serde_yaml::Value::Mapping(map) = config else {
        return None;
    };
    let value = map.get(serde_yaml::Value::String((*head).to_string()))?;
    if rest.is_empty() {
        Some(value)
    } else {
        lookup_path(value, rest)
    }
}
