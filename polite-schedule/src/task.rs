use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use url::{Host, Url};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    #[error("Invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("URL `{0}` has no host")]
    MissingHost(String),
}

/// One probe target.
///
/// `url`, `domain` and `source_url` are fixed at ingestion. The dispatch
/// offset is written once by the scheduler and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub url: String,
    pub domain: String,
    /// Page the URL was found on; empty when the input line had none.
    pub source_url: String,
    schedule: Duration,
}

impl Task {
    pub fn new(
        url: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Result<Self, TaskError> {
        let url = url.into();
        let parsed = Url::parse(&url).map_err(|source| TaskError::InvalidUrl {
            url: url.clone(),
            source,
        })?;
        // IPv6 hosts are keyed without brackets
        let domain = match parsed.host() {
            Some(Host::Domain(host)) if !host.is_empty() => host.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(TaskError::MissingHost(url)),
        };

        Ok(Self {
            url,
            domain,
            source_url: source_url.into(),
            schedule: Duration::ZERO,
        })
    }

    /// Offset from the start of the crawl cycle at which this task should be
    /// dispatched.
    pub fn schedule(&self) -> Duration {
        self.schedule
    }

    pub(crate) fn set_schedule(&mut self, offset: Duration) {
        self.schedule = offset;
    }
}

/// Parse one `URL[, source-URL]` input record.
///
/// Blank lines yield `Ok(None)`. Anything after the second comma is ignored.
pub fn parse_task_line(line: &str) -> Result<Option<Task>, TaskError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut fields = line.split(',');
    let url = fields.next().map(str::trim).unwrap_or_default();
    let source = fields.next().map(str::trim).unwrap_or_default();

    Task::new(url, source).map(Some)
}

/// Build tasks from raw input lines. Malformed records are logged and
/// dropped so one bad line never stops a crawl.
pub fn tasks_from_lines<I, S>(lines: I) -> Vec<Task>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .enumerate()
        .filter_map(|(idx, line)| match parse_task_line(line.as_ref()) {
            Ok(task) => task,
            Err(e) => {
                warn!(line = idx + 1, "dropping input record: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_extracts_hostname() {
        let task = Task::new("https://Sub.Example.com:8443/a?b=c", "").unwrap();
        assert_eq!(task.domain, "sub.example.com");
        assert_eq!(task.source_url, "");
        assert_eq!(task.schedule(), Duration::ZERO);
    }

    #[test]
    fn test_task_ip_hosts() {
        let v6 = Task::new("http://[::1]:8080/status", "").unwrap();
        assert_eq!(v6.domain, "::1");
        let v4 = Task::new("http://127.0.0.1/", "").unwrap();
        assert_eq!(v4.domain, "127.0.0.1");
    }

    #[test]
    fn test_task_rejects_relative_url() {
        let err = Task::new("/just/a/path", "").unwrap_err();
        assert!(matches!(err, TaskError::InvalidUrl { .. }));
    }

    #[test]
    fn test_task_rejects_hostless_url() {
        let err = Task::new("mailto:someone@example.com", "").unwrap_err();
        assert_eq!(
            err,
            TaskError::MissingHost("mailto:someone@example.com".to_string())
        );
    }

    #[test]
    fn test_parse_line_with_source() {
        let task = parse_task_line("  https://a.com/x , https://src.org/page ")
            .unwrap()
            .unwrap();
        assert_eq!(task.url, "https://a.com/x");
        assert_eq!(task.domain, "a.com");
        assert_eq!(task.source_url, "https://src.org/page");
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_task_line("   ").unwrap(), None);
    }

    #[test]
    fn test_tasks_from_lines_drops_malformed() {
        let lines = [
            "https://a.com/1",
            "",
            "not a url",
            "https://b.com/1,https://a.com/1",
        ];
        let tasks = tasks_from_lines(lines);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].domain, "a.com");
        assert_eq!(tasks[1].domain, "b.com");
        assert_eq!(tasks[1].source_url, "https://a.com/1");
    }
}
