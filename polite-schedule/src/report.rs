//! Printable per-task results.
//!
//! The fetcher lives outside this crate; it records what happened to a probe
//! in a [`ProbeOutcome`] and the report layer turns that, together with the
//! scheduled [`Task`], into a flat serializable [`TaskReport`].
use crate::task::Task;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::warn;
use url::Url;

/// Which URL components differ between the requested URL and where the
/// redirect chain ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstChange {
    pub scheme: bool,
    pub hostname: bool,
    pub path: bool,
    pub query: bool,
}

impl DstChange {
    /// Compare `original` with the final hop of a redirect chain.
    ///
    /// A chain entry may carry a status prefix (`"301 https://..."`), so only
    /// its last whitespace-separated token is parsed.
    pub fn between(original: &str, destination: &str) -> Self {
        let dst = destination.split_whitespace().last().unwrap_or_default();
        let (ori, dst) = match (Url::parse(original), Url::parse(dst)) {
            (Ok(ori), Ok(dst)) => (ori, dst),
            (Err(e), _) | (_, Err(e)) => {
                warn!(original, destination, "cannot compare redirect target: {}", e);
                return Self::default();
            }
        };

        Self {
            scheme: ori.scheme() != dst.scheme(),
            hostname: ori.host_str() != dst.host_str(),
            path: ori.path() != dst.path(),
            query: ori.query() != dst.query(),
        }
    }

    pub fn any(&self) -> bool {
        self.scheme || self.hostname || self.path || self.query
    }

    fn from_chain(original: &str, chain: &[String]) -> Option<Self> {
        chain.last().map(|dst| Self::between(original, dst))
    }
}

/// Hex SHA-256 over at most `limit` leading bytes of `body`.
///
/// Used as a self-computed tag for servers that send no usable ETag.
pub fn self_tag(body: &[u8], limit: usize) -> String {
    let prefix = &body[..body.len().min(limit)];
    format!("{:x}", Sha256::digest(prefix))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseReport {
    pub status_code: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    /// Server ETag with surrounding quotes removed; empty when absent.
    pub etag: String,
    pub self_tag: String,
}

impl ResponseReport {
    pub fn new(
        status_code: u16,
        headers: BTreeMap<String, Vec<String>>,
        body: &[u8],
        self_tag_len: usize,
    ) -> Self {
        let etag = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("etag"))
            .and_then(|(_, values)| values.first())
            .map(|value| value.trim_matches('"').to_string())
            .unwrap_or_default();

        Self {
            status_code,
            headers,
            etag,
            self_tag: self_tag(body, self_tag_len),
        }
    }
}

/// Result of a second attempt at a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOutcome {
    pub redirect_chain: Vec<String>,
    pub response: Option<ResponseReport>,
    pub error: Option<String>,
}

/// What the fetcher observed for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub ip: Option<String>,
    pub redirect_chain: Vec<String>,
    pub response: Option<ResponseReport>,
    pub error: Option<String>,
    /// Present only when the probe was retried.
    pub retry: Option<RetryOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReport {
    pub redirect_chain: Vec<String>,
    pub dst_change: Option<DstChange>,
    pub response: Option<ResponseReport>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub url: String,
    pub domain: String,
    pub source_url: String,
    pub schedule_ms: u64,
    pub ip: Option<String>,
    pub redirect_chain: Vec<String>,
    pub dst_change: Option<DstChange>,
    pub response: Option<ResponseReport>,
    pub error: Option<String>,
    pub retry: Option<RetryReport>,
}

impl TaskReport {
    pub fn new(task: &Task, outcome: Option<&ProbeOutcome>) -> Self {
        let mut report = Self {
            url: task.url.clone(),
            domain: task.domain.clone(),
            source_url: task.source_url.clone(),
            schedule_ms: u64::try_from(task.schedule().as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        };

        let Some(outcome) = outcome else {
            return report;
        };

        report.ip = outcome.ip.clone();
        report.redirect_chain = outcome.redirect_chain.clone();
        report.dst_change = DstChange::from_chain(&task.url, &outcome.redirect_chain);
        report.response = outcome.response.clone();
        report.error = outcome.error.clone();
        report.retry = outcome.retry.as_ref().map(|retry| RetryReport {
            redirect_chain: retry.redirect_chain.clone(),
            dst_change: DstChange::from_chain(&task.url, &retry.redirect_chain),
            response: retry.response.clone(),
            error: retry.error.clone(),
        });
        report
    }
}
