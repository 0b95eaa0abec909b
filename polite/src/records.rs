//! Per-host robots.txt cache records, the lookup resource the prober
//! consults before dispatching a host's first probe.
use polite_batch::{BatchError, BatchReader, FutureResult, HasLookupKey};
use polite_schedule::{Task, url::Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cached robots.txt fetch. The default value means "not cached".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsRecord {
    pub url: String,
    pub status_code: u16,
    pub body: String,
}

impl RobotsRecord {
    pub fn is_cached(&self) -> bool {
        !self.url.is_empty()
    }
}

impl HasLookupKey for RobotsRecord {
    fn lookup_key(&self) -> &str {
        &self.url
    }
}

/// robots.txt location for the host a task targets.
pub fn robots_url(task: &Task) -> String {
    match Url::parse(&task.url) {
        Ok(mut url) => {
            url.set_path("/robots.txt");
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => format!("https://{}/robots.txt", task.domain),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub domain: String,
    pub robots_url: String,
    pub cached: bool,
    pub status_code: u16,
}

/// Ask the cache about every task's host at once. All lookups are queued
/// before the first await so they land in the same drain and hosts shared
/// by many tasks cost a single store query. One entry per domain, sorted.
pub async fn cached_robots(
    reader: &BatchReader<RobotsRecord>,
    tasks: &[Task],
) -> Result<Vec<HostStatus>, BatchError> {
    let lookups: Vec<(&Task, String, FutureResult<RobotsRecord>)> = tasks
        .iter()
        .map(|task| {
            let url = robots_url(task);
            let future = reader.get_one(url.clone());
            (task, url, future)
        })
        .collect();

    let mut hosts = BTreeMap::new();
    for (task, url, future) in lookups {
        let record = future.await?;
        hosts.entry(task.domain.clone()).or_insert(HostStatus {
            domain: task.domain.clone(),
            robots_url: url,
            cached: record.is_cached(),
            status_code: record.status_code,
        });
    }
    Ok(hosts.into_values().collect())
}
