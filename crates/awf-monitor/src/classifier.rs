//! Denial classifier (C7): turns a Squid access log into a deduplicated,
//! ordered list of denied `host[:port]` records.
//!
//! Parsing is a pure function over the log text so tests can assert on
//! its output without touching a real file; [`read_and_classify`] is the
//! thin async wrapper the orchestrator calls, which adds the read and the
//! pre-read pause Squid's buffered writer requires.

use crate::error::{ClassifierError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// A denied destination recovered from the access log's `<url>` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialRecord {
    pub domain: String,
    pub port: Option<u16>,
}

/// Squid's access log is line-buffered; a freshly-exited agent's last
/// denials may not have hit disk yet.
const PRE_READ_PAUSE: Duration = Duration::from_millis(500);

fn denial_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:GET|POST|CONNECT|PUT|DELETE|HEAD)\s+\d+\s+TCP_DENIED:\S+\s+(\S+)")
            .expect("denial pattern is a fixed, valid regex")
    })
}

/// Parse every `TCP_DENIED` line in `log`, returning records in first-seen
/// order with duplicates on the full `host[:port]` token removed.
pub fn parse_denials(log: &str) -> Vec<DenialRecord> {
    let pattern = denial_pattern();
    let mut seen = std::collections::HashSet::new();
    let mut records = Vec::new();

    for line in log.lines() {
        if !line.contains("TCP_DENIED") {
            continue;
        }
        let Some(captures) = pattern.captures(line) else {
            continue;
        };
        let token = captures.get(1).unwrap().as_str();
        if !seen.insert(token.to_string()) {
            continue;
        }
        records.push(split_host_port(token));
    }

    debug!(denials = records.len(), "classified access log");
    records
}

fn split_host_port(token: &str) -> DenialRecord {
    match token.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            DenialRecord {
                domain: host.to_string(),
                port: port.parse().ok(),
            }
        }
        _ => DenialRecord {
            domain: token.to_string(),
            port: None,
        },
    }
}

/// Wait out [`PRE_READ_PAUSE`], read `access_log`, and classify it.
pub async fn read_and_classify(access_log: &Path) -> Result<Vec<DenialRecord>> {
    tokio::time::sleep(PRE_READ_PAUSE).await;
    let contents =
        tokio::fs::read_to_string(access_log)
            .await
            .map_err(|source| {
                warn!(path = %access_log.display(), "could not read access log for classification");
                ClassifierError::Io {
                    path: access_log.display().to_string(),
                    source,
                }
            })?;
    Ok(parse_denials(&contents))
}
