//! `parse(raw) -> DomainSpec` — the entry point to the domain grammar.

use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Which traffic a [`DomainSpec`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Both,
}

impl Protocol {
    /// `self` is at least as permissive as `other` — used by the
    /// suffix/wildcard-coverage rules, which only drop an entry in favor
    /// of another entry with the same or broader protocol.
    pub fn covers(self, other: Protocol) -> bool {
        self == Protocol::Both || self == other
    }
}

/// A parsed allowlist/blocklist entry: either a literal hostname or a
/// wildcard pattern. Pattern compilation lives on the `Wildcard` variant
/// itself rather than on a shared base type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DomainSpecBody {
    Plain(String),
    Wildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    pub protocol: Protocol,
    pub body: DomainSpecBody,
}

impl DomainSpec {
    pub fn is_wildcard(&self) -> bool {
        matches!(self.body, DomainSpecBody::Wildcard(_))
    }

    /// The lowercased hostname or pattern text, without the scheme.
    pub fn text(&self) -> &str {
        match &self.body {
            DomainSpecBody::Plain(s) => s,
            DomainSpecBody::Wildcard(s) => s,
        }
    }
}

/// Parse one allowlist/blocklist entry.
///
/// Strips a leading `http://`/`https://` (setting `protocol`; absent a
/// scheme, `protocol` is `Both`), strips one trailing `/`, lowercases, then
/// classifies as `Wildcard` iff the remainder contains `*`. Rejects empty
/// strings, bare `*`, `*.*` (or any all-wildcard-label pattern), and any
/// string that still contains `/` once the scheme prefix is gone — paths
/// are not domains.
pub fn parse(raw: &str) -> Result<DomainSpec> {
    let (protocol, rest) = if let Some(rest) = raw.strip_prefix("https://") {
        (Protocol::Https, rest)
    } else if let Some(rest) = raw.strip_prefix("http://") {
        (Protocol::Http, rest)
    } else {
        (Protocol::Both, raw)
    };

    let rest = rest.strip_suffix('/').unwrap_or(rest);

    if rest.is_empty() {
        return Err(DomainError::InvalidPattern(
            "domain entry is empty".to_string(),
        ));
    }
    if rest.contains('/') {
        return Err(DomainError::InvalidPattern(format!(
            "domain entry contains a path: {raw}"
        )));
    }

    let lower = rest.to_lowercase();

    if lower.contains('*') {
        let has_literal_label = lower.split('.').any(|label| !label.contains('*'));
        if !has_literal_label {
            return Err(DomainError::InvalidPattern(format!(
                "wildcard entry has no non-wildcard label: {raw}"
            )));
        }
        Ok(DomainSpec {
            protocol,
            body: DomainSpecBody::Wildcard(lower),
        })
    } else {
        Ok(DomainSpec {
            protocol,
            body: DomainSpecBody::Plain(lower),
        })
    }
}
