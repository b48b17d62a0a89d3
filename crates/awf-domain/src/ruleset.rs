//! `ProxyRuleset` — redundancy elimination and protocol partitioning.
//!
//! Applied once, between parsing the CLI's domain lists and handing them
//! to the proxy config synthesizer, so duplicate and shadowed entries
//! never bloat the emitted ACL tables.

use crate::pattern::covers;
use crate::spec::{DomainSpec, Protocol};

/// Survivors of redundancy elimination, partitioned by shape and
/// protocol. Blocklist entries are kept separately — they are parsed by
/// the same grammar but never participate in suffix/wildcard elimination
/// (the proxy config synthesizer emits them as explicit `deny` rules that
/// take precedence over the allow tables).
#[derive(Debug, Clone, Default)]
pub struct ProxyRuleset {
    pub plain_http: Vec<String>,
    pub plain_https: Vec<String>,
    pub plain_both: Vec<String>,
    pub wildcard_http: Vec<String>,
    pub wildcard_https: Vec<String>,
    pub wildcard_both: Vec<String>,
    pub block: Vec<DomainSpec>,
}

impl ProxyRuleset {
    pub fn is_empty(&self) -> bool {
        self.plain_http.is_empty()
            && self.plain_https.is_empty()
            && self.plain_both.is_empty()
            && self.wildcard_http.is_empty()
            && self.wildcard_https.is_empty()
            && self.wildcard_both.is_empty()
    }

    /// All surviving plain hostnames, any protocol — used by C6 to decide
    /// whether a denied host is "not allowed at all" vs "wrong port".
    pub fn all_plain(&self) -> impl Iterator<Item = &str> {
        self.plain_http
            .iter()
            .chain(self.plain_https.iter())
            .chain(self.plain_both.iter())
            .map(|s| s.as_str())
    }

    /// All surviving wildcard bodies, any protocol.
    pub fn all_wildcards(&self) -> impl Iterator<Item = &str> {
        self.wildcard_http
            .iter()
            .chain(self.wildcard_https.iter())
            .chain(self.wildcard_both.iter())
            .map(|s| s.as_str())
    }

    /// `true` iff `host` is covered by some surviving allow entry
    /// (itself, a proper subdomain suffix of a plain entry, or a wildcard
    /// match) — used for C6's domain-vs-port denial classification.
    pub fn allows_host(&self, host: &str) -> bool {
        self.all_plain()
            .any(|p| host == p || is_proper_suffix(host, p))
            || self.all_wildcards().any(|w| covers(w, host))
    }
}

fn is_proper_suffix(candidate: &str, base: &str) -> bool {
    candidate != base && candidate.ends_with(&format!(".{base}"))
}

/// Derive a [`ProxyRuleset`] from a parsed allow list and a parsed block
/// list, per spec.md §3:
///
/// 1. Within one protocol partition, drop any `Plain` that is a proper
///    subdomain suffix of another `Plain` with the same or broader
///    protocol.
/// 2. Drop any `Plain` covered by a `Wildcard` with the same or broader
///    protocol.
/// 3. Partition survivors into six buckets by shape and protocol.
pub fn derive(allow: &[DomainSpec], block: &[DomainSpec]) -> ProxyRuleset {
    let plains: Vec<&DomainSpec> = allow.iter().filter(|d| !d.is_wildcard()).collect();
    let wildcards: Vec<&DomainSpec> = allow.iter().filter(|d| d.is_wildcard()).collect();

    let mut ruleset = ProxyRuleset::default();

    'plain: for p in &plains {
        for q in &plains {
            if std::ptr::eq(*p, *q) {
                continue;
            }
            if q.protocol.covers(p.protocol) && is_proper_suffix(p.text(), q.text()) {
                continue 'plain;
            }
        }
        for w in &wildcards {
            if w.protocol.covers(p.protocol) && covers(w.text(), p.text()) {
                continue 'plain;
            }
        }
        let text = p.text().to_string();
        match p.protocol {
            Protocol::Http => ruleset.plain_http.push(text),
            Protocol::Https => ruleset.plain_https.push(text),
            Protocol::Both => ruleset.plain_both.push(text),
        }
    }

    for w in &wildcards {
        let text = w.text().to_string();
        match w.protocol {
            Protocol::Http => ruleset.wildcard_http.push(text),
            Protocol::Https => ruleset.wildcard_https.push(text),
            Protocol::Both => ruleset.wildcard_both.push(text),
        }
    }

    for bucket in [
        &mut ruleset.plain_http,
        &mut ruleset.plain_https,
        &mut ruleset.plain_both,
        &mut ruleset.wildcard_http,
        &mut ruleset.wildcard_https,
        &mut ruleset.wildcard_both,
    ] {
        bucket.sort();
        bucket.dedup();
    }

    ruleset.block = block.to_vec();
    ruleset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse;

    #[test]
    fn subdomain_suppressed_by_apex_same_protocol() {
        let allow = [parse("github.com").unwrap(), parse("api.github.com").unwrap()];
        let rs = derive(&allow, &[]);
        assert_eq!(rs.plain_both, vec!["github.com".to_string()]);
    }

    #[test]
    fn subdomain_not_suppressed_by_narrower_protocol_apex() {
        // A http-only apex does not cover a https-only subdomain.
        let allow = [
            parse("http://github.com").unwrap(),
            parse("https://api.github.com").unwrap(),
        ];
        let rs = derive(&allow, &[]);
        assert_eq!(rs.plain_https, vec!["api.github.com".to_string()]);
        assert_eq!(rs.plain_http, vec!["github.com".to_string()]);
    }

    #[test]
    fn plain_suppressed_by_covering_wildcard() {
        let allow = [
            parse("*.example.com").unwrap(),
            parse("foo.example.com").unwrap(),
        ];
        let rs = derive(&allow, &[]);
        assert!(rs.plain_both.is_empty());
        assert_eq!(rs.wildcard_both, vec!["*.example.com".to_string()]);
    }

    #[test]
    fn wildcard_protocol_mismatch_does_not_suppress() {
        let allow = [
            parse("https://*.example.com").unwrap(),
            parse("http://foo.example.com").unwrap(),
        ];
        let rs = derive(&allow, &[]);
        assert_eq!(rs.plain_http, vec!["foo.example.com".to_string()]);
    }

    #[test]
    fn block_list_is_kept_separately_untouched_by_elimination() {
        let allow = [parse("github.com").unwrap()];
        let block = [parse("evil.github.com").unwrap()];
        let rs = derive(&allow, &block);
        assert_eq!(rs.block.len(), 1);
        assert_eq!(rs.plain_both, vec!["github.com".to_string()]);
    }

    #[test]
    fn allows_host_recognizes_suffix_and_wildcard() {
        let allow = [parse("*.example.com").unwrap(), parse("github.com").unwrap()];
        let rs = derive(&allow, &[]);
        assert!(rs.allows_host("foo.example.com"));
        assert!(rs.allows_host("github.com"));
        assert!(!rs.allows_host("example.com"));
        assert!(!rs.allows_host("evil.com"));
    }
}
