//! Denial-to-remediation join (spec.md §4.6 "Denial reporting").
//!
//! Not itself an error: a non-zero agent exit with denials recorded in
//! the access log is reported as warnings alongside the pass-through
//! exit code, not a distinct failure mode the orchestrator raises.

use awf_domain::ProxyRuleset;
use awf_monitor::DenialRecord;
use awf_types::PortSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remediation {
    DomainNotAllowed { host: String, port: Option<u16>, suggested_domains: String },
    PortNotAllowed { host: String, port: Option<u16> },
}

/// Classify one denial against the configured allowlist. `host` is
/// *domain not allowed* if it's neither an allowlist entry itself nor a
/// proper subdomain of one (`ProxyRuleset::allows_host` already
/// implements that relation); otherwise the domain matched and the
/// denial must be the port.
pub fn classify(record: &DenialRecord, ruleset: &ProxyRuleset, allow_domains_csv: &str) -> Remediation {
    if ruleset.allows_host(&record.domain) {
        Remediation::PortNotAllowed { host: record.domain.clone(), port: record.port }
    } else {
        let suggested_domains = if allow_domains_csv.is_empty() {
            record.domain.clone()
        } else {
            format!("{allow_domains_csv},{}", record.domain)
        };
        Remediation::DomainNotAllowed { host: record.domain.clone(), port: record.port, suggested_domains }
    }
}

impl Remediation {
    /// Render the user-facing line spec.md's E2/E3 scenarios describe.
    pub fn message(&self, allow_host_ports: &[PortSpec]) -> String {
        match self {
            Remediation::DomainNotAllowed { host, port, suggested_domains } => {
                let dest = dest(host, *port);
                format!("{dest} — domain not allowed; try --allow-domains \"{suggested_domains}\"")
            }
            Remediation::PortNotAllowed { host, port } => {
                let ports = allowed_ports_text(allow_host_ports);
                let dest = dest(host, *port);
                match port {
                    Some(p) => format!("{dest} — port {p} not allowed; only {ports} permitted"),
                    None => format!("{dest} — port not allowed; only {ports} permitted"),
                }
            }
        }
    }
}

fn dest(host: &str, port: Option<u16>) -> String {
    match port {
        Some(p) => format!("{host}:{p}"),
        None => host.to_string(),
    }
}

fn allowed_ports_text(allow_host_ports: &[PortSpec]) -> String {
    let mut parts = vec!["80".to_string(), "443".to_string()];
    for p in allow_host_ports {
        match p {
            PortSpec::Single(port) => parts.push(port.to_string()),
            PortSpec::Range(start, end) => parts.push(format!("{start}-{end}")),
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use awf_domain::ruleset::derive;
    use awf_domain::spec::parse;

    #[test]
    fn host_outside_allowlist_is_domain_not_allowed() {
        let allow = [parse("github.com").unwrap()];
        let rs = derive(&allow, &[]);
        let record = DenialRecord { domain: "example.com".into(), port: Some(443) };
        let r = classify(&record, &rs, "github.com");
        assert_eq!(
            r,
            Remediation::DomainNotAllowed {
                host: "example.com".into(),
                port: Some(443),
                suggested_domains: "github.com,example.com".into(),
            }
        );
        assert!(r.message(&[]).contains("try --allow-domains \"github.com,example.com\""));
    }

    #[test]
    fn host_inside_allowlist_with_bad_port_is_port_not_allowed() {
        let allow = [parse("github.com").unwrap()];
        let rs = derive(&allow, &[]);
        let record = DenialRecord { domain: "github.com".into(), port: Some(8443) };
        let r = classify(&record, &rs, "github.com");
        assert_eq!(r, Remediation::PortNotAllowed { host: "github.com".into(), port: Some(8443) });
        let msg = r.message(&[]);
        assert!(msg.contains("port 8443 not allowed"));
        assert!(msg.contains("80, 443"));
        assert!(!msg.contains("allow-domains"));
    }

    #[test]
    fn subdomain_of_allowed_apex_is_port_not_allowed() {
        let allow = [parse("github.com").unwrap()];
        let rs = derive(&allow, &[]);
        let record = DenialRecord { domain: "api.github.com".into(), port: Some(8443) };
        let r = classify(&record, &rs, "github.com");
        assert!(matches!(r, Remediation::PortNotAllowed { .. }));
    }

    #[test]
    fn extra_allow_host_ports_are_listed_in_the_message() {
        let r = Remediation::PortNotAllowed { host: "github.com".into(), port: Some(9000) };
        let msg = r.message(&[PortSpec::Single(9000)]);
        assert!(msg.contains("80, 443, 9000"));
    }
}
