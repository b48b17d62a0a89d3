//! Emits a complete Squid configuration text from a [`ProxyRuleset`], a
//! DNS server list, a port policy, and feature flags (spec.md §4.2).
//!
//! The access-log format written here is a contract with `awf-monitor`'s
//! denial classifier (C7): any line containing `TCP_DENIED` must carry
//! the requested `host[:port]` as the last whitespace-delimited token
//! before the quoted user-agent.

use awf_domain::ProxyRuleset;
use awf_types::PortSpec;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::path::PathBuf;

/// Squid's listening port inside its container, fixed by `awf-types`.
pub use awf_types::network::SQUID_PORT;

#[derive(Debug, Clone, Default)]
pub struct SynthesizerOptions {
    pub dns_servers: Vec<IpAddr>,
    pub allow_host_ports: Vec<PortSpec>,
    pub url_patterns: Vec<String>,
    pub enable_ssl_bump: bool,
    pub ca_cert_path: Option<PathBuf>,
}

/// Squid logformat name and access_log path used by both this emitter and
/// the denial classifier's expectations.
pub const ACCESS_LOG_FORMAT_NAME: &str = "awf";
pub const ACCESS_LOG_PATH: &str = "/var/log/squid/access.log";

pub fn synthesize(ruleset: &ProxyRuleset, options: &SynthesizerOptions) -> String {
    let mut out = String::new();

    writeln!(out, "# generated configuration, do not edit by hand").unwrap();
    writeln!(out, "http_port {SQUID_PORT}").unwrap();
    writeln!(out).unwrap();

    write_timeouts(&mut out);
    write_caching_disabled(&mut out);
    write_dns_servers(&mut out, &options.dns_servers);
    write_safe_ports(&mut out, &options.allow_host_ports);
    write_direct_ip_rejection(&mut out);
    write_domain_acls(&mut out, ruleset);
    write_block_acls(&mut out, ruleset);

    if options.enable_ssl_bump && options.ca_cert_path.is_some() {
        write_ssl_bump(&mut out, options.ca_cert_path.as_ref().unwrap());
        write_url_pattern_acls(&mut out, &options.url_patterns);
    }

    write_access_rules(&mut out, ruleset, options);
    write_access_log(&mut out);

    out
}

fn write_timeouts(out: &mut String) {
    writeln!(out, "# timeouts sized for long-running model inference").unwrap();
    writeln!(out, "read_timeout 30 minutes").unwrap();
    writeln!(out, "request_timeout 30 minutes").unwrap();
    writeln!(out, "client_lifetime 8 hours").unwrap();
    writeln!(out, "half_closed_clients on").unwrap();
    writeln!(out).unwrap();
}

fn write_caching_disabled(out: &mut String) {
    writeln!(out, "cache deny all").unwrap();
    writeln!(out, "no_cache deny all").unwrap();
    writeln!(out).unwrap();
}

fn write_dns_servers(out: &mut String, servers: &[IpAddr]) {
    if servers.is_empty() {
        return;
    }
    let csv = servers
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "dns_nameservers {csv}").unwrap();
    writeln!(out).unwrap();
}

fn write_safe_ports(out: &mut String, allow_host_ports: &[PortSpec]) {
    let mut entries = vec!["80".to_string(), "443".to_string()];
    for spec in allow_host_ports {
        match spec {
            PortSpec::Single(p) => entries.push(p.to_string()),
            PortSpec::Range(s, e) => entries.push(format!("{s}-{e}")),
        }
    }
    writeln!(out, "acl Safe_ports port {}", entries.join(" ")).unwrap();
    writeln!(out, "http_access deny !Safe_ports").unwrap();
    writeln!(out).unwrap();
}

fn write_direct_ip_rejection(out: &mut String) {
    writeln!(out, "# deny direct-IP destinations to prevent SNI/Host bypass").unwrap();
    writeln!(
        out,
        r#"acl dst_ip_literal dstdom_regex -i ^[0-9]{{1,3}}(\.[0-9]{{1,3}}){{3}}$"#
    )
    .unwrap();
    writeln!(out, "acl dst_has_colon dstdom_regex -i :").unwrap();
    writeln!(out, "http_access deny dst_ip_literal").unwrap();
    writeln!(out, "http_access deny dst_has_colon").unwrap();
    writeln!(out).unwrap();
}

fn protocol_acl_name(bucket: &str, protocol: &str) -> String {
    format!("allow_{bucket}_{protocol}")
}

fn write_domain_acls(out: &mut String, ruleset: &ProxyRuleset) {
    writeln!(out, "# allowlist, derived from the operator's domain list").unwrap();
    write_plain_bucket(out, "http", &ruleset.plain_http);
    write_plain_bucket(out, "https", &ruleset.plain_https);
    write_plain_bucket(out, "both", &ruleset.plain_both);
    write_wildcard_bucket(out, "http", &ruleset.wildcard_http);
    write_wildcard_bucket(out, "https", &ruleset.wildcard_https);
    write_wildcard_bucket(out, "both", &ruleset.wildcard_both);
    writeln!(out).unwrap();
}

fn write_plain_bucket(out: &mut String, protocol: &str, domains: &[String]) {
    if domains.is_empty() {
        return;
    }
    let acl = protocol_acl_name("plain", protocol);
    // A leading dot matches the host and every subdomain below it. The
    // suffix-elimination pass already dropped any subdomain explicitly
    // listed alongside its apex, so this is the intended meaning, not an
    // accidental widening.
    let entries = domains
        .iter()
        .map(|d| format!(".{d}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "acl {acl} dstdomain {entries}").unwrap();
}

fn write_wildcard_bucket(out: &mut String, protocol: &str, patterns: &[String]) {
    if patterns.is_empty() {
        return;
    }
    for (i, pattern) in patterns.iter().enumerate() {
        let acl = format!("{}_{}", protocol_acl_name("wildcard", protocol), i);
        let regex = awf_domain::pattern::compile_pattern(pattern);
        writeln!(out, "acl {acl} dstdom_regex -i {}", regex.as_str()).unwrap();
    }
}

fn write_block_acls(out: &mut String, ruleset: &ProxyRuleset) {
    if ruleset.block.is_empty() {
        return;
    }
    writeln!(out, "# blocklist, takes precedence over the allowlist").unwrap();
    let mut entries = Vec::new();
    for (i, spec) in ruleset.block.iter().enumerate() {
        match &spec.body {
            awf_domain::DomainSpecBody::Plain(d) => entries.push(format!(".{d}")),
            awf_domain::DomainSpecBody::Wildcard(w) => {
                let regex = awf_domain::pattern::compile_pattern(w);
                writeln!(out, "acl block_wildcard_{i} dstdom_regex -i {}", regex.as_str())
                    .unwrap();
            }
        }
    }
    if !entries.is_empty() {
        writeln!(out, "acl block_plain dstdomain {}", entries.join(" ")).unwrap();
    }
    writeln!(out).unwrap();
}

fn write_ssl_bump(out: &mut String, ca_cert_path: &PathBuf) {
    writeln!(out, "# SSL bump: peek the ClientHello, inspect the cert, then bump").unwrap();
    writeln!(out, "https_port 3129 ssl-bump cert={}", ca_cert_path.display()).unwrap();
    writeln!(out, "acl step1 at_step SslBump1").unwrap();
    writeln!(out, "acl step2 at_step SslBump2").unwrap();
    writeln!(out, "ssl_bump peek step1").unwrap();
    writeln!(out, "ssl_bump stare step2").unwrap();
    writeln!(out, "ssl_bump bump all").unwrap();
    writeln!(out).unwrap();
}

fn write_url_pattern_acls(out: &mut String, url_patterns: &[String]) {
    if url_patterns.is_empty() {
        return;
    }
    let patterns = url_patterns.join(" ");
    writeln!(out, "acl url_patterns url_regex -i {patterns}").unwrap();
    writeln!(out).unwrap();
}

fn write_access_rules(out: &mut String, ruleset: &ProxyRuleset, options: &SynthesizerOptions) {
    writeln!(out, "http_access allow localhost manager").unwrap();
    writeln!(out, "http_access deny manager").unwrap();
    writeln!(out, "acl CONNECT method CONNECT").unwrap();

    let mut allow_acls: Vec<(String, &str)> = Vec::new();
    for (bucket, protocol) in [
        (&ruleset.plain_http, "http"),
        (&ruleset.plain_https, "https"),
        (&ruleset.plain_both, "both"),
    ] {
        if !bucket.is_empty() {
            allow_acls.push((protocol_acl_name("plain", protocol), protocol));
        }
    }
    for (bucket, protocol) in [
        (&ruleset.wildcard_http, "http"),
        (&ruleset.wildcard_https, "https"),
        (&ruleset.wildcard_both, "both"),
    ] {
        for i in 0..bucket.len() {
            allow_acls.push((format!("{}_{}", protocol_acl_name("wildcard", protocol), i), protocol));
        }
    }

    if !ruleset.block.is_empty() {
        writeln!(out, "http_access deny block_plain").unwrap();
        for i in 0..ruleset.block.len() {
            writeln!(out, "http_access deny block_wildcard_{i}").unwrap();
        }
    }

    let has_url_patterns = options.enable_ssl_bump && !options.url_patterns.is_empty();
    for (acl, protocol) in &allow_acls {
        match *protocol {
            // HTTPS-only domains only ever reach Squid as a CONNECT tunnel
            // request; the bump, when enabled, re-originates the decrypted
            // request, which url_patterns then filters.
            "https" => {
                writeln!(out, "http_access allow CONNECT {acl}").unwrap();
                if has_url_patterns {
                    writeln!(out, "http_access allow url_patterns {acl}").unwrap();
                }
            }
            // HTTP-only domains never arrive via CONNECT; admitting a
            // CONNECT here would let the client tunnel arbitrary TLS to a
            // host only cleared for plaintext.
            "http" => {
                writeln!(out, "http_access allow !CONNECT {acl}").unwrap();
            }
            _ => {
                writeln!(out, "http_access allow {acl}").unwrap();
            }
        }
    }

    writeln!(out, "http_access deny all").unwrap();
    writeln!(out).unwrap();
}

fn write_access_log(out: &mut String) {
    writeln!(
        out,
        r#"logformat {ACCESS_LOG_FORMAT_NAME} %tl %>a:%>p %>rd %<a:%<p %rv %rm %03>Hs %Ss:%Sh %ru "%{{User-Agent}}>h""#
    )
    .unwrap();
    writeln!(out, "access_log {ACCESS_LOG_PATH} {ACCESS_LOG_FORMAT_NAME}").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use awf_domain::{parse, ruleset::derive};

    #[test]
    fn emits_exactly_one_plain_acl_per_minimal_element() {
        let allow = [parse("github.com").unwrap(), parse("api.github.com").unwrap()];
        let rs = derive(&allow, &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("acl allow_plain_both dstdomain .github.com"));
        assert!(!conf.contains("api.github.com"));
    }

    #[test]
    fn safe_ports_defaults_to_80_and_443() {
        let rs = derive(&[], &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("acl Safe_ports port 80 443"));
    }

    #[test]
    fn allow_host_ports_extend_safe_ports() {
        let rs = derive(&[], &[]);
        let opts = SynthesizerOptions {
            allow_host_ports: vec![PortSpec::Range(3000, 3010)],
            ..Default::default()
        };
        let conf = synthesize(&rs, &opts);
        assert!(conf.contains("acl Safe_ports port 80 443 3000-3010"));
    }

    #[test]
    fn rejects_direct_ip_destinations() {
        let rs = derive(&[], &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("dst_ip_literal"));
        assert!(conf.contains("http_access deny dst_ip_literal"));
    }

    #[test]
    fn disables_caching() {
        let rs = derive(&[], &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("cache deny all"));
    }

    #[test]
    fn timeouts_match_long_running_inference() {
        let rs = derive(&[], &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("read_timeout 30 minutes"));
        assert!(conf.contains("client_lifetime 8 hours"));
        assert!(conf.contains("half_closed_clients on"));
    }

    #[test]
    fn block_list_rules_precede_being_unreachable() {
        let allow = [parse("github.com").unwrap()];
        let block = [parse("evil.github.com").unwrap()];
        let rs = derive(&allow, &block);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("http_access deny block_plain"));
    }

    #[test]
    fn https_only_domains_are_gated_on_connect() {
        let allow = [parse("https://pypi.org").unwrap()];
        let rs = derive(&allow, &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("acl CONNECT method CONNECT"));
        assert!(conf.contains("http_access allow CONNECT allow_plain_https"));
        assert!(!conf.contains("http_access allow allow_plain_https\n"));
    }

    #[test]
    fn http_only_domains_reject_connect_tunnels() {
        let allow = [parse("http://example.com").unwrap()];
        let rs = derive(&allow, &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("http_access allow !CONNECT allow_plain_http"));
    }

    #[test]
    fn both_protocol_domains_are_unqualified() {
        let allow = [parse("github.com").unwrap()];
        let rs = derive(&allow, &[]);
        let conf = synthesize(&rs, &SynthesizerOptions::default());
        assert!(conf.contains("http_access allow allow_plain_both"));
    }
}
