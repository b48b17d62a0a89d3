//! Pre-resolved `hosts` file (spec.md §4.5 "Pre-resolved hosts file").
//!
//! Lets the agent reach an allowed host even when its in-chroot resolver
//! is itself restricted. Only plain hostnames can be pre-resolved;
//! wildcards have no single address to record.

use awf_domain::ProxyRuleset;
use std::net::IpAddr;

/// Abstracts host resolution so the builder can be tested without real
/// DNS. `awf-runtime` wires in [`SystemResolver`] for production use.
pub trait HostResolver {
    fn resolve(&self, domain: &str) -> Option<IpAddr>;
}

pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, domain: &str) -> Option<IpAddr> {
        dns_lookup::lookup_host(domain).ok()?.into_iter().next()
    }
}

const HEADER: &str = "# generated by the egress firewall wrapper, do not edit by hand\n\
127.0.0.1\tlocalhost\n\
::1\tlocalhost ip6-localhost ip6-loopback\n";

/// Build the `/etc/hosts`-format text for every plain domain the
/// allowlist survived redundancy elimination with, skipping any that
/// fail to resolve.
pub fn build_hosts_file(ruleset: &ProxyRuleset, resolver: &dyn HostResolver) -> String {
    let mut out = String::from(HEADER);
    for domain in ruleset.all_plain() {
        if let Some(ip) = resolver.resolve(domain) {
            out.push_str(&format!("{ip}\t{domain}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use awf_domain::ruleset::derive;
    use awf_domain::spec::parse;
    use std::collections::HashMap;

    struct FakeResolver(HashMap<&'static str, IpAddr>);

    impl HostResolver for FakeResolver {
        fn resolve(&self, domain: &str) -> Option<IpAddr> {
            self.0.get(domain).copied()
        }
    }

    #[test]
    fn resolves_plain_domains_and_skips_unresolvable_and_wildcards() {
        let allow = [
            parse("github.com").unwrap(),
            parse("unresolvable.invalid").unwrap(),
            parse("*.example.com").unwrap(),
        ];
        let rs = derive(&allow, &[]);
        let mut map = HashMap::new();
        map.insert("github.com", "140.82.112.3".parse().unwrap());
        let resolver = FakeResolver(map);

        let hosts = build_hosts_file(&rs, &resolver);
        assert!(hosts.contains("140.82.112.3\tgithub.com"));
        assert!(!hosts.contains("unresolvable.invalid"));
        assert!(!hosts.contains("example.com") || hosts.contains("ip6-loopback"));
    }

    #[test]
    fn always_includes_loopback_entries() {
        let rs = derive(&[], &[]);
        let resolver = FakeResolver(HashMap::new());
        let hosts = build_hosts_file(&rs, &resolver);
        assert!(hosts.contains("127.0.0.1\tlocalhost"));
    }
}
