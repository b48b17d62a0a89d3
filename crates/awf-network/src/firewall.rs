//! Host Filter Installer (C4): the IPv4/IPv6 egress cage rooted in
//! `DOCKER-USER`, per spec.md §4.4.
//!
//! Rule construction is pure and synchronous (`v4_rules`/`v6_rules`) so
//! tests can assert on the exact append order without a real
//! `iptables`/`ip6tables` binary; execution walks that same list with one
//! subprocess per rule, in order, since append order is contractual.

use crate::error::{NetworkError, Result};
use std::net::IpAddr;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const CHAIN_V4: &str = "FW_WRAPPER";
pub const CHAIN_V6: &str = "FW_WRAPPER_V6";
const DOCKER_USER: &str = "DOCKER-USER";
const EMBEDDED_RESOLVER: &str = "127.0.0.11";

/// One `-A <chain> ...` rule, expressed as the argv tail after `-A <chain>`.
pub type RuleArgs = Vec<String>;

pub struct FirewallInstaller {
    squid_ip: IpAddr,
    bridge: String,
    dns_servers: Vec<IpAddr>,
    iptables_bin: String,
    ip6tables_bin: String,
}

impl FirewallInstaller {
    pub fn new(squid_ip: IpAddr, bridge: impl Into<String>, dns_servers: Vec<IpAddr>) -> Self {
        Self {
            squid_ip,
            bridge: bridge.into(),
            dns_servers,
            iptables_bin: "iptables".into(),
            ip6tables_bin: "ip6tables".into(),
        }
    }

    /// Ordered IPv4 `FW_WRAPPER` rule tails, per spec.md §4.4 steps 1-9.
    pub fn v4_rules(squid_ip: &IpAddr, dns_servers: &[IpAddr]) -> Vec<RuleArgs> {
        let mut rules = Vec::new();
        let a = |s: &str| s.split_whitespace().map(String::from).collect::<Vec<_>>();

        rules.push(a(&format!("-s {squid_ip} -j ACCEPT")));
        rules.push(a("-m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT"));
        rules.push(a("-o lo -j ACCEPT"));
        rules.push(a("-d 127.0.0.0/8 -j ACCEPT"));

        for dns in dns_servers.iter().filter(|d| d.is_ipv4()) {
            for proto in ["udp", "tcp"] {
                rules.push(a(&format!(
                    "-p {proto} -d {dns} --dport 53 -j LOG --log-prefix [FW_DNS_QUERY]"
                )));
                rules.push(a(&format!("-p {proto} -d {dns} --dport 53 -j ACCEPT")));
            }
        }

        rules.push(a(&format!(
            "-p udp -d {EMBEDDED_RESOLVER} --dport 53 -j ACCEPT"
        )));
        rules.push(a(&format!(
            "-p tcp -d {EMBEDDED_RESOLVER} --dport 53 -j ACCEPT"
        )));

        rules.push(a(&format!("-p tcp -d {squid_ip} --dport 3128 -j ACCEPT")));

        rules.push(a("-m addrtype --dst-type MULTICAST -j REJECT"));
        rules.push(a("-d 169.254.0.0/16 -j REJECT"));
        rules.push(a("-d 224.0.0.0/4 -j REJECT"));

        rules.push(a("-p udp -j LOG --log-prefix [FW_BLOCKED_UDP]"));
        rules.push(a("-p udp -j REJECT --reject-with icmp-port-unreachable"));

        rules.push(a("-j LOG --log-prefix [FW_BLOCKED_OTHER]"));
        rules.push(a("-j REJECT --reject-with icmp-port-unreachable"));

        rules
    }

    /// Ordered IPv6 `FW_WRAPPER_V6` rule tails. Built only when at least
    /// one trusted DNS server is IPv6; the sandbox subnet itself is
    /// IPv4-only so there is no squid/embedded-resolver analog here.
    pub fn v6_rules(dns_servers: &[IpAddr]) -> Vec<RuleArgs> {
        let mut rules = Vec::new();
        let a = |s: &str| s.split_whitespace().map(String::from).collect::<Vec<_>>();

        rules.push(a("-m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT"));
        rules.push(a("-o lo -j ACCEPT"));
        rules.push(a("-p ipv6-icmp -j ACCEPT"));

        for dns in dns_servers.iter().filter(|d| d.is_ipv6()) {
            for proto in ["udp", "tcp"] {
                rules.push(a(&format!(
                    "-p {proto} -d {dns} --dport 53 -j LOG --log-prefix [FW_DNS_QUERY]"
                )));
                rules.push(a(&format!("-p {proto} -d {dns} --dport 53 -j ACCEPT")));
            }
        }

        rules.push(a("-d ff00::/8 -j REJECT"));
        rules.push(a("-d fe80::/10 -j REJECT"));

        rules.push(a("-p udp -j LOG --log-prefix [FW_BLOCKED_UDP]"));
        rules.push(a("-p udp -j REJECT --reject-with icmp6-port-unreachable"));

        rules.push(a("-j LOG --log-prefix [FW_BLOCKED_OTHER]"));
        rules.push(a("-j REJECT --reject-with icmp6-port-unreachable"));

        rules
    }

    /// Probe, flush any stale chain, build the fresh cage, and hook it
    /// into `DOCKER-USER`. Fails fast with `PermissionDenied` on the
    /// first probe rather than leaving half-installed state.
    pub async fn install(&self) -> Result<()> {
        self.probe_permission(&self.iptables_bin).await?;

        self.dereference_and_drop(&self.iptables_bin, CHAIN_V4).await;
        self.create_chain(&self.iptables_bin, CHAIN_V4).await?;
        for rule in Self::v4_rules(&self.squid_ip, &self.dns_servers) {
            self.append(&self.iptables_bin, CHAIN_V4, &rule).await?;
        }
        self.insert_jump(&self.iptables_bin, CHAIN_V4, &self.bridge)
            .await?;
        info!(chain = CHAIN_V4, bridge = %self.bridge, "installed IPv4 egress cage");

        let wants_v6 = self.dns_servers.iter().any(IpAddr::is_ipv6);
        if wants_v6 {
            if !self.available(&self.ip6tables_bin).await {
                return Err(NetworkError::Ipv6CageUnavailable);
            }
            self.dereference_and_drop(&self.ip6tables_bin, CHAIN_V6).await;
            self.create_chain(&self.ip6tables_bin, CHAIN_V6).await?;
            for rule in Self::v6_rules(&self.dns_servers) {
                self.append(&self.ip6tables_bin, CHAIN_V6, &rule).await?;
            }
            self.insert_jump(&self.ip6tables_bin, CHAIN_V6, &self.bridge)
                .await?;
            info!(chain = CHAIN_V6, bridge = %self.bridge, "installed IPv6 egress cage");
        } else if !self.available(&self.ip6tables_bin).await {
            warn!("ip6tables unavailable and no IPv6 DNS server configured; skipping v6 cage");
        }

        Ok(())
    }

    /// Best-effort teardown. Never fails: every step's error is logged
    /// and swallowed, since cleanup runs from both the normal and the
    /// signal path and must complete regardless.
    pub async fn cleanup(&self) -> Result<()> {
        self.dereference_and_drop(&self.iptables_bin, CHAIN_V4).await;
        self.dereference_and_drop(&self.ip6tables_bin, CHAIN_V6).await;
        Ok(())
    }

    async fn probe_permission(&self, bin: &str) -> Result<()> {
        let output = self.run_raw(bin, &["-L", DOCKER_USER]).await?;
        if !output.status.success() {
            return Err(NetworkError::PermissionDenied(format!(
                "{bin} -L {DOCKER_USER} failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    async fn available(&self, bin: &str) -> bool {
        Command::new(bin)
            .arg("-L")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Delete every jump from `DOCKER-USER` into `chain`, in reverse line
    /// order, then flush and delete `chain` itself. Logged, never
    /// propagated.
    async fn dereference_and_drop(&self, bin: &str, chain: &str) {
        if let Ok(output) = self
            .run_raw(bin, &["-L", DOCKER_USER, "--line-numbers", "-n"])
            .await
        {
            let text = String::from_utf8_lossy(&output.stdout);
            let mut line_numbers: Vec<u32> = text
                .lines()
                .filter(|l| l.contains(chain))
                .filter_map(|l| l.split_whitespace().next())
                .filter_map(|n| n.parse().ok())
                .collect();
            line_numbers.sort_unstable_by(|a, b| b.cmp(a));
            for n in line_numbers {
                let _ = self
                    .run_raw(bin, &["-D", DOCKER_USER, &n.to_string()])
                    .await;
            }
        }
        let _ = self.run_raw(bin, &["-F", chain]).await;
        let _ = self.run_raw(bin, &["-X", chain]).await;
        debug!(chain, "dereferenced and dropped any stale chain");
    }

    async fn create_chain(&self, bin: &str, chain: &str) -> Result<()> {
        let output = self.run_raw(bin, &["-N", chain]).await?;
        if !output.status.success() {
            return Err(NetworkError::CommandFailed(format!(
                "{bin} -N {chain} failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    async fn append(&self, bin: &str, chain: &str, rule: &[String]) -> Result<()> {
        let mut args: Vec<&str> = vec!["-A", chain];
        args.extend(rule.iter().map(String::as_str));
        let output = self.run_raw(bin, &args).await?;
        if !output.status.success() {
            return Err(NetworkError::CommandFailed(format!(
                "{bin} -A {chain} {} failed: {}",
                rule.join(" "),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    async fn insert_jump(&self, bin: &str, chain: &str, bridge: &str) -> Result<()> {
        let output = self
            .run_raw(
                bin,
                &["-I", DOCKER_USER, "1", "-i", bridge, "-j", chain],
            )
            .await?;
        if !output.status.success() {
            return Err(NetworkError::CommandFailed(format!(
                "{bin} -I {DOCKER_USER} failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    async fn run_raw(&self, bin: &str, args: &[&str]) -> Result<std::process::Output> {
        Command::new(bin)
            .args(args)
            .output()
            .await
            .map_err(|e| NetworkError::EngineUnavailable(format!("{bin}: {e}")))
    }
}
