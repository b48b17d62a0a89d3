//! Fixed network addressing shared by the provisioner, the host filter,
//! and the container spec builder.
//!
//! These values are constant per release, deliberately: C4's rule set and
//! C5's service definitions both name `172.30.0.10` and the bridge device
//! by name, and the two must never disagree. Randomizing any of this would
//! mean threading a discovered value through three independent layers for
//! no real benefit — the reserved `/24` is assumed free, and network
//! creation simply fails loudly if it collides with something else on the
//! host.

/// Constant addressing plan for the sandbox bridge network.
#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub subnet: &'static str,
    pub bridge: &'static str,
    pub network: &'static str,
    pub squid_ip: &'static str,
    pub agent_ip: &'static str,
    pub api_proxy_ip: &'static str,
}

impl NetworkConfig {
    pub const fn current() -> Self {
        Self {
            subnet: "172.30.0.0/24",
            bridge: "fw-bridge",
            network: "awf-net",
            squid_ip: "172.30.0.10",
            agent_ip: "172.30.0.20",
            api_proxy_ip: "172.30.0.30",
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::current()
    }
}

/// Squid's forward-proxy listening port inside its container.
pub const SQUID_PORT: u16 = 3128;

/// The engine's embedded DNS resolver address, reachable from every
/// container on a user-defined bridge network.
pub const EMBEDDED_RESOLVER_IP: &str = "127.0.0.11";
