//! Sanity check on [`NetworkConfig`]'s fixed addressing plan (spec.md
//! §3: "the constancy is deliberate ... must not disagree").
//!
//! `NetworkConfig::current()` is a compile-time constant, so this can
//! never fail in practice; it exists so the invariant the constant is
//! supposed to uphold is checked code, not just a doc comment, and so a
//! future edit to the addressing plan fails loudly instead of silently
//! producing a host-filter/compose mismatch.

use crate::error::{NetworkError, Result};
use awf_types::NetworkConfig;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// `true` iff `squid_ip`, `agent_ip`, and `api_proxy_ip` all fall inside
/// `subnet` and are pairwise distinct.
pub fn validate(cfg: &NetworkConfig) -> Result<()> {
    let subnet = Ipv4Network::from_str(cfg.subnet)
        .map_err(|e| NetworkError::CommandFailed(format!("invalid subnet {}: {e}", cfg.subnet)))?;

    for addr in [cfg.squid_ip, cfg.agent_ip, cfg.api_proxy_ip] {
        let ip = Ipv4Addr::from_str(addr)
            .map_err(|e| NetworkError::CommandFailed(format!("invalid fixed address {addr}: {e}")))?;
        if !subnet.contains(ip) {
            return Err(NetworkError::AddressOutsideSubnet {
                addr: addr.to_string(),
                subnet: cfg.subnet.to_string(),
            });
        }
    }

    if cfg.squid_ip == cfg.agent_ip || cfg.squid_ip == cfg.api_proxy_ip || cfg.agent_ip == cfg.api_proxy_ip {
        return Err(NetworkError::CommandFailed(
            "squid_ip, agent_ip, and api_proxy_ip must be pairwise distinct".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Shifting any one reserved address to a fixed out-of-subnet host
        /// (the subnet's own network address minus one, which can never be
        /// a valid host address in a `/24`) is rejected regardless of which
        /// of the three fields moves.
        #[test]
        fn an_address_outside_the_subnet_is_always_rejected(pick in 0u8..3) {
            let mut cfg = NetworkConfig::current();
            let outside = "172.29.255.254";
            match pick {
                0 => cfg.squid_ip = outside,
                1 => cfg.agent_ip = outside,
                _ => cfg.api_proxy_ip = outside,
            }
            let err = validate(&cfg).unwrap_err();
            prop_assert!(matches!(err, NetworkError::AddressOutsideSubnet { .. }));
        }
    }

    #[test]
    fn the_release_addressing_plan_is_internally_consistent() {
        validate(&NetworkConfig::current()).unwrap();
    }

    #[test]
    fn detects_an_ip_outside_the_subnet() {
        let mut cfg = NetworkConfig::current();
        cfg.agent_ip = "10.0.0.20";
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err, NetworkError::AddressOutsideSubnet { .. }));
    }

    #[test]
    fn detects_a_collision_between_reserved_addresses() {
        let mut cfg = NetworkConfig::current();
        cfg.agent_ip = cfg.squid_ip;
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err, NetworkError::CommandFailed(_)));
    }
}
