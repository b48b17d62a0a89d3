//! Bridge network provisioning (C3) and host packet-filter egress cage
//! (C4): the two components that, together with the container spec
//! builder, keep the sandbox's addressing and its firewall rules in
//! agreement (spec.md §4.3, §4.4).

pub mod addressing;
pub mod error;
pub mod firewall;
pub mod provisioner;

pub use error::{NetworkError, Result};
pub use firewall::{FirewallInstaller, CHAIN_V4, CHAIN_V6};
pub use provisioner::{NetworkProvisioner, DEFAULT_ENGINE};
