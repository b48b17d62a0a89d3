//! Proxy config synthesizer (C2): emits a complete Squid configuration
//! text from a domain ruleset, a blocklist, a port policy, and feature
//! flags.

pub mod dangerous_ports;
pub mod error;
pub mod synthesizer;

pub use dangerous_ports::{is_dangerous_port, range_overlaps_dangerous, DANGEROUS_PORTS};
pub use error::{ProxyConfigError, Result};
pub use synthesizer::{synthesize, SynthesizerOptions};
