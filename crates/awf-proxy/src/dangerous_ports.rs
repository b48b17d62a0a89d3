//! The fixed dangerous-ports blocklist: ports `--allow-host-ports` can
//! never open, regardless of operator intent. The allowlist exists so an
//! agent can reach local dev services on the host, not so it can
//! lateral-move into a database.

use crate::error::{ProxyConfigError, Result};
use awf_types::PortSpec;

/// `(port, service)` pairs rejected even under an explicit
/// `--allow-host-ports`.
pub const DANGEROUS_PORTS: &[(u16, &str)] = &[
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (445, "SMB"),
    (1433, "MSSQL"),
    (1521, "Oracle"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5984, "CouchDB"),
    (6379, "Redis"),
    (6984, "CouchDB over SSL"),
    (8086, "InfluxDB"),
    (8088, "Hadoop/Cloudera web UI"),
    (9200, "Elasticsearch"),
    (9300, "Elasticsearch transport"),
    (27017, "MongoDB"),
    (27018, "MongoDB shard"),
    (28017, "MongoDB web"),
];

pub fn is_dangerous_port(port: u16) -> Option<&'static str> {
    DANGEROUS_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, service)| *service)
}

/// `true` iff `[start, end]` spans any dangerous port.
pub fn range_overlaps_dangerous(start: u16, end: u16) -> Option<(u16, &'static str)> {
    DANGEROUS_PORTS
        .iter()
        .find(|(p, _)| *p >= start && *p <= end)
        .map(|(p, service)| (*p, *service))
}

/// Validate one `--allow-host-ports` entry against the blocklist. A range
/// overlapping any dangerous port is rejected whole, per spec.md §4.2.
pub fn validate_port_spec(spec: &PortSpec) -> Result<()> {
    match spec {
        PortSpec::Single(port) => {
            if let Some(service) = is_dangerous_port(*port) {
                return Err(ProxyConfigError::DangerousPort {
                    port: *port,
                    service,
                });
            }
        }
        PortSpec::Range(start, end) => {
            if let Some((port, service)) = range_overlaps_dangerous(*start, *end) {
                return Err(ProxyConfigError::DangerousPortRange {
                    start: *start,
                    end: *end,
                    port,
                    service,
                });
            }
        }
    }
    Ok(())
}
