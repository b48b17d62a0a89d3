//! The validated, immutable configuration value threaded through every
//! component for one invocation.

use crate::error::{CommonError, Result};
use awf_domain::DomainSpec;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;

/// `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(CommonError::Validation(format!(
                "unknown log level: {other}"
            ))),
        }
    }
}

/// A single port or an inclusive `start-end` range, as accepted by
/// `--allow-host-ports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSpec {
    Single(u16),
    Range(u16, u16),
}

impl PortSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some((start, end)) = raw.split_once('-') {
            let start: u16 = start
                .trim()
                .parse()
                .map_err(|_| CommonError::Validation(format!("invalid port range: {raw}")))?;
            let end: u16 = end
                .trim()
                .parse()
                .map_err(|_| CommonError::Validation(format!("invalid port range: {raw}")))?;
            crate::validation::PortValidator::validate_range(start, end)?;
            Ok(PortSpec::Range(start, end))
        } else {
            let port: u16 = raw
                .trim()
                .parse()
                .map_err(|_| CommonError::Validation(format!("invalid port: {raw}")))?;
            crate::validation::PortValidator::validate(port)?;
            Ok(PortSpec::Single(port))
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        match self {
            PortSpec::Single(p) => *p == port,
            PortSpec::Range(start, end) => port >= *start && port <= *end,
        }
    }

    /// `(start, end)`, inclusive, collapsing a single port to a
    /// one-element range.
    pub fn bounds(&self) -> (u16, u16) {
        match self {
            PortSpec::Single(p) => (*p, *p),
            PortSpec::Range(s, e) => (*s, *e),
        }
    }
}

/// `ro`/`rw` suffix on a `-v HOST:CONTAINER[:ro|rw]` mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    ReadOnly,
    ReadWrite,
}

impl Default for MountMode {
    fn default() -> Self {
        MountMode::ReadWrite
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMount {
    pub host: PathBuf,
    pub container: PathBuf,
    pub mode: MountMode,
}

impl HostMount {
    /// Parse `HOST:CONTAINER` or `HOST:CONTAINER:ro|rw`.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        let (host, container, mode) = match parts.as_slice() {
            [host, container] => (*host, *container, MountMode::ReadWrite),
            [host, container, "ro"] => (*host, *container, MountMode::ReadOnly),
            [host, container, "rw"] => (*host, *container, MountMode::ReadWrite),
            _ => {
                return Err(CommonError::Validation(format!(
                    "invalid volume mount spec: {raw}"
                )))
            }
        };
        if host.is_empty() || container.is_empty() {
            return Err(CommonError::Validation(format!(
                "volume mount spec has an empty path: {raw}"
            )));
        }
        crate::validation::PathValidator::reject_traversal(std::path::Path::new(host))?;
        Ok(Self {
            host: PathBuf::from(host),
            container: PathBuf::from(container),
            mode,
        })
    }
}

/// `--agent-image`: either a known preset name or a base-image reference
/// that must appear in the allowlist documented in spec.md §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentImageSpec {
    Preset(AgentPreset),
    Ref(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPreset {
    Default,
    Act,
}

impl AgentImageSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "default" => return Ok(AgentImageSpec::Preset(AgentPreset::Default)),
            "act" => return Ok(AgentImageSpec::Preset(AgentPreset::Act)),
            _ => {}
        }
        if is_allowed_base_image(raw) {
            Ok(AgentImageSpec::Ref(raw.to_string()))
        } else {
            Err(CommonError::Validation(format!(
                "agent image is not on the allowlist: {raw}"
            )))
        }
    }
}

fn is_allowed_base_image(raw: &str) -> bool {
    let (without_digest, _digest) = match raw.split_once('@') {
        Some((base, digest)) => {
            if !digest.starts_with("sha256:") || digest.len() != "sha256:".len() + 64 {
                return false;
            }
            let hex = &digest["sha256:".len()..];
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return false;
            }
            (base, Some(digest))
        }
        None => (raw, None),
    };

    matches!(
        without_digest,
        "ubuntu:20.04" | "ubuntu:22.04" | "ubuntu:24.04"
    ) || is_catthehacker_runner_ref(without_digest)
}

fn is_catthehacker_runner_ref(raw: &str) -> bool {
    let Some(tag) = raw.strip_prefix("ghcr.io/catthehacker/ubuntu:") else {
        return false;
    };
    let Some(version) = tag.strip_prefix("runner-").or_else(|| tag.strip_prefix("full-")) else {
        return false;
    };
    let Some((major, minor)) = version.split_once('.') else {
        return false;
    };
    major.len() == 2
        && minor.len() == 2
        && major.chars().all(|c| c.is_ascii_digit())
        && minor.chars().all(|c| c.is_ascii_digit())
}

/// Validated, immutable input shared read-only across every component for
/// the duration of one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub allow_domains: Vec<DomainSpec>,
    pub block_domains: Vec<DomainSpec>,
    pub url_patterns: Vec<String>,
    pub dns_servers: Vec<IpAddr>,
    pub log_level: LogLevel,
    pub keep_containers: bool,
    pub work_dir: PathBuf,
    pub image_registry: String,
    pub image_tag: String,
    pub build_local: bool,
    pub agent_image: AgentImageSpec,
    pub agent_cmd: String,
    pub additional_env: HashMap<String, String>,
    pub env_all: bool,
    pub volume_mounts: Vec<HostMount>,
    pub container_work_dir: Option<PathBuf>,
    pub allow_full_fs: bool,
    pub tty: bool,
    pub enable_host_access: bool,
    pub allow_host_ports: Vec<PortSpec>,
    pub enable_api_proxy: bool,
    pub openai_key: Option<String>,
    pub anthropic_key: Option<String>,
    pub proxy_logs_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_spec_parses_single_and_range() {
        assert_eq!(PortSpec::parse("8080").unwrap(), PortSpec::Single(8080));
        assert_eq!(
            PortSpec::parse("3000-3010").unwrap(),
            PortSpec::Range(3000, 3010)
        );
        assert!(PortSpec::parse("not-a-port").is_err());
    }

    #[test]
    fn host_mount_parses_mode_suffix() {
        let m = HostMount::parse("/host/path:/container/path:ro").unwrap();
        assert_eq!(m.mode, MountMode::ReadOnly);
        let m = HostMount::parse("/host/path:/container/path").unwrap();
        assert_eq!(m.mode, MountMode::ReadWrite);
        assert!(HostMount::parse("/host/path").is_err());
    }

    #[test]
    fn agent_image_accepts_presets_and_allowlisted_refs() {
        assert!(matches!(
            AgentImageSpec::parse("default").unwrap(),
            AgentImageSpec::Preset(AgentPreset::Default)
        ));
        assert!(AgentImageSpec::parse("ubuntu:22.04").is_ok());
        assert!(AgentImageSpec::parse("ghcr.io/catthehacker/ubuntu:runner-22.04").is_ok());
        assert!(AgentImageSpec::parse("ghcr.io/catthehacker/ubuntu:full-24.04").is_ok());
        let digest = format!("ubuntu:22.04@sha256:{}", "a".repeat(64));
        assert!(AgentImageSpec::parse(&digest).is_ok());
    }

    #[test]
    fn agent_image_rejects_unknown_refs() {
        assert!(AgentImageSpec::parse("debian:bookworm").is_err());
        assert!(AgentImageSpec::parse("ubuntu:18.04").is_err());
        let bad_digest = "ubuntu:22.04@sha256:nothex";
        assert!(AgentImageSpec::parse(bad_digest).is_err());
    }
}
