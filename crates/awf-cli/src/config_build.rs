//! Turns parsed CLI arguments into a validated [`Config`], eagerly
//! (spec.md §7: `ConfigInvalid` is raised before any side effect runs).
//!
//! `RawArgs` mirrors [`crate::cli::Cli`] field for field but carries no
//! `clap` derive of its own, so this module's validation rules can be
//! exercised without going through argument parsing.

use crate::error::{CliError, Result};
use awf_domain::DomainSpec;
use awf_proxy::dangerous_ports::validate_port_spec;
use awf_types::config::{AgentImageSpec, HostMount, LogLevel, PortSpec};
use awf_types::Config;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct RawArgs {
    pub allow_domains: Vec<String>,
    pub allow_domains_file: Option<PathBuf>,
    pub block_domains: Vec<String>,
    pub url_patterns: Vec<String>,
    pub dns: Vec<String>,
    pub log_level: String,
    pub keep_containers: bool,
    pub work_dir: Option<PathBuf>,
    pub build_local: bool,
    pub image_registry: String,
    pub image_tag: String,
    pub agent_image: String,
    pub env: Vec<String>,
    pub env_all: bool,
    pub volume: Vec<String>,
    pub container_work_dir: Option<PathBuf>,
    pub allow_full_filesystem_access: bool,
    pub tty: bool,
    pub enable_host_access: bool,
    pub allow_host_ports: Vec<String>,
    pub enable_api_proxy: bool,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub proxy_logs_dir: Option<PathBuf>,
    pub cmd: Vec<String>,
}

pub fn config_build(raw: &RawArgs) -> Result<Config> {
    let mut domain_texts: Vec<String> = raw
        .allow_domains
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(path) = &raw.allow_domains_file {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CliError::ConfigInvalid(format!(
                "could not read --allow-domains-file {}: {e}",
                path.display()
            ))
        })?;
        domain_texts.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }

    let allow_domains = parse_domain_list(&domain_texts)?;
    if allow_domains.is_empty() {
        return Err(CliError::ConfigInvalid(
            "at least one domain is required in --allow-domains".to_string(),
        ));
    }
    let block_domains = parse_domain_list(&raw.block_domains)?;

    let dns_servers = parse_dns(&raw.dns)?;
    if dns_servers.is_empty() {
        return Err(CliError::ConfigInvalid(
            "at least one DNS server is required".to_string(),
        ));
    }

    let log_level =
        LogLevel::parse(&raw.log_level).map_err(|e| CliError::ConfigInvalid(e.to_string()))?;

    let agent_image = AgentImageSpec::parse(&raw.agent_image)
        .map_err(|e| CliError::ConfigInvalid(e.to_string()))?;

    let additional_env = parse_env_assignments(&raw.env)?;

    let volume_mounts = raw
        .volume
        .iter()
        .map(|v| HostMount::parse(v).map_err(|e| CliError::ConfigInvalid(e.to_string())))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let allow_host_ports = raw
        .allow_host_ports
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| PortSpec::parse(s).map_err(|e| CliError::ConfigInvalid(e.to_string())))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for port in &allow_host_ports {
        validate_port_spec(port).map_err(|e| CliError::ConfigInvalid(e.to_string()))?;
    }

    if raw.enable_api_proxy && raw.openai_api_key.is_none() && raw.anthropic_api_key.is_none() {
        return Err(CliError::ConfigInvalid(
            "--enable-api-proxy requires --openai-api-key or --anthropic-api-key".to_string(),
        ));
    }

    let work_dir = raw.work_dir.clone().unwrap_or_else(default_work_dir);

    Ok(Config {
        allow_domains,
        block_domains,
        url_patterns: raw.url_patterns.clone(),
        dns_servers,
        log_level,
        keep_containers: raw.keep_containers,
        work_dir,
        image_registry: raw.image_registry.clone(),
        image_tag: raw.image_tag.clone(),
        build_local: raw.build_local,
        agent_image,
        agent_cmd: quote_and_join(&raw.cmd),
        additional_env,
        env_all: raw.env_all,
        volume_mounts,
        container_work_dir: raw.container_work_dir.clone(),
        allow_full_fs: raw.allow_full_filesystem_access,
        tty: raw.tty,
        enable_host_access: raw.enable_host_access,
        allow_host_ports,
        enable_api_proxy: raw.enable_api_proxy,
        openai_key: raw.openai_api_key.clone(),
        anthropic_key: raw.anthropic_api_key.clone(),
        proxy_logs_dir: raw.proxy_logs_dir.clone(),
    })
}

fn parse_domain_list(texts: &[String]) -> Result<Vec<DomainSpec>> {
    texts
        .iter()
        .map(|t| awf_domain::parse(t).map_err(|e| CliError::ConfigInvalid(e.to_string())))
        .collect()
}

fn parse_dns(csv: &[String]) -> Result<Vec<IpAddr>> {
    csv.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|_| CliError::ConfigInvalid(format!("invalid DNS server address: {s}")))
        })
        .collect()
}

fn parse_env_assignments(entries: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for entry in entries {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            CliError::ConfigInvalid(format!(
                "invalid -e assignment, expected KEY=VALUE: {entry}"
            ))
        })?;
        if key.is_empty() {
            return Err(CliError::ConfigInvalid(format!(
                "invalid -e assignment, empty key: {entry}"
            )));
        }
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

/// POSIX single-quote escaping for the trailing `-- <cmd> [args...]`
/// (spec.md §6): wrap every argument in single quotes, turning an
/// embedded `'` into `'\''`, then space-join.
pub fn quote_and_join(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("'{}'", a.replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(format!("/tmp/awf-run-{}", std::process::id()))
}
