//! Agent-container environment assembly (spec.md §4.5's `environment` row).
//!
//! `HTTP(S)_PROXY`, `HOME`, and a sanitized `PATH` are always present.
//! Beyond that the operator picks one of two passthrough modes: a small
//! selective list (tokens an agent typically needs, plus a few terminal
//! UI variables) or, under `--env-all`, the whole host environment minus
//! a fixed exclusion set that would otherwise leak orchestrator-only
//! state into the sandbox. `additionalEnv` (`-e KEY=VALUE`) always wins.

use awf_types::Config;
use std::collections::{BTreeMap, HashMap};

/// Host variables forwarded verbatim when `--env-all` is not set.
pub const SELECTIVE_PASSTHROUGH: &[&str] = &[
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "TERM",
    "COLORTERM",
    "LANG",
    "LC_ALL",
];

/// Excluded even under `--env-all`: orchestrator/engine state that must
/// never leak into the sandboxed agent.
pub const ENV_ALL_EXCLUSIONS: &[&str] = &[
    "PATH",
    "DOCKER_HOST",
    "DOCKER_CONTEXT",
    "DOCKER_CONFIG",
    "PWD",
    "OLDPWD",
    "SHLVL",
    "_",
];

const SANITIZED_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

pub fn build_agent_environment(
    config: &Config,
    squid_ip: &str,
    host_env: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    let proxy_url = format!("http://{squid_ip}:3128");
    env.insert("HTTP_PROXY".to_string(), proxy_url.clone());
    env.insert("HTTPS_PROXY".to_string(), proxy_url);
    env.insert(
        "HOME".to_string(),
        host_env.get("HOME").cloned().unwrap_or_else(|| "/root".to_string()),
    );
    env.insert("PATH".to_string(), SANITIZED_PATH.to_string());

    if config.env_all {
        for (key, value) in host_env {
            if is_env_all_excluded(key) {
                continue;
            }
            env.insert(key.clone(), value.clone());
        }
    } else {
        for key in SELECTIVE_PASSTHROUGH {
            if let Some(value) = host_env.get(*key) {
                env.insert((*key).to_string(), value.clone());
            }
        }
    }

    if config.enable_api_proxy && (config.openai_key.is_some() || config.anthropic_key.is_some()) {
        if config.openai_key.is_some() {
            env.insert(
                "OPENAI_BASE_URL".to_string(),
                "http://api-proxy:10000".to_string(),
            );
        }
        if config.anthropic_key.is_some() {
            env.insert(
                "ANTHROPIC_BASE_URL".to_string(),
                "http://api-proxy:10001".to_string(),
            );
        }
    }

    for (key, value) in &config.additional_env {
        env.insert(key.clone(), value.clone());
    }

    env
}

fn is_env_all_excluded(key: &str) -> bool {
    ENV_ALL_EXCLUSIONS.contains(&key) || key.starts_with("SUDO_")
}

/// Host variables the agent's own entrypoint (out of scope here; it sets
/// up the in-container NAT-to-proxy redirect) needs to configure itself,
/// forwarded when present on the host (spec.md §6).
const TOOLCHAIN_ROOT_VARS: &[&str] = &[
    "AWF_GOROOT",
    "AWF_CARGO_HOME",
    "AWF_JAVA_HOME",
    "AWF_DOTNET_ROOT",
    "AWF_BUN_INSTALL",
];

/// Adds the `AWF_*`/`DOCKER_*` runtime-control variables spec.md §6 names
/// on top of whatever [`build_agent_environment`] already produced.
pub fn insert_runtime_control_vars(
    env: &mut BTreeMap<String, String>,
    config: &Config,
    host_env: &HashMap<String, String>,
) {
    env.insert(
        "DOCKER_HOST".to_string(),
        host_env
            .get("DOCKER_HOST")
            .cloned()
            .unwrap_or_else(|| "unix:///var/run/docker.sock".to_string()),
    );
    env.insert("DOCKER_CONTEXT".to_string(), "default".to_string());
    env.insert("AWF_CHROOT_ENABLED".to_string(), "true".to_string());

    if !config.dns_servers.is_empty() {
        let csv = config
            .dns_servers
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join(",");
        env.insert("AWF_DNS_SERVERS".to_string(), csv);
    }

    env.insert(
        "AWF_WORKDIR".to_string(),
        config.work_dir.display().to_string(),
    );

    if config.enable_host_access {
        env.insert("AWF_ENABLE_HOST_ACCESS".to_string(), "1".to_string());
    }

    if !config.allow_host_ports.is_empty() {
        let csv = config
            .allow_host_ports
            .iter()
            .map(|p| match p {
                awf_types::PortSpec::Single(port) => port.to_string(),
                awf_types::PortSpec::Range(start, end) => format!("{start}-{end}"),
            })
            .collect::<Vec<_>>()
            .join(",");
        env.insert("AWF_ALLOW_HOST_PORTS".to_string(), csv);
    }

    for key in TOOLCHAIN_ROOT_VARS {
        if let Some(value) = host_env.get(*key) {
            env.insert((*key).to_string(), value.clone());
        }
    }

    // `additionalEnv` overrides everything, including these.
    for (key, value) in &config.additional_env {
        env.insert(key.clone(), value.clone());
    }
}
