//! Lifecycle Orchestrator (C6): the state machine spec.md §4.6 describes,
//! wired up from every other component.
//!
//! ```text
//!  INIT  ─ write artifacts, install host filter, compose-up ─▶  RUNNING
//!  RUNNING ── stream agent logs ∥ await container exit ──────▶  STOPPING
//!  STOPPING ─ classify denials, compose-down, drop chain, persist ─▶ DONE
//!  any state + SIGINT/SIGTERM ──────────────────────────────▶  STOPPING
//! ```

use crate::engine::Engine;
use crate::error::{OrchestratorError, Result};
use crate::persist::{self, PersistedPaths};
use crate::remediation;
use crate::seccomp;
use awf_compose::{build, build_hosts_file, BuildInputs, SystemResolver};
use awf_domain::ruleset::derive;
use awf_domain::ProxyRuleset;
use awf_monitor::read_and_classify;
use awf_network::{FirewallInstaller, NetworkProvisioner};
use awf_proxy::{synthesize, SynthesizerOptions};
use awf_types::workspace::write_with_mode;
use awf_types::{redact, Config, NetworkConfig, WorkspaceLayout};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

pub struct RunInputs<'a> {
    pub config: &'a Config,
    pub home_dir: &'a Path,
    pub workspace_dir: &'a Path,
    pub host_env: &'a HashMap<String, String>,
    pub process_uid: u32,
    pub process_gid: u32,
    pub sudo_uid: Option<u32>,
    pub sudo_gid: Option<u32>,
    pub engine_bin: String,
}

pub struct RunOutcome {
    pub exit_code: i32,
    pub persisted: Option<PersistedPaths>,
    pub work_dir: PathBuf,
}

/// Drive one invocation end to end: INIT through DONE. Eager
/// `ConfigInvalid` validation is the CLI's job (spec.md §4.11); by the
/// time `run` is called, `config` is assumed valid.
pub async fn run(inputs: RunInputs<'_>) -> Result<RunOutcome> {
    let config = inputs.config;
    let net = NetworkConfig::current();
    let ruleset = derive(&config.allow_domains, &config.block_domains);

    let chroot_suffix = random_token(6);
    let workspace = awf_compose::builder::workspace_layout_for(config, chroot_suffix);
    workspace.create()?;

    let proxy_conf = synthesize(
        &ruleset,
        &SynthesizerOptions {
            dns_servers: config.dns_servers.clone(),
            allow_host_ports: config.allow_host_ports.clone(),
            url_patterns: config.url_patterns.clone(),
            enable_ssl_bump: false,
            ca_cert_path: None,
        },
    );
    write_with_mode(&workspace.proxy_conf(), &proxy_conf, 0o600)?;
    seccomp::write_default_profile(&workspace.seccomp_json())?;

    let hosts_text = build_hosts_file(&ruleset, &SystemResolver);
    write_with_mode(&workspace.chroot_hosts_file(), &hosts_text, 0o600)?;

    let provisioner = NetworkProvisioner::new(inputs.engine_bin.clone());
    provisioner.ensure(&net).await?;

    let firewall = FirewallInstaller::new(
        net.squid_ip.parse().expect("fixed addressing constant is a valid IP"),
        net.bridge,
        config.dns_servers.clone(),
    );
    firewall.install().await?;

    let build_inputs = BuildInputs {
        config,
        workspace: &workspace,
        net: &net,
        host_env: inputs.host_env,
        home_dir: inputs.home_dir,
        workspace_dir: inputs.workspace_dir,
        process_uid: inputs.process_uid,
        process_gid: inputs.process_gid,
        sudo_uid: inputs.sudo_uid,
        sudo_gid: inputs.sudo_gid,
    };
    let compose_doc = build(&build_inputs)?;
    let compose_yaml = compose_doc.to_yaml()?;
    write_with_mode(&workspace.compose_yaml(), &compose_yaml, 0o600)?;

    let engine = Engine::new(inputs.engine_bin.clone());
    engine.force_remove(awf_compose::PROXY_CONTAINER).await;
    engine.force_remove(awf_compose::AGENT_CONTAINER).await;
    engine.force_remove(awf_compose::API_PROXY_CONTAINER).await;

    if let Err(e) = engine.compose_up(&workspace.compose_yaml()).await {
        warn!(error = %redact(&e.to_string()), "compose up failed");
        let hint = proxy_unhealthy_hint(&workspace, &ruleset, config).await;
        let _ = run_cleanup(&engine, &firewall, &workspace, config).await;
        return Err(OrchestratorError::ProxyUnhealthy {
            detail: hint.unwrap_or_else(|| redact(&e.to_string())),
        });
    }
    info!(work_dir = %workspace.work_dir.display(), "containers started, entering RUNNING");

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let logs_fut = engine.stream_logs(awf_compose::AGENT_CONTAINER);
    let wait_fut = engine.wait_exit_code(awf_compose::AGENT_CONTAINER);
    let joined = async { tokio::join!(logs_fut, wait_fut) };
    tokio::pin!(joined);

    enum Transition {
        Exited(Result<i32>),
        Signal(i32),
    }

    let transition = tokio::select! {
        (logs_res, wait_res) = &mut joined => {
            if let Err(e) = logs_res {
                warn!(error = %redact(&e.to_string()), "log pump ended with an error");
            }
            Transition::Exited(wait_res)
        }
        _ = sigint.recv() => Transition::Signal(130),
        _ = sigterm.recv() => Transition::Signal(143),
    };

    match transition {
        Transition::Signal(code) => {
            warn!(exit_code = code, "received shutdown signal, tearing down");
            let persisted = run_cleanup(&engine, &firewall, &workspace, config).await?;
            Ok(RunOutcome { exit_code: code, persisted, work_dir: workspace.work_dir.clone() })
        }
        Transition::Exited(Ok(exit_code)) => {
            if exit_code != 0 {
                report_denials(&workspace, &ruleset, config).await;
            }
            let persisted = run_cleanup(&engine, &firewall, &workspace, config).await?;
            Ok(RunOutcome { exit_code, persisted, work_dir: workspace.work_dir.clone() })
        }
        Transition::Exited(Err(e)) => {
            let _ = run_cleanup(&engine, &firewall, &workspace, config).await;
            Err(e)
        }
    }
}

/// `performCleanup`: idempotent and exception-safe. Stops containers
/// (unless `keepContainers`), always removes the host-filter chain, and
/// — again unless `keepContainers` — persists the two log directories
/// and deletes `workDir` (testable property 6).
async fn run_cleanup(
    engine: &Engine,
    firewall: &FirewallInstaller,
    workspace: &WorkspaceLayout,
    config: &Config,
) -> Result<Option<PersistedPaths>> {
    if !config.keep_containers {
        let output = engine.compose_down(&workspace.compose_yaml()).await;
        if !output.status.success() {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "compose down failed (best-effort, ignored)"
            );
        }
    }

    firewall.cleanup().await?;

    if config.keep_containers {
        info!(work_dir = %workspace.work_dir.display(), "keep-containers set, leaving workDir in place");
        return Ok(None);
    }

    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let persisted = persist::persist(workspace, &proxy_logs_dir(workspace, config), &timestamp)?;
    workspace.remove()?;
    Ok(Some(persisted))
}

fn proxy_logs_dir(workspace: &WorkspaceLayout, config: &Config) -> PathBuf {
    config
        .proxy_logs_dir
        .clone()
        .unwrap_or_else(|| workspace.proxy_logs_dir())
}

fn proxy_access_log(workspace: &WorkspaceLayout, config: &Config) -> PathBuf {
    proxy_logs_dir(workspace, config).join("access.log")
}

async fn report_denials(workspace: &WorkspaceLayout, ruleset: &ProxyRuleset, config: &Config) {
    let records = match read_and_classify(&proxy_access_log(workspace, config)).await {
        Ok(records) => records,
        Err(e) => {
            debug!(error = %e, "no access log to classify denials from");
            return;
        }
    };
    if records.is_empty() {
        return;
    }
    let allow_csv = allow_domains_csv(config);
    for record in &records {
        let remediation = remediation::classify(record, ruleset, &allow_csv);
        warn!("{}", redact(&remediation.message(&config.allow_host_ports)));
    }
}

/// Enrich a `compose up` dependency-health failure with the likely
/// cause read back out of the proxy's (already-written) access log
/// (spec.md §4.6 "Startup ordering").
async fn proxy_unhealthy_hint(
    workspace: &WorkspaceLayout,
    ruleset: &ProxyRuleset,
    config: &Config,
) -> Option<String> {
    let records = read_and_classify(&proxy_access_log(workspace, config)).await.ok()?;
    if records.is_empty() {
        return None;
    }
    let allow_csv = allow_domains_csv(config);
    let lines: Vec<String> = records
        .iter()
        .map(|r| remediation::classify(r, ruleset, &allow_csv).message(&config.allow_host_ports))
        .collect();
    Some(format!(
        "proxy access log shows denials that are the likely cause: {}",
        redact(&lines.join("; "))
    ))
}

fn allow_domains_csv(config: &Config) -> String {
    config.allow_domains.iter().map(|d| d.text().to_string()).collect::<Vec<_>>().join(",")
}

fn random_token(len: usize) -> String {
    use rand::Rng;
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len).map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_token_has_requested_length_and_charset() {
        let token = random_token(6);
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn allow_domains_csv_joins_parsed_text() {
        let config = Config {
            allow_domains: vec![
                awf_domain::parse("github.com").unwrap(),
                awf_domain::parse("example.com").unwrap(),
            ],
            block_domains: vec![],
            url_patterns: vec![],
            dns_servers: vec![],
            log_level: awf_types::config::LogLevel::Info,
            keep_containers: false,
            work_dir: PathBuf::from("/tmp/awf-test"),
            image_registry: "ghcr.io/example".into(),
            image_tag: "latest".into(),
            build_local: false,
            agent_image: awf_types::config::AgentImageSpec::Preset(
                awf_types::config::AgentPreset::Default,
            ),
            agent_cmd: "true".into(),
            additional_env: Default::default(),
            env_all: false,
            volume_mounts: vec![],
            container_work_dir: None,
            allow_full_fs: false,
            tty: false,
            enable_host_access: false,
            allow_host_ports: vec![],
            enable_api_proxy: false,
            openai_key: None,
            anthropic_key: None,
            proxy_logs_dir: None,
        };
        assert_eq!(allow_domains_csv(&config), "github.com,example.com");
    }
}
