//! Container Spec Builder (C5): assembles the two-or-three-service
//! compose document (spec.md §4.5).

use crate::document::{
    BuildSpec, ComposeFile, DependsOnEntry, Healthcheck, NetworkRef, Service, ServiceNetwork,
};
use crate::env::{build_agent_environment, insert_runtime_control_vars};
use crate::error::{ComposeError, Result};
use crate::uid::resolve_uid_gid;
use crate::volumes::{build_agent_volumes, workspace_mirror_volume};
use awf_types::config::{AgentImageSpec, AgentPreset};
use awf_types::workspace::{WorkspaceLayout, SHARED_MCP_LOGS_DIR};
use awf_types::{Config, NetworkConfig};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PROXY_SERVICE: &str = "proxy";
pub const AGENT_SERVICE: &str = "agent";
pub const API_PROXY_SERVICE: &str = "api-proxy";

/// Container names, distinct from the compose service names above;
/// `awf-runtime` force-removes stale containers with these names before
/// every compose-up (spec.md §4.6 "Startup ordering").
pub const PROXY_CONTAINER: &str = "awf-proxy";
pub const AGENT_CONTAINER: &str = "awf-agent";
pub const API_PROXY_CONTAINER: &str = "awf-api-proxy";

const PROXY_IMAGE_NAME: &str = "proxy";
const AGENT_IMAGE_NAME: &str = "agent";
const AGENT_ACT_IMAGE_NAME: &str = "agent-act";
const ACT_BASE_IMAGE: &str = "ghcr.io/catthehacker/ubuntu:act-24.04";

pub struct BuildInputs<'a> {
    pub config: &'a Config,
    pub workspace: &'a WorkspaceLayout,
    pub net: &'a NetworkConfig,
    pub host_env: &'a HashMap<String, String>,
    pub home_dir: &'a Path,
    pub workspace_dir: &'a Path,
    pub process_uid: u32,
    pub process_gid: u32,
    pub sudo_uid: Option<u32>,
    pub sudo_gid: Option<u32>,
}

pub fn build(inputs: &BuildInputs) -> Result<ComposeFile> {
    let config = inputs.config;

    let mut services = BTreeMap::new();
    services.insert(PROXY_SERVICE.to_string(), proxy_service(inputs));
    services.insert(AGENT_SERVICE.to_string(), agent_service(inputs)?);
    debug!(services = 2, "assembled proxy and agent services");

    let api_proxy_active =
        config.enable_api_proxy && (config.openai_key.is_some() || config.anthropic_key.is_some());
    if config.enable_api_proxy && !api_proxy_active {
        return Err(ComposeError::ApiProxyMissingKeys);
    }
    if api_proxy_active {
        services.insert(API_PROXY_SERVICE.to_string(), api_proxy_service(inputs));
        debug!("api-proxy service assembled, agent depends_on updated");
    }

    let mut networks = BTreeMap::new();
    networks.insert(inputs.net.network.to_string(), NetworkRef { external: true });

    Ok(ComposeFile { services, networks })
}

fn proxy_service(inputs: &BuildInputs) -> Service {
    let config = inputs.config;
    let net = inputs.net;

    let mut networks = BTreeMap::new();
    networks.insert(
        net.network.to_string(),
        ServiceNetwork { ipv4_address: net.squid_ip.to_string() },
    );

    let (image, build) = if config.build_local {
        (None, Some(BuildSpec { context: "./proxy".to_string(), args: None }))
    } else {
        (
            Some(format!("{}/{}:{}", config.image_registry, PROXY_IMAGE_NAME, config.image_tag)),
            None,
        )
    };

    Service {
        image,
        build,
        container_name: Some(PROXY_CONTAINER.to_string()),
        networks,
        volumes: vec![
            format!("{}:/etc/squid/squid.conf:ro", inputs.workspace.proxy_conf().display()),
            format!(
                "{}:/var/log/squid:rw",
                config
                    .proxy_logs_dir
                    .clone()
                    .unwrap_or_else(|| inputs.workspace.proxy_logs_dir())
                    .display()
            ),
        ],
        healthcheck: Some(Healthcheck::tcp_probe(awf_types::network::SQUID_PORT)),
        ..Default::default()
    }
}

fn agent_service(inputs: &BuildInputs) -> Result<Service> {
    let config = inputs.config;
    let net = inputs.net;
    let workspace = inputs.workspace;

    let mut networks = BTreeMap::new();
    networks.insert(
        net.network.to_string(),
        ServiceNetwork { ipv4_address: net.agent_ip.to_string() },
    );

    let (uid, gid) = resolve_uid_gid(
        inputs.process_uid,
        inputs.process_gid,
        inputs.sudo_uid,
        inputs.sudo_gid,
    );
    let (image, build) = agent_image_spec(inputs, uid, gid);

    let mut depends_on = BTreeMap::new();
    depends_on.insert(PROXY_SERVICE.to_string(), DependsOnEntry::healthy());
    let api_proxy_active =
        config.enable_api_proxy && (config.openai_key.is_some() || config.anthropic_key.is_some());
    if api_proxy_active {
        depends_on.insert(API_PROXY_SERVICE.to_string(), DependsOnEntry::healthy());
    }

    let mut environment = build_agent_environment(config, net.squid_ip, inputs.host_env);
    insert_runtime_control_vars(&mut environment, config, inputs.host_env);

    let mut volumes = build_agent_volumes(config, workspace, inputs.home_dir);
    volumes.push(workspace_mirror_volume(inputs.workspace_dir));

    let escaped_cmd = config.agent_cmd.replace('$', "$$");

    Ok(Service {
        image,
        build,
        container_name: Some(AGENT_CONTAINER.to_string()),
        networks,
        volumes,
        environment,
        cap_add: vec!["NET_ADMIN".into(), "SYS_CHROOT".into(), "SYS_ADMIN".into()],
        cap_drop: vec![
            "NET_RAW".into(),
            "SYS_PTRACE".into(),
            "SYS_MODULE".into(),
            "SYS_RAWIO".into(),
            "MKNOD".into(),
        ],
        security_opt: vec![
            "no-new-privileges:true".into(),
            format!("seccomp={}", workspace.seccomp_json().display()),
            "apparmor:unconfined".into(),
        ],
        mem_limit: Some("4g".to_string()),
        pids_limit: Some(1000),
        cpu_shares: Some(1024),
        depends_on,
        tmpfs: tmpfs_secrets_barrier(&config.work_dir),
        command: Some(vec!["/bin/bash".to_string(), "-c".to_string(), escaped_cmd]),
        dns: config.dns_servers.iter().map(|ip| ip.to_string()).collect(),
        dns_search: Some(vec![]),
        tty: if config.tty { Some(true) } else { None },
        stdin_open: if config.tty { Some(true) } else { None },
        working_dir: config
            .container_work_dir
            .as_ref()
            .map(|p| format!("/host{}", p.display())),
        ..Default::default()
    })
}

fn agent_image_spec(
    inputs: &BuildInputs,
    uid: u32,
    gid: u32,
) -> (Option<String>, Option<BuildSpec>) {
    let config = inputs.config;
    match &config.agent_image {
        AgentImageSpec::Ref(reference) => (Some(reference.clone()), None),
        AgentImageSpec::Preset(AgentPreset::Default) => {
            if config.build_local {
                (None, Some(local_build(uid, gid, None)))
            } else {
                (
                    Some(format!(
                        "{}/{}:{}",
                        config.image_registry, AGENT_IMAGE_NAME, config.image_tag
                    )),
                    None,
                )
            }
        }
        AgentImageSpec::Preset(AgentPreset::Act) => {
            if config.build_local {
                (None, Some(local_build(uid, gid, Some(ACT_BASE_IMAGE))))
            } else {
                (
                    Some(format!(
                        "{}/{}:{}",
                        config.image_registry, AGENT_ACT_IMAGE_NAME, config.image_tag
                    )),
                    None,
                )
            }
        }
    }
}

/// `USER_UID`/`USER_GID` are always passed so the agent image's
/// entrypoint can drop from root to the resolved identity before
/// touching anything under `/host`; `BASE_IMAGE` is only set for the
/// `act` preset, which stacks on the runner image instead of plain
/// Ubuntu.
fn local_build(uid: u32, gid: u32, base_image: Option<&str>) -> BuildSpec {
    let mut args = BTreeMap::new();
    args.insert("USER_UID".to_string(), uid.to_string());
    args.insert("USER_GID".to_string(), gid.to_string());
    if let Some(base_image) = base_image {
        args.insert("BASE_IMAGE".to_string(), base_image.to_string());
    }
    BuildSpec { context: "./agent".to_string(), args: Some(args) }
}

/// Four 1 MiB `noexec,nosuid` tmpfs mounts hiding `workDir` and the
/// shared MCP logs directory at both their host path and the
/// `/host`-prefixed path, so the compose file (which lives in `workDir`)
/// is never readable from inside the agent it configures.
fn tmpfs_secrets_barrier(work_dir: &Path) -> Vec<String> {
    let work_dir = work_dir.display().to_string();
    vec![
        format!("{work_dir}:size=1m,noexec,nosuid"),
        format!("/host{work_dir}:size=1m,noexec,nosuid"),
        format!("{SHARED_MCP_LOGS_DIR}:size=1m,noexec,nosuid"),
        format!("/host{SHARED_MCP_LOGS_DIR}:size=1m,noexec,nosuid"),
    ]
}

fn api_proxy_service(inputs: &BuildInputs) -> Service {
    let config = inputs.config;
    let net = inputs.net;

    let mut networks = BTreeMap::new();
    networks.insert(
        net.network.to_string(),
        ServiceNetwork { ipv4_address: net.api_proxy_ip.to_string() },
    );

    let mut environment = BTreeMap::new();
    if let Some(key) = &config.openai_key {
        environment.insert("OPENAI_API_KEY".to_string(), key.clone());
    }
    if let Some(key) = &config.anthropic_key {
        environment.insert("ANTHROPIC_API_KEY".to_string(), key.clone());
    }
    environment.insert(
        "HTTPS_PROXY".to_string(),
        format!("http://{}:{}", net.squid_ip, awf_types::network::SQUID_PORT),
    );

    Service {
        build: Some(BuildSpec { context: "./api-proxy".to_string(), args: None }),
        container_name: Some(API_PROXY_CONTAINER.to_string()),
        networks,
        environment,
        cap_drop: vec!["ALL".to_string()],
        mem_limit: Some("512m".to_string()),
        pids_limit: Some(100),
        cpu_shares: Some(512),
        healthcheck: Some(Healthcheck::tcp_probe(10000)),
        ..Default::default()
    }
}

/// `workDir`, needed alongside the compose document to know where
/// `proxy.conf`, the two log directories, and the chroot hosts file
/// live. Exposed for callers that only have a `Config` in hand.
pub fn workspace_layout_for(config: &Config, chroot_suffix: String) -> WorkspaceLayout {
    WorkspaceLayout::new(PathBuf::from(&config.work_dir), chroot_suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use awf_types::config::*;
    use tempfile::tempdir;

    fn base_config(work_dir: PathBuf) -> Config {
        Config {
            allow_domains: vec![],
            block_domains: vec![],
            url_patterns: vec![],
            dns_servers: vec!["8.8.8.8".parse().unwrap()],
            log_level: LogLevel::Info,
            keep_containers: false,
            work_dir,
            image_registry: "ghcr.io/example".into(),
            image_tag: "latest".into(),
            build_local: false,
            agent_image: AgentImageSpec::Preset(AgentPreset::Default),
            agent_cmd: "echo $HOME".into(),
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
        }
    }

    fn inputs<'a>(
        config: &'a Config,
        workspace: &'a WorkspaceLayout,
        net: &'a NetworkConfig,
        host_env: &'a HashMap<String, String>,
        home: &'a Path,
        workdir: &'a Path,
    ) -> BuildInputs<'a> {
        BuildInputs {
            config,
            workspace,
            net,
            host_env,
            home_dir: home,
            workspace_dir: workdir,
            process_uid: 1001,
            process_gid: 1001,
            sudo_uid: None,
            sudo_gid: None,
        }
    }

    #[test]
    fn proxy_and_agent_get_fixed_addresses() {
        let base = tempdir().unwrap();
        let work_dir = base.path().join("run");
        let config = base_config(work_dir.clone());
        let workspace = WorkspaceLayout::new(work_dir, "ab".into());
        workspace.create().unwrap();
        let net = NetworkConfig::current();
        let host_env = HashMap::new();
        let i = inputs(&config, &workspace, &net, &host_env, Path::new("/root"), Path::new("/work"));

        let doc = build(&i).unwrap();
        let proxy = &doc.services[PROXY_SERVICE];
        let agent = &doc.services[AGENT_SERVICE];
        assert_eq!(
            proxy.networks[net.network].ipv4_address,
            net.squid_ip
        );
        assert_eq!(
            agent.networks[net.network].ipv4_address,
            net.agent_ip
        );
    }

    #[test]
    fn agent_depends_on_proxy_health() {
        let base = tempdir().unwrap();
        let work_dir = base.path().join("run");
        let config = base_config(work_dir.clone());
        let workspace = WorkspaceLayout::new(work_dir, "ab".into());
        workspace.create().unwrap();
        let net = NetworkConfig::current();
        let host_env = HashMap::new();
        let i = inputs(&config, &workspace, &net, &host_env, Path::new("/root"), Path::new("/work"));
        let doc = build(&i).unwrap();
        let agent = &doc.services[AGENT_SERVICE];
        assert_eq!(agent.depends_on[PROXY_SERVICE].condition, "service_healthy");
    }

    #[test]
    fn agent_command_doubles_dollar_signs() {
        let base = tempdir().unwrap();
        let work_dir = base.path().join("run");
        let config = base_config(work_dir.clone());
        let workspace = WorkspaceLayout::new(work_dir, "ab".into());
        workspace.create().unwrap();
        let net = NetworkConfig::current();
        let host_env = HashMap::new();
        let i = inputs(&config, &workspace, &net, &host_env, Path::new("/root"), Path::new("/work"));
        let doc = build(&i).unwrap();
        let agent = &doc.services[AGENT_SERVICE];
        assert_eq!(
            agent.command.as_ref().unwrap()[2],
            "echo $$HOME"
        );
    }

    #[test]
    fn api_proxy_requested_without_keys_is_an_error() {
        let base = tempdir().unwrap();
        let work_dir = base.path().join("run");
        let mut config = base_config(work_dir.clone());
        config.enable_api_proxy = true;
        let workspace = WorkspaceLayout::new(work_dir, "ab".into());
        workspace.create().unwrap();
        let net = NetworkConfig::current();
        let host_env = HashMap::new();
        let i = inputs(&config, &workspace, &net, &host_env, Path::new("/root"), Path::new("/work"));
        assert!(matches!(build(&i), Err(ComposeError::ApiProxyMissingKeys)));
    }

    #[test]
    fn api_proxy_present_with_key_gets_fixed_address_and_agent_depends_on_it() {
        let base = tempdir().unwrap();
        let work_dir = base.path().join("run");
        let mut config = base_config(work_dir.clone());
        config.enable_api_proxy = true;
        config.openai_key = Some("sk-test".into());
        let workspace = WorkspaceLayout::new(work_dir, "ab".into());
        workspace.create().unwrap();
        let net = NetworkConfig::current();
        let host_env = HashMap::new();
        let i = inputs(&config, &workspace, &net, &host_env, Path::new("/root"), Path::new("/work"));
        let doc = build(&i).unwrap();
        let api_proxy = &doc.services[API_PROXY_SERVICE];
        assert_eq!(api_proxy.networks[net.network].ipv4_address, net.api_proxy_ip);
        let agent = &doc.services[AGENT_SERVICE];
        assert!(agent.depends_on.contains_key(API_PROXY_SERVICE));
        assert_eq!(agent.environment["OPENAI_BASE_URL"], "http://api-proxy:10000");
    }

    #[test]
    fn tmpfs_hides_workdir_at_host_and_host_prefixed_path() {
        let base = tempdir().unwrap();
        let work_dir = base.path().join("run");
        let config = base_config(work_dir.clone());
        let workspace = WorkspaceLayout::new(work_dir.clone(), "ab".into());
        workspace.create().unwrap();
        let net = NetworkConfig::current();
        let host_env = HashMap::new();
        let i = inputs(&config, &workspace, &net, &host_env, Path::new("/root"), Path::new("/work"));
        let doc = build(&i).unwrap();
        let agent = &doc.services[AGENT_SERVICE];
        let wd = work_dir.display().to_string();
        assert!(agent.tmpfs.iter().any(|t| t.starts_with(&wd)));
        assert!(agent.tmpfs.iter().any(|t| t.starts_with(&format!("/host{wd}"))));
    }
}
