//! Agent-container volume policy (spec.md §4.5 "Volume policy").
//!
//! Three modes, mutually exclusive: a curated default (read-only system
//! paths plus a handful of writable caches, all mirrored under `/host`),
//! a single `allowFullFS` bind of `/`, or the operator's explicit
//! `volumeMounts` used verbatim. All three still get the "essentials" —
//! `/tmp`, the two log directories, and the pre-resolved hosts file.

use awf_types::workspace::WorkspaceLayout;
use awf_types::{Config, HostMount, MountMode};
use std::path::{Path, PathBuf};

/// Read-only system paths mirrored under `/host` by default.
const CURATED_READONLY_PATHS: &[&str] = &[
    "/usr", "/bin", "/sbin", "/lib", "/lib64", "/opt", "/sys", "/dev",
];

/// `/etc` subtrees and NSS files needed for name resolution and TLS
/// trust inside the chroot, without handing over the whole of `/etc`.
const CURATED_ETC_PATHS: &[&str] = &[
    "/etc/ssl",
    "/etc/ca-certificates",
    "/etc/nsswitch.conf",
    "/etc/passwd",
    "/etc/group",
    "/etc/resolv.conf",
];

/// Toolchain/agent caches mirrored read-write under `/host<home>` when
/// present on the host.
const CURATED_CACHE_DIRS: &[&str] = &[
    ".cargo",
    ".rustup",
    ".npm",
    ".claude",
    ".anthropic",
    ".copilot",
];

/// Credential files masked with `/dev/null` in the default (non-full-fs)
/// mode, so a curious agent walking `/host` cannot read live credentials.
const CREDENTIAL_MASK_TARGETS: &[&str] = &[
    "/root/.docker/config.json",
    "/root/.aws/credentials",
    "/root/.config/gcloud/credentials.db",
];

const ENGINE_SOCKET: &str = "/var/run/docker.sock";

fn host_to_host_mirror(path: &str) -> String {
    format!("{path}:/host{path}:ro")
}

pub fn build_agent_volumes(
    config: &Config,
    workspace: &WorkspaceLayout,
    home_dir: &Path,
) -> Vec<String> {
    let mut volumes = essentials(config, workspace);

    if !config.volume_mounts.is_empty() {
        volumes.extend(config.volume_mounts.iter().map(format_host_mount));
        return volumes;
    }

    if config.allow_full_fs {
        volumes.push("/:/host:rw".to_string());
        volumes.push(format!("{ENGINE_SOCKET}:/host{ENGINE_SOCKET}:rw"));
        return volumes;
    }

    for path in CURATED_READONLY_PATHS {
        if Path::new(path).exists() {
            volumes.push(host_to_host_mirror(path));
        }
    }
    for path in CURATED_ETC_PATHS {
        if Path::new(path).exists() {
            volumes.push(host_to_host_mirror(path));
        }
    }
    for cache in CURATED_CACHE_DIRS {
        let host_path = home_dir.join(cache);
        if host_path.exists() {
            volumes.push(format!(
                "{}:/host{}:rw",
                host_path.display(),
                host_path.display()
            ));
        }
    }
    for target in CREDENTIAL_MASK_TARGETS {
        volumes.push(format!("/dev/null:/host{target}:ro"));
    }
    volumes.push(format!("/dev/null:/host{ENGINE_SOCKET}:ro"));

    volumes
}

/// Mounts present regardless of which volume mode is active: `/tmp`
/// (read-write), the two log directories (read-write), and the
/// pre-resolved hosts file laid over `/etc/hosts` (read-only).
fn essentials(config: &Config, workspace: &WorkspaceLayout) -> Vec<String> {
    vec![
        "/tmp:/host/tmp:rw".to_string(),
        format!("{}:/var/log/agent:rw", workspace.agent_logs_dir().display()),
        format!(
            "{}:/var/log/squid:rw",
            config
                .proxy_logs_dir
                .clone()
                .unwrap_or_else(|| workspace.proxy_logs_dir())
                .display()
        ),
        format!(
            "{}:/host/etc/hosts:ro",
            workspace.chroot_hosts_file().display()
        ),
    ]
}

fn format_host_mount(mount: &HostMount) -> String {
    let suffix = match mount.mode {
        MountMode::ReadOnly => ":ro",
        MountMode::ReadWrite => ":rw",
    };
    format!("{}:{}{}", mount.host.display(), mount.container.display(), suffix)
}

/// Volumes for the workspace directory itself, mirrored at the same path
/// under `/host` so the agent can naturally edit the caller's files.
pub fn workspace_mirror_volume(workspace_dir: &Path) -> String {
    format!(
        "{}:/host{}:rw",
        workspace_dir.display(),
        workspace_dir.display()
    )
}
