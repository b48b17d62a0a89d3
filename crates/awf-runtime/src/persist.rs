//! Artifact Persister (C8, spec.md §4.8): moves `agent-logs/` and
//! `proxy-logs/` out of `workDir` to stable `/tmp` paths tagged with the
//! invocation timestamp, then chmods them world-readable so a
//! downstream CI harvester running under a different uid can read them
//! — the proxy's log directory in particular is owned by Squid's
//! in-container system uid.

use crate::error::Result;
use awf_types::workspace::WorkspaceLayout;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct PersistedPaths {
    pub agent_logs: PathBuf,
    pub proxy_logs: PathBuf,
}

/// `timestamp` should be a sortable, filesystem-safe token (the CLI
/// stamps one per invocation); reused here so log-dir names in a batch
/// of runs line up with whatever other artifacts the operator keeps.
///
/// `proxy_logs_source` is `workspace.proxy_logs_dir()` unless the
/// operator redirected it with `--proxy-logs-dir`.
pub fn persist(
    workspace: &WorkspaceLayout,
    proxy_logs_source: &Path,
    timestamp: &str,
) -> Result<PersistedPaths> {
    let agent_logs = PathBuf::from(format!("/tmp/awf-agent-logs-{timestamp}"));
    let proxy_logs = PathBuf::from(format!("/tmp/awf-proxy-logs-{timestamp}"));

    move_dir(&workspace.agent_logs_dir(), &agent_logs)?;
    move_dir(proxy_logs_source, &proxy_logs)?;

    chmod_recursive(&agent_logs, 0o755)?;
    chmod_recursive(&proxy_logs, 0o777)?;

    Ok(PersistedPaths { agent_logs, proxy_logs })
}

fn move_dir(src: &Path, dest: &Path) -> Result<()> {
    if !src.exists() {
        return Ok(());
    }
    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    if fs::rename(src, dest).is_err() {
        copy_dir_recursive(src, dest)?;
        fs::remove_dir_all(src)?;
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)?;
        }
    }
    Ok(())
}

fn chmod_recursive(path: &Path, mode: u32) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            chmod_recursive(&entry?.path(), mode)?;
        }
    }
    Ok(())
}
