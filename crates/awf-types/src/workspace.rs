//! The on-disk layout `workDir` takes during a run.
//!
//! Created by the orchestrator before compose-up, removed after teardown
//! unless `keepContainers` is set. Every path here is referenced by more
//! than one component (C2 writes `proxy.conf`, C5 mounts it read-only; C6
//! owns the lifetime; C8 moves the two log directories out before the rest
//! is deleted), so the layout itself lives in the shared types crate
//! rather than in any one component.

use crate::error::{CommonError, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Host directory used to share MCP logs across containers regardless of
/// which `workDir` a given invocation picked.
pub const SHARED_MCP_LOGS_DIR: &str = "/tmp/gh-aw/mcp-logs";

#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    pub work_dir: PathBuf,
    pub chroot_suffix: String,
}

impl WorkspaceLayout {
    /// Build the layout for a fresh invocation; does not touch the
    /// filesystem yet. `chroot_suffix` should be a short random token so
    /// concurrent invocations (unsupported, but not actively colliding on
    /// disk) don't fight over the same chroot directory name.
    pub fn new(work_dir: PathBuf, chroot_suffix: String) -> Self {
        Self {
            work_dir,
            chroot_suffix,
        }
    }

    pub fn proxy_conf(&self) -> PathBuf {
        self.work_dir.join("proxy.conf")
    }

    pub fn compose_yaml(&self) -> PathBuf {
        self.work_dir.join("compose.yaml")
    }

    pub fn proxy_logs_dir(&self) -> PathBuf {
        self.work_dir.join("proxy-logs")
    }

    pub fn agent_logs_dir(&self) -> PathBuf {
        self.work_dir.join("agent-logs")
    }

    pub fn chroot_dir(&self) -> PathBuf {
        self.work_dir.join(format!("chroot-{}", self.chroot_suffix))
    }

    pub fn chroot_hosts_file(&self) -> PathBuf {
        self.chroot_dir().join("hosts")
    }

    pub fn seccomp_json(&self) -> PathBuf {
        self.work_dir.join("seccomp.json")
    }

    pub fn proxy_access_log(&self) -> PathBuf {
        self.proxy_logs_dir().join("access.log")
    }

    /// Create `workDir` and its fixed subdirectories with the permissions
    /// spec.md §3 requires. Idempotent: re-running against an existing
    /// layout just ensures the directories and their modes are correct.
    pub fn create(&self) -> Result<()> {
        create_dir_with_mode(&self.work_dir, 0o700)?;
        create_dir_with_mode(&self.proxy_logs_dir(), 0o777)?;
        create_dir_with_mode(&self.agent_logs_dir(), 0o755)?;
        create_dir_with_mode(&self.chroot_dir(), 0o700)?;
        create_dir_with_mode(Path::new(SHARED_MCP_LOGS_DIR), 0o777)?;
        Ok(())
    }

    /// Remove `workDir` and everything under it. Called by C6's cleanup
    /// path unless `keepContainers` was set.
    pub fn remove(&self) -> Result<()> {
        if self.work_dir.exists() {
            fs::remove_dir_all(&self.work_dir)?;
        }
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.work_dir.exists()
    }
}

fn create_dir_with_mode(path: &Path, mode: u32) -> Result<()> {
    fs::create_dir_all(path)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

/// Write `contents` to `path` with the given mode, replacing whatever was
/// there. Used for `proxy.conf`, `compose.yaml`, `seccomp.json`, and the
/// chroot `hosts` file, all of which must land at mode 0600.
pub fn write_with_mode(path: &Path, contents: &str, mode: u32) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| CommonError::Io(e))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_lays_out_expected_subdirs() {
        let base = tempdir().unwrap();
        let layout = WorkspaceLayout::new(base.path().join("run"), "ab12cd".into());
        layout.create().unwrap();

        assert!(layout.work_dir.is_dir());
        assert!(layout.proxy_logs_dir().is_dir());
        assert!(layout.agent_logs_dir().is_dir());
        assert!(layout.chroot_dir().is_dir());

        let mode = fs::metadata(&layout.work_dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn remove_deletes_work_dir_but_tolerates_missing() {
        let base = tempdir().unwrap();
        let layout = WorkspaceLayout::new(base.path().join("run"), "ab12cd".into());
        layout.create().unwrap();
        layout.remove().unwrap();
        assert!(!layout.work_dir.exists());
        // Removing again must not error.
        layout.remove().unwrap();
    }

    #[test]
    fn write_with_mode_sets_requested_permissions() {
        let base = tempdir().unwrap();
        let layout = WorkspaceLayout::new(base.path().join("run"), "zz".into());
        layout.create().unwrap();
        let path = layout.proxy_conf();
        write_with_mode(&path, "http_port 3128\n", 0o600).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
