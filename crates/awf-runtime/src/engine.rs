//! Thin driver over the container engine's command-line surface (spec.md
//! §1: `network create/inspect/rm`, `compose up/down`, `rm`, `wait`,
//! `logs -f`). The engine itself is an out-of-scope collaborator; this
//! module only assumes the argv shape spec.md documents.

use crate::error::{OrchestratorError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

pub use awf_network::DEFAULT_ENGINE;

pub struct Engine {
    bin: String,
}

impl Engine {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Force-remove a container by name, ignoring failure (it may not
    /// exist) — spec.md §4.6 "Startup ordering".
    pub async fn force_remove(&self, name: &str) {
        let _ = Command::new(&self.bin).args(["rm", "-f", name]).output().await;
    }

    pub async fn compose_up(&self, compose_file: &Path) -> Result<()> {
        let output = Command::new(&self.bin)
            .arg("compose")
            .arg("-f")
            .arg(compose_file)
            .args(["up", "-d"])
            .output()
            .await
            .map_err(|e| OrchestratorError::EngineUnavailable(e.to_string()))?;
        if !output.status.success() {
            return Err(OrchestratorError::EngineCommandFailed(format!(
                "compose up failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    /// Best-effort: failures are logged by the caller, never propagated,
    /// since teardown must run to completion on every path.
    pub async fn compose_down(&self, compose_file: &Path) -> std::process::Output {
        Command::new(&self.bin)
            .arg("compose")
            .arg("-f")
            .arg(compose_file)
            .arg("down")
            .output()
            .await
            .unwrap_or_else(|e| fake_failed_output(e.to_string()))
    }

    /// Foreground log pump (spec.md §4.6's concurrent subtask (a)):
    /// inherits stdio until the container exits naturally.
    pub async fn stream_logs(&self, container: &str) -> Result<()> {
        Command::new(&self.bin)
            .args(["logs", "-f", container])
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| OrchestratorError::EngineUnavailable(e.to_string()))?;
        Ok(())
    }

    /// `docker wait <container>`: blocks until the container exits,
    /// returning its integer exit code (subtask (b)).
    pub async fn wait_exit_code(&self, container: &str) -> Result<i32> {
        let output = Command::new(&self.bin)
            .args(["wait", container])
            .output()
            .await
            .map_err(|e| OrchestratorError::EngineUnavailable(e.to_string()))?;
        if !output.status.success() {
            return Err(OrchestratorError::EngineCommandFailed(format!(
                "docker wait failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .lines()
            .next()
            .and_then(|line| line.trim().parse().ok())
            .ok_or_else(|| {
                OrchestratorError::EngineCommandFailed(
                    "docker wait produced no parseable exit code".to_string(),
                )
            })
    }
}

fn fake_failed_output(stderr: String) -> std::process::Output {
    use std::os::unix::process::ExitStatusExt;
    std::process::Output {
        status: std::process::ExitStatus::from_raw(1),
        stdout: Vec::new(),
        stderr: stderr.into_bytes(),
    }
}
