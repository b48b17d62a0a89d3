//! Network Provisioner (C3): ensures the fixed-addressing bridge network
//! the sandbox runs on exists, via the container engine's CLI.
//!
//! Idempotent and never destructive on the happy path: `ensure` returns
//! immediately if the named network is already present, so back-to-back
//! invocations reuse it rather than churn the bridge. `remove` is a
//! separate, best-effort call the orchestrator does not invoke by
//! default (spec.md §4.3).

use crate::error::{NetworkError, Result};
use awf_types::NetworkConfig;
use tokio::process::Command;
use tracing::{debug, info};

/// Default container engine binary. Overridable for engines that expose
/// the same CLI surface under a different name (e.g. `podman`).
pub const DEFAULT_ENGINE: &str = "docker";

pub struct NetworkProvisioner {
    engine: String,
}

impl NetworkProvisioner {
    pub fn new(engine: impl Into<String>) -> Self {
        Self { engine: engine.into() }
    }

    /// `docker network inspect <name>` argv, used both to probe for
    /// existence and exposed separately so tests can assert on its shape
    /// without a real engine installed.
    pub fn inspect_args(network: &str) -> Vec<String> {
        vec!["network".into(), "inspect".into(), network.into()]
    }

    /// `docker network create --subnet=<subnet> -o com.docker.network.bridge.name=<bridge> <name>`.
    pub fn create_args(cfg: &NetworkConfig) -> Vec<String> {
        vec![
            "network".into(),
            "create".into(),
            "--driver".into(),
            "bridge".into(),
            "--subnet".into(),
            cfg.subnet.into(),
            "--opt".into(),
            format!("com.docker.network.bridge.name={}", cfg.bridge),
            cfg.network.into(),
        ]
    }

    pub fn remove_args(network: &str) -> Vec<String> {
        vec!["network".into(), "rm".into(), network.into()]
    }

    /// Idempotent. Creates the bridge network with fixed `/24` addressing
    /// if it does not already exist; does nothing otherwise.
    pub async fn ensure(&self, cfg: &NetworkConfig) -> Result<()> {
        crate::addressing::validate(cfg)?;

        if self.exists(cfg.network).await? {
            debug!(network = cfg.network, "bridge network already present");
            return Ok(());
        }

        info!(
            network = cfg.network,
            subnet = cfg.subnet,
            bridge = cfg.bridge,
            "creating sandbox bridge network"
        );
        let output = self.run(&Self::create_args(cfg)).await?;
        if !output.status.success() {
            return Err(NetworkError::CommandFailed(format!(
                "docker network create failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    /// Best-effort teardown. Not called on the happy path; a separate
    /// opt-in for operators who want the bridge reclaimed.
    pub async fn remove(&self, network: &str) -> Result<()> {
        let output = self.run(&Self::remove_args(network)).await?;
        if !output.status.success() {
            debug!(
                network,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "network rm failed (best-effort, ignored)"
            );
        }
        Ok(())
    }

    async fn exists(&self, network: &str) -> Result<bool> {
        let output = self.run(&Self::inspect_args(network)).await?;
        Ok(output.status.success())
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        Command::new(&self.engine)
            .args(args)
            .output()
            .await
            .map_err(|e| NetworkError::EngineUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_args_names_fixed_subnet_and_bridge() {
        let cfg = NetworkConfig::current();
        let args = NetworkProvisioner::create_args(&cfg);
        assert!(args.contains(&"172.30.0.0/24".to_string()));
        assert!(args
            .iter()
            .any(|a| a == "com.docker.network.bridge.name=fw-bridge"));
        assert_eq!(args.last().unwrap(), "awf-net");
    }

    #[test]
    fn inspect_and_remove_args_name_the_network() {
        assert_eq!(
            NetworkProvisioner::inspect_args("awf-net"),
            vec!["network", "inspect", "awf-net"]
        );
        assert_eq!(
            NetworkProvisioner::remove_args("awf-net"),
            vec!["network", "rm", "awf-net"]
        );
    }

    #[tokio::test]
    async fn ensure_surfaces_engine_unavailable() {
        let provisioner = NetworkProvisioner::new("definitely-not-a-real-binary-xyz");
        let cfg = NetworkConfig::current();
        let err = provisioner.ensure(&cfg).await.unwrap_err();
        assert!(matches!(err, NetworkError::EngineUnavailable(_)));
    }
}
