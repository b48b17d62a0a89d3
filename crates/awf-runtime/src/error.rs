//! Orchestrator-wide error type. Wraps every component error this crate
//! calls into, plus the handful of failure modes that belong to the
//! orchestrator itself (the engine CLI driver, the proxy health check).
//!
//! `DomainBlocked` and `AgentFailed` from spec.md §7 are deliberately
//! absent here: neither is raised as an `Err` (see
//! [`crate::remediation`]) — the orchestrator returns the agent's own
//! exit code for both, with the denial list surfaced as warnings.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Network(#[from] awf_network::NetworkError),

    #[error(transparent)]
    Compose(#[from] awf_compose::ComposeError),

    #[error(transparent)]
    ProxyConfig(#[from] awf_proxy::ProxyConfigError),

    #[error(transparent)]
    Classifier(#[from] awf_monitor::ClassifierError),

    #[error(transparent)]
    Types(#[from] awf_types::CommonError),

    #[error("container engine command failed: {0}")]
    EngineCommandFailed(String),

    #[error("container engine CLI is unavailable: {0}")]
    EngineUnavailable(String),

    #[error("proxy failed its health check: {detail}")]
    ProxyUnhealthy { detail: String },

    #[error("failed to serialize seccomp profile: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    /// `true` for the one kind that must abort before any chain is
    /// touched (spec.md §7 "PermissionDenied aborts before any chain is
    /// touched").
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Network(awf_network::NetworkError::PermissionDenied(_))
        )
    }
}
