//! CLI-facing error type: wraps whatever `config_build` or the
//! orchestrator returned so `main` has one thing to redact and print.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Orchestrator(#[from] awf_runtime::OrchestratorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
