//! Entry point: parse arguments, build and validate a [`Config`], then
//! drive one invocation through [`awf_runtime::run`].

mod cli;
mod config_build;
mod error;
mod logging;

use awf_runtime::{RunInputs, RunOutcome};
use awf_types::redact;
use clap::Parser;
use cli::Cli;
use config_build::config_build;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    let raw = cli.into_raw();

    let config = match config_build(&raw) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("awf: {}", redact(&e.to_string()));
            return 1;
        }
    };

    logging::init(config.log_level);
    info!(work_dir = %config.work_dir.display(), "starting run");

    let host_env: HashMap<String, String> = std::env::vars().collect();
    let home_dir = home_dir();
    let workspace_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let (process_uid, process_gid) = process_ids();
    let (sudo_uid, sudo_gid) = sudo_ids();

    let inputs = RunInputs {
        config: &config,
        home_dir: &home_dir,
        workspace_dir: &workspace_dir,
        host_env: &host_env,
        process_uid,
        process_gid,
        sudo_uid,
        sudo_gid,
        engine_bin: awf_network::DEFAULT_ENGINE.to_string(),
    };

    match awf_runtime::run(inputs).await {
        Ok(RunOutcome { exit_code, persisted, work_dir }) => {
            if let Some(paths) = persisted {
                info!(
                    agent_logs = %paths.agent_logs.display(),
                    proxy_logs = %paths.proxy_logs.display(),
                    "run finished, logs persisted"
                );
            } else {
                info!(work_dir = %work_dir.display(), "run finished, workDir kept");
            }
            exit_code
        }
        Err(e) => {
            error!(error = %redact(&e.to_string()), "run failed");
            1
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/root"))
}

fn process_ids() -> (u32, u32) {
    (nix::unistd::getuid().as_raw(), nix::unistd::getgid().as_raw())
}

fn sudo_ids() -> (Option<u32>, Option<u32>) {
    let uid = std::env::var("SUDO_UID").ok().and_then(|s| s.parse().ok());
    let gid = std::env::var("SUDO_GID").ok().and_then(|s| s.parse().ok());
    (uid, gid)
}
