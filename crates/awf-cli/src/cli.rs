//! Command-line surface (spec.md §6). Kept separate from
//! [`crate::config_build`] so the validation logic stays testable without
//! going through `clap::Parser`.

use crate::config_build::RawArgs;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "awf",
    version,
    about = "Runs an agentic workflow inside an egress-filtered sandbox"
)]
pub struct Cli {
    /// Comma-separated domains (and wildcard patterns) the agent may reach.
    #[arg(long, required = true, value_delimiter = ',')]
    pub allow_domains: Vec<String>,

    /// Extra domains read one-per-line from a file and merged with `--allow-domains`.
    #[arg(long)]
    pub allow_domains_file: Option<PathBuf>,

    /// Domains explicitly denied even if they'd otherwise match an allowed wildcard.
    #[arg(long, value_delimiter = ',')]
    pub block_domains: Vec<String>,

    /// Path-level pattern an allowed host's requests must also match. Repeatable.
    #[arg(long = "url-pattern")]
    pub url_patterns: Vec<String>,

    #[arg(long, value_delimiter = ',', default_value = "8.8.8.8,8.8.4.4")]
    pub dns: Vec<String>,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Leave the containers and workDir in place after the run for inspection.
    #[arg(long)]
    pub keep_containers: bool,

    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Build the proxy/agent images locally instead of pulling them.
    #[arg(long)]
    pub build_local: bool,

    #[arg(long, default_value = "ghcr.io/example")]
    pub image_registry: String,

    #[arg(long, default_value = "latest")]
    pub image_tag: String,

    /// A preset name (`default`, `act`) or an allowlisted base image reference.
    #[arg(long, default_value = "default")]
    pub agent_image: String,

    /// `KEY=VALUE`, passed through to the agent container. Repeatable.
    #[arg(short = 'e', long = "env")]
    pub env: Vec<String>,

    /// Pass every variable in the invoking shell's environment through to the agent.
    #[arg(long)]
    pub env_all: bool,

    /// `HOST:CONTAINER[:ro|rw]`. Repeatable.
    #[arg(short = 'v', long = "volume")]
    pub volume: Vec<String>,

    #[arg(long)]
    pub container_work_dir: Option<PathBuf>,

    #[arg(long)]
    pub allow_full_filesystem_access: bool,

    #[arg(long)]
    pub tty: bool,

    #[arg(long)]
    pub enable_host_access: bool,

    /// Comma-separated `port` or `start-end` entries the agent may reach on the host.
    #[arg(long, value_delimiter = ',')]
    pub allow_host_ports: Vec<String>,

    #[arg(long)]
    pub enable_api_proxy: bool,

    #[arg(long)]
    pub openai_api_key: Option<String>,

    #[arg(long)]
    pub anthropic_api_key: Option<String>,

    #[arg(long)]
    pub proxy_logs_dir: Option<PathBuf>,

    /// The agent's own command line, after `--`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub cmd: Vec<String>,
}

impl Cli {
    pub fn into_raw(self) -> RawArgs {
        RawArgs {
            allow_domains: self.allow_domains,
            allow_domains_file: self.allow_domains_file,
            block_domains: self.block_domains,
            url_patterns: self.url_patterns,
            dns: self.dns,
            log_level: self.log_level,
            keep_containers: self.keep_containers,
            work_dir: self.work_dir,
            build_local: self.build_local,
            image_registry: self.image_registry,
            image_tag: self.image_tag,
            agent_image: self.agent_image,
            env: self.env,
            env_all: self.env_all,
            volume: self.volume,
            container_work_dir: self.container_work_dir,
            allow_full_filesystem_access: self.allow_full_filesystem_access,
            tty: self.tty,
            enable_host_access: self.enable_host_access,
            allow_host_ports: self.allow_host_ports,
            enable_api_proxy: self.enable_api_proxy,
            openai_api_key: self.openai_api_key,
            anthropic_api_key: self.anthropic_api_key,
            proxy_logs_dir: self.proxy_logs_dir,
            cmd: self.cmd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::parse_from(["awf", "--allow-domains", "github.com,example.com"]);
        assert_eq!(cli.allow_domains, vec!["github.com", "example.com"]);
        assert_eq!(cli.dns, vec!["8.8.8.8", "8.8.4.4"]);
        assert_eq!(cli.log_level, "info");
        assert!(!cli.keep_containers);
    }

    #[test]
    fn captures_trailing_agent_command() {
        let cli = Cli::parse_from([
            "awf",
            "--allow-domains",
            "github.com",
            "--",
            "npm",
            "run",
            "--silent",
            "build",
        ]);
        assert_eq!(cli.cmd, vec!["npm", "run", "--silent", "build"]);
    }

    #[test]
    fn repeatable_flags_accumulate() {
        let cli = Cli::parse_from([
            "awf",
            "--allow-domains",
            "github.com",
            "-e",
            "FOO=1",
            "-e",
            "BAR=2",
            "-v",
            "/host:/container:ro",
        ]);
        assert_eq!(cli.env, vec!["FOO=1", "BAR=2"]);
        assert_eq!(cli.volume, vec!["/host:/container:ro"]);
    }

    #[test]
    fn rejects_missing_allow_domains() {
        let result = Cli::try_parse_from(["awf"]);
        assert!(result.is_err());
    }
}
