//! Compose v2 document model. A thin, serde-driven mirror of the subset
//! of the Compose schema this workspace emits — `services` and an
//! `external: true` reference to the network C3 provisions.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, Service>,
    pub networks: BTreeMap<String, NetworkRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkRef {
    pub external: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Service {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    pub networks: BTreeMap<String, ServiceNetwork>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(rename = "cap_add", skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    #[serde(rename = "cap_drop", skip_serializing_if = "Vec::is_empty")]
    pub cap_drop: Vec<String>,
    #[serde(rename = "security_opt", skip_serializing_if = "Vec::is_empty")]
    pub security_opt: Vec<String>,
    #[serde(rename = "mem_limit", skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<String>,
    #[serde(rename = "pids_limit", skip_serializing_if = "Option::is_none")]
    pub pids_limit: Option<u32>,
    #[serde(rename = "cpu_shares", skip_serializing_if = "Option::is_none")]
    pub cpu_shares: Option<u32>,
    #[serde(rename = "depends_on", skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tmpfs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    #[serde(rename = "dns_search", skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tty: Option<bool>,
    #[serde(rename = "stdin_open", skip_serializing_if = "Option::is_none")]
    pub stdin_open: Option<bool>,
    #[serde(rename = "working_dir", skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSpec {
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceNetwork {
    pub ipv4_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependsOnEntry {
    pub condition: String,
}

impl DependsOnEntry {
    pub fn healthy() -> Self {
        Self {
            condition: "service_healthy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Healthcheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

impl Healthcheck {
    /// A TCP probe on `port`, every 5 seconds, matching spec.md §4.5's
    /// proxy healthcheck.
    pub fn tcp_probe(port: u16) -> Self {
        Self {
            test: vec![
                "CMD".into(),
                "nc".into(),
                "-z".into(),
                "localhost".into(),
                port.to_string(),
            ],
            interval: "5s".into(),
            timeout: "3s".into(),
            retries: 3,
        }
    }
}

impl ComposeFile {
    pub fn to_yaml(&self) -> crate::error::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
