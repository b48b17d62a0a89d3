//! C5: Container Spec Builder.
//!
//! Turns a validated [`awf_types::Config`] into the compose document that
//! drives the proxy, agent, and (optionally) API proxy containers, plus
//! the supporting artifacts C6 writes into `workDir` alongside it: the
//! agent environment, its volume list, the pre-resolved hosts file, and
//! the UID/GID an agent image build should run as.

pub mod builder;
pub mod document;
pub mod env;
pub mod error;
pub mod hosts;
pub mod uid;
pub mod volumes;

pub use builder::{
    build, BuildInputs, AGENT_CONTAINER, AGENT_SERVICE, API_PROXY_CONTAINER, API_PROXY_SERVICE,
    PROXY_CONTAINER, PROXY_SERVICE,
};
pub use document::ComposeFile;
pub use error::{ComposeError, Result};
pub use hosts::{build_hosts_file, HostResolver, SystemResolver};
pub use uid::resolve_uid_gid;
