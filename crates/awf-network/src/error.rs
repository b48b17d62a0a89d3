use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("container engine CLI is unavailable: {0}")]
    EngineUnavailable(String),

    #[error("network command failed: {0}")]
    CommandFailed(String),

    #[error("packet-filter probe failed, process likely lacks CAP_NET_ADMIN: {0}")]
    PermissionDenied(String),

    #[error(
        "an IPv6 DNS server is configured but ip6tables is unavailable; refusing to leave the \
         dual-stack host uncaged"
    )]
    Ipv6CageUnavailable,

    #[error("fixed address {addr} does not fall inside subnet {subnet}")]
    AddressOutsideSubnet { addr: String, subnet: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
