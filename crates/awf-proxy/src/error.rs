use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyConfigError {
    #[error("port {port} is on the dangerous-ports blocklist ({service})")]
    DangerousPort { port: u16, service: &'static str },

    #[error("port range {start}-{end} overlaps dangerous port {port} ({service})")]
    DangerousPortRange {
        start: u16,
        end: u16,
        port: u16,
        service: &'static str,
    },

    #[error("invalid URL pattern: {0}")]
    InvalidUrlPattern(String),
}

pub type Result<T> = std::result::Result<T, ProxyConfigError>;
