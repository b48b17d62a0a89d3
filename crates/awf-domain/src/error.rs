use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid domain pattern: {0}")]
    InvalidPattern(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
