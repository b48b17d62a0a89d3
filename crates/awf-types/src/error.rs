//! Shared error type for config and validation helpers.
//!
//! Component-specific failures (bad domain syntax, a rejected dangerous
//! port, a missing `iptables`) live in each component's own error enum;
//! this one backs only the value-parsing helpers in [`crate::config`] and
//! [`crate::validation`] that those crates build on top of.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Adds ad-hoc context to any error on its way into a `CommonError`.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + 'static,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| CommonError::Internal(format!("{}: {}", msg, e)))
    }
}
