use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("failed to read access log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
