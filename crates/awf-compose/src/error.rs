use thiserror::Error;

pub type Result<T> = std::result::Result<T, ComposeError>;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("failed to serialize compose document: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("I/O error writing compose artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("API proxy requested but neither an OpenAI nor an Anthropic key was supplied")]
    ApiProxyMissingKeys,
}
