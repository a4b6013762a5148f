/// Shared error type used across all sksession crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("redis: {0}")]
    Redis(String),

    #[error("invalid session identifier: {0}")]
    InvalidIdentifier(String),

    #[error("corrupt session payload: {0}")]
    CorruptSession(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
