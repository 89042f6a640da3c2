use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplarError {
    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Failed to retrieve {key}: {reason}")]
    Retrieval { key: String, reason: String },

    #[error("Document could not be rendered: {0}")]
    Unrenderable(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TemplarError>;
