use thiserror::Error;

/// Main error type for sysvista operations
#[derive(Error, Debug)]
pub enum SysvistaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Invalid detection pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid scan document: {0}")]
    InvalidDocument(String),

    #[error("Scan failed: {0}")]
    Scan(String),
}

pub type Result<T> = std::result::Result<T, SysvistaError>;
