use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("Index schema mismatch: found v{found}, expected v{expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Indexing worker failed: {0}")]
    WorkerFailed(String),

    #[error("Invalid indexer configuration: {0}")]
    InvalidConfig(String),
}
