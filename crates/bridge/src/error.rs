use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Generative backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Generative backend timed out after {0}ms")]
    BackendTimeout(u64),

    #[error("Verification failed: {0}")]
    VerificationFailure(String),

    #[error(transparent)]
    Retriever(#[from] assembly_retriever::RetrieverError),

    #[error(transparent)]
    Assembly(#[from] assembly_assembler::AssemblyError),

    #[error("Indexer error: {0}")]
    Indexer(#[from] assembly_indexer::IndexerError),

    #[error("Extractor error: {0}")]
    Extractor(#[from] assembly_extractor::ExtractorError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    /// Backend failures and timeouts are handled identically
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::BackendTimeout(_))
    }
}
