use crate::error::{IndexerError, Result};
use crate::limits::MAX_INDEX_CONCURRENCY;
use assembly_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_MAX_FILE_BYTES: u64 = 1_048_576; // 1 MB

/// Indexer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Parse workers; `None` picks the CPU count (env override wins)
    pub concurrency: Option<usize>,

    /// Files larger than this are skipped during discovery
    pub max_file_bytes: u64,

    /// Which declarations become signatures
    pub extractor: ExtractorConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.concurrency {
            if workers == 0 || workers > MAX_INDEX_CONCURRENCY {
                return Err(IndexerError::InvalidConfig(format!(
                    "concurrency must be within 1..={MAX_INDEX_CONCURRENCY}, got {workers}"
                )));
            }
        }
        if self.max_file_bytes == 0 {
            return Err(IndexerError::InvalidConfig(
                "max_file_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(IndexerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_concurrency() {
        let config = IndexerConfig {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = IndexerConfig {
            concurrency: Some(64),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
