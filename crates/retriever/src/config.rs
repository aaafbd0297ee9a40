use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};

/// Retriever configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Upper bound on returned candidates (the top-tied group is never cut)
    pub max_candidates: usize,

    /// "Did you mean" suggestions offered when nothing matches
    pub suggestion_count: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            max_candidates: 50,
            suggestion_count: 3,
        }
    }
}

impl RetrieverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            return Err(RetrieverError::InvalidConfig(
                "max_candidates must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
