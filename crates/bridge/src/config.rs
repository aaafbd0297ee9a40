use crate::error::{BridgeError, Result};
use assembly_assembler::AssemblerConfig;
use assembly_indexer::IndexerConfig;
use assembly_retriever::RetrieverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const BACKEND_TIMEOUT_ENV: &str = "ASSEMBLY_BACKEND_TIMEOUT_MS";
pub const MAX_RETRIES_ENV: &str = "ASSEMBLY_MAX_RETRIES";
pub const BACKEND_COMMAND_ENV: &str = "ASSEMBLY_BACKEND_COMMAND";

const DEFAULT_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_MAX_RETRIES: usize = 2;
const DEFAULT_PROMPT_CANDIDATES: usize = 5;
const MAX_RETRIES_LIMIT: usize = 10;

/// What to do when several candidates tie for the top rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Deliver from the top candidate and attach the alternatives as a warning
    #[default]
    Report,
    /// Fail the query with `AmbiguousMatch`
    Reject,
}

/// Generative bridge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,

    /// Additional generation attempts after the first rejection
    pub max_retries: usize,

    /// Per-attempt backend timeout
    pub timeout_ms: u64,

    /// How many top-ranked signatures go into the prompt
    pub prompt_candidates: usize,

    pub ambiguity_policy: AmbiguityPolicy,

    /// Program (and arguments) for the command backend
    pub backend_command: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            prompt_candidates: DEFAULT_PROMPT_CANDIDATES,
            ambiguity_policy: AmbiguityPolicy::default(),
            backend_command: None,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "bridge.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.prompt_candidates == 0 {
            return Err(BridgeError::InvalidConfig(
                "bridge.prompt_candidates must be greater than 0".to_string(),
            ));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(BridgeError::InvalidConfig(format!(
                "bridge.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            )));
        }
        if let Some(command) = &self.backend_command {
            if command.trim().is_empty() {
                return Err(BridgeError::InvalidConfig(
                    "bridge.backend_command must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Full engine configuration, as read from `.assembly/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub indexer: IndexerConfig,
    pub retriever: RetrieverConfig,
    pub assembler: AssemblerConfig,
    pub bridge: BridgeConfig,
}

impl EngineConfig {
    /// `<root>/.assembly/config.toml`
    pub fn path_for_root(root: &Path) -> PathBuf {
        root.join(".assembly").join("config.toml")
    }

    /// Load the project config (defaults when absent), then apply env overrides
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_for_root(root);
        let mut config = if path.is_file() {
            log::debug!("Loading config from {}", path.display());
            Self::from_toml_str(&std::fs::read_to_string(&path)?)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment-style overrides from `lookup`.
    ///
    /// `ASSEMBLY_INDEX_CONCURRENCY` is read by the index builder itself.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(BACKEND_TIMEOUT_ENV) {
            self.bridge.timeout_ms = parse_number(BACKEND_TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MAX_RETRIES_ENV) {
            self.bridge.max_retries = parse_number(MAX_RETRIES_ENV, &raw)?;
        }
        if let Some(raw) = lookup(BACKEND_COMMAND_ENV) {
            let command = raw.trim();
            if !command.is_empty() {
                self.bridge.backend_command = Some(command.to_string());
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.indexer.validate()?;
        self.retriever.validate()?;
        self.assembler.validate()?;
        self.bridge.validate()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| BridgeError::InvalidConfig(format!("{key} must be a number, got '{raw}'")))
}
