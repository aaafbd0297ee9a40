use crate::error::{AssemblyError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| unreachable!("{e}")));

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Deterministic assembler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Suggested output filename carried on every artifact
    pub default_filename: String,

    /// Variable the call result is bound to
    pub result_binding: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            default_filename: "output.py".to_string(),
            result_binding: "result".to_string(),
        }
    }
}

impl AssemblerConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_python_identifier(&self.result_binding) {
            return Err(AssemblyError::InvalidConfig(format!(
                "result_binding '{}' is not a Python identifier",
                self.result_binding
            )));
        }
        if self.default_filename.trim().is_empty() {
            return Err(AssemblyError::InvalidConfig(
                "default_filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn is_python_identifier(text: &str) -> bool {
    IDENTIFIER_RE.is_match(text) && !PYTHON_KEYWORDS.contains(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_binding_must_be_identifier() {
        assert!(AssemblerConfig::default().validate().is_ok());

        for bad in ["", "1x", "class", "a-b", "x; import os"] {
            let config = AssemblerConfig {
                result_binding: bad.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad:?} accepted");
        }
    }
}
