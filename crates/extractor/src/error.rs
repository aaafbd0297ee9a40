use thiserror::Error;

/// Result type for extractor operations
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Errors that can occur while parsing Python source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    /// The source contains syntax errors; no signatures are trusted from it
    #[error("Syntax error in {path} at line {line}, column {column}")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
    },

    /// Tree-sitter produced no tree (cancelled or aborted parse)
    #[error("Parse error in {path}: {reason}")]
    ParseError { path: String, reason: String },

    /// Failed to configure the grammar
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl ExtractorError {
    /// Create a parse error
    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}
