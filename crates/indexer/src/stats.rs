use serde::{Deserialize, Serialize};

/// A file that could not be indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: String,
    pub reason: String,
}

/// Statistics about one index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of files handed to the builder
    pub files_seen: usize,

    /// Number of files that parsed and contributed signatures
    pub files_indexed: usize,

    /// Number of resolvable signatures in the published index
    pub signatures: usize,

    /// Duplicate `(name, arity)` signatures that lost to an earlier location
    pub shadowed: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Files skipped because they failed to parse
    pub failures: Vec<ParseFailure>,
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self) {
        self.files_indexed += 1;
    }

    pub fn add_failure(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.failures.push(ParseFailure {
            path: path.into(),
            reason: reason.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} signatures from {}/{} files ({} shadowed, {} failed) in {}ms",
            self.signatures,
            self.files_indexed,
            self.files_seen,
            self.shadowed,
            self.failures.len(),
            self.time_ms
        )
    }
}
