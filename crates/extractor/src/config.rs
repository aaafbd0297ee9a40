use serde::{Deserialize, Serialize};

/// Configuration for which declarations become signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Index methods declared directly inside class bodies
    pub include_methods: bool,

    /// Index functions declared inside other functions
    pub include_nested: bool,

    /// Index classes as constructor signatures
    pub include_constructors: bool,

    /// Index names starting with a single underscore
    pub include_private: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            include_methods: true,
            include_nested: true,
            include_constructors: true,
            include_private: true,
        }
    }
}

impl ExtractorConfig {
    /// Only module-level functions (the narrowest verification surface)
    pub fn functions_only() -> Self {
        Self {
            include_methods: false,
            include_nested: false,
            include_constructors: false,
            ..Default::default()
        }
    }

    /// Check whether a declaration name passes the privacy filter
    pub fn accepts_name(&self, name: &str) -> bool {
        if self.include_private {
            return true;
        }
        // Dunder names (`__init__`) are protocol methods, not private helpers.
        !name.starts_with('_') || (name.starts_with("__") && name.ends_with("__"))
    }
}
