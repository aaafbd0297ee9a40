use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrieverError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrieverError {
    #[error("No indexed function matches '{query}'{}", did_you_mean(.suggestions))]
    NoMatch {
        query: String,
        suggestions: Vec<String>,
    },

    #[error("Query '{query}' is ambiguous between: {}", .candidates.join(", "))]
    AmbiguousMatch {
        query: String,
        candidates: Vec<String>,
    },

    #[error("Invalid retriever configuration: {0}")]
    InvalidConfig(String),
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_message() {
        let err = RetrieverError::NoMatch {
            query: "rocket_ad".to_string(),
            suggestions: vec!["rocket_add".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No indexed function matches 'rocket_ad' (did you mean: rocket_add?)"
        );

        let err = RetrieverError::NoMatch {
            query: "zzz".to_string(),
            suggestions: Vec::new(),
        };
        assert_eq!(err.to_string(), "No indexed function matches 'zzz'");
    }
}
