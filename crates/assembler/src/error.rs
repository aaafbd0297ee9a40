use assembly_extractor::SignatureKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Per-candidate assembly failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("{name} expects {expected} positional arguments, got {got}")]
    ArityError {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("{qualified_name} ({}) cannot be called directly from a fresh script", .kind.as_str())]
    NotDirectlyCallable {
        qualified_name: String,
        kind: SignatureKind,
    },

    #[error("{name} lives in '{module}', which is not an importable module name")]
    NotImportable { name: String, module: String },

    #[error("{name}: assembled call was rejected ({reason})")]
    DraftRejected { name: String, reason: String },

    #[error("No candidate could be assembled: {}", join_errors(.errors))]
    NoAssemblableCandidate { errors: Vec<AssemblyError> },

    #[error("Invalid assembler configuration: {0}")]
    InvalidConfig(String),
}

impl AssemblyError {
    /// Fatal for this candidate only; the next ranked candidate may still work
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            Self::ArityError { .. }
                | Self::NotDirectlyCallable { .. }
                | Self::NotImportable { .. }
                | Self::DraftRejected { .. }
        )
    }
}

fn join_errors(errors: &[AssemblyError]) -> String {
    if errors.is_empty() {
        return "no candidates".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
