use crate::coerce::TypeMismatchWarning;
use assembly_extractor::SignatureKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where the delivered code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactOrigin {
    /// Produced by the generative backend and verified
    Generated,
    /// Produced by the deterministic assembler
    Deterministic,
}

impl ArtifactOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Deterministic => "deterministic",
        }
    }
}

/// Non-fatal notes attached to an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactWarning {
    TypeMismatch(TypeMismatchWarning),
    /// Tied top candidates; the first was used
    Ambiguous { chosen: String, alternatives: Vec<String> },
    /// A ranked candidate that could not be assembled
    SkippedCandidate { candidate: String, reason: String },
    /// Why the generative path was abandoned
    Fallback { reason: String },
}

impl fmt::Display for ArtifactWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch(warning) => write!(f, "type mismatch: {warning}"),
            Self::Ambiguous {
                chosen,
                alternatives,
            } => write!(
                f,
                "ambiguous query: chose {chosen}, also matched {}",
                alternatives.join(", ")
            ),
            Self::SkippedCandidate { candidate, reason } => {
                write!(f, "skipped {candidate}: {reason}")
            }
            Self::Fallback { reason } => write!(f, "deterministic fallback: {reason}"),
        }
    }
}

/// Code delivered for one query.
///
/// `verified = true` means every call in `code_text` resolved against the index
/// snapshot `index_version`. Artifacts are built per query and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledArtifact {
    pub code_text: String,
    pub referenced_functions: BTreeSet<SignatureKey>,
    pub verified: bool,
    pub origin: ArtifactOrigin,
    pub warnings: Vec<ArtifactWarning>,
    /// Generation attempts made before this artifact (0 when generation was off)
    pub attempts: usize,
    pub index_version: u64,
    pub reasoning: String,
    pub filename: String,
}
