use assembly_assembler::AssembledArtifact;
use assembly_bridge::{LifecycleState, QueryOutcome};
use assembly_indexer::IndexStats;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

#[derive(Serialize)]
pub(crate) struct IndexReport<'a> {
    pub root: &'a Path,
    pub version: u64,
    pub stats: &'a IndexStats,
    pub fingerprint: String,
    pub saved_to: Option<&'a Path>,
}

impl IndexReport<'_> {
    pub fn render(&self) -> String {
        let mut out = format!("Indexed {}\n{}\n", self.root.display(), self.stats);
        if self.stats.has_failures() {
            let _ = writeln!(out, "{} file(s) not indexed:", self.stats.failures.len());
            for failure in &self.stats.failures {
                let _ = writeln!(out, "  skipped {}: {}", failure.path, failure.reason);
            }
        }
        let _ = writeln!(out, "fingerprint {}", self.fingerprint);
        if let Some(path) = self.saved_to {
            let _ = writeln!(out, "saved to {}", path.display());
        }
        out
    }
}

#[derive(Serialize)]
pub(crate) struct QueryReport<'a> {
    pub query: &'a str,
    pub index_version: u64,
    pub delivered: bool,
    pub trace: &'a [LifecycleState],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<&'a AssembledArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_empty")]
    pub suggestions: &'a [String],
}

impl<'a> QueryReport<'a> {
    pub fn from_outcome(outcome: &'a QueryOutcome) -> Self {
        Self {
            query: outcome.query.trim(),
            index_version: outcome.index_version,
            delivered: outcome.is_delivered(),
            trace: &outcome.trace,
            artifact: outcome.artifact(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
            suggestions: &outcome.suggestions,
        }
    }

    /// Warnings and failures go to the log, code goes to stdout
    pub fn print_warnings(&self) {
        log::debug!("trace: {}", self.trace_line());
        if let Some(artifact) = self.artifact {
            for warning in &artifact.warnings {
                log::warn!("{warning}");
            }
        }
    }

    /// Human-readable block for the line-based REPL
    pub fn render(&self) -> String {
        let mut out = String::new();
        match (self.artifact, &self.error) {
            (Some(artifact), _) => {
                let _ = writeln!(
                    out,
                    "# {} ({}, {} attempt(s), index v{})",
                    artifact.filename,
                    artifact.origin.as_str(),
                    artifact.attempts,
                    artifact.index_version
                );
                let _ = writeln!(out, "# {}", artifact.reasoning);
                for warning in &artifact.warnings {
                    let _ = writeln!(out, "# warning: {warning}");
                }
                out.push_str(&artifact.code_text);
            }
            (None, Some(error)) => {
                let _ = writeln!(out, "error: {error}");
            }
            (None, None) => {}
        }
        let _ = writeln!(out, "# trace: {}", self.trace_line());
        out
    }

    fn trace_line(&self) -> String {
        self.trace
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}
