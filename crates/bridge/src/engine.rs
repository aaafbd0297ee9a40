use crate::backend::GenerativeBackend;
use crate::config::{AmbiguityPolicy, EngineConfig};
use crate::error::{BridgeError, Result};
use crate::prompt::{Prompt, PromptBuilder};
use crate::response::parse_response;
use crate::verifier::{Rejection, Verification, Verifier};
use assembly_assembler::{
    ArtifactOrigin, ArtifactWarning, AssembledArtifact, Assembler, AssemblyError,
};
use assembly_extractor::SignatureKey;
use assembly_indexer::{
    BuildOutput, IndexBuilder, IndexHandle, IndexSnapshot, IndexStats, SignatureIndex, SourceFile,
};
use assembly_retriever::{Retrieval, Retriever};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Shape of the retrieval result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalShape {
    Empty,
    Single,
    Multiple,
}

/// States a query passes through, recorded in order on the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    Received,
    Retrieved { shape: RetrievalShape },
    Assembling,
    Generating { attempt: usize },
    Verified,
    Rejected { reason: String },
    Retry { attempt: usize },
    FallbackAssembled,
    Delivered,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Retrieved { shape } => write!(f, "retrieved({shape:?})"),
            Self::Assembling => f.write_str("assembling"),
            Self::Generating { attempt } => write!(f, "generating#{attempt}"),
            Self::Verified => f.write_str("verified"),
            Self::Rejected { reason } => write!(f, "rejected({reason})"),
            Self::Retry { attempt } => write!(f, "retry#{attempt}"),
            Self::FallbackAssembled => f.write_str("fallback-assembled"),
            Self::Delivered => f.write_str("delivered"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Everything known about one processed query
#[derive(Debug)]
pub struct QueryOutcome {
    pub query: String,
    pub index_version: u64,
    pub trace: Vec<LifecycleState>,
    /// Fuzzy "did you mean" names when nothing matched
    pub suggestions: Vec<String>,
    pub result: Result<AssembledArtifact>,
}

impl QueryOutcome {
    pub fn artifact(&self) -> Option<&AssembledArtifact> {
        self.result.as_ref().ok()
    }

    pub fn is_delivered(&self) -> bool {
        self.trace.last() == Some(&LifecycleState::Delivered)
    }

    pub fn into_result(self) -> Result<AssembledArtifact> {
        self.result
    }

    /// Trace rendered as `received → retrieved(Single) → …`
    pub fn trace_line(&self) -> String {
        self.trace
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Result of the generation loop
enum Generation {
    Verified(AssembledArtifact),
    Fallback { reason: String, attempts: usize },
}

/// Query pipeline: retrieve, then generate-and-verify or assemble, then deliver.
///
/// The engine only reads published index snapshots, so dropping a query future
/// at any point leaves nothing half-updated.
pub struct Engine {
    config: EngineConfig,
    handle: Arc<IndexHandle>,
    builder: IndexBuilder,
    retriever: Retriever,
    assembler: Assembler,
    prompts: PromptBuilder,
    verifier: Verifier,
    backend: Arc<dyn GenerativeBackend>,
}

impl Engine {
    pub fn new(config: EngineConfig, backend: Arc<dyn GenerativeBackend>) -> Result<Self> {
        Self::with_handle(config, Arc::new(IndexHandle::new()), backend)
    }

    /// Engine reading from an existing (possibly shared) index handle
    pub fn with_handle(
        config: EngineConfig,
        handle: Arc<IndexHandle>,
        backend: Arc<dyn GenerativeBackend>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: IndexBuilder::new(config.indexer.clone())?,
            retriever: Retriever::new(config.retriever.clone())?,
            assembler: Assembler::new(config.assembler.clone())?,
            prompts: PromptBuilder::new(
                config.bridge.prompt_candidates,
                config.assembler.default_filename.clone(),
            ),
            verifier: Verifier::new(),
            handle,
            backend,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn handle(&self) -> &Arc<IndexHandle> {
        &self.handle
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.handle.snapshot()
    }

    /// Build from explicit files and publish; returns the new version
    pub async fn index_sources(&self, files: Vec<SourceFile>) -> Result<(u64, IndexStats)> {
        let output = self.builder.build(files).await?;
        Ok(self.publish(output))
    }

    /// Build from every Python file under `root` and publish
    pub async fn index_dir(&self, root: impl AsRef<Path>) -> Result<(u64, IndexStats)> {
        let output = self.builder.build_dir(root).await?;
        Ok(self.publish(output))
    }

    /// Publish an already built index, e.g. one loaded from disk
    pub fn publish_index(&self, index: SignatureIndex) -> u64 {
        let stats = IndexStats {
            signatures: index.len(),
            shadowed: index.shadowed().len(),
            ..IndexStats::default()
        };
        self.publish(BuildOutput { index, stats }).0
    }

    fn publish(&self, output: BuildOutput) -> (u64, IndexStats) {
        let stats = output.stats.clone();
        let version = self.handle.publish(output);
        log::info!("Published index v{version}: {stats}");
        (version, stats)
    }

    /// Process one raw query line against the current snapshot
    pub async fn query(&self, line: &str) -> QueryOutcome {
        let snapshot = self.handle.snapshot();
        let mut trace = vec![LifecycleState::Received];

        let retrieval = self.retriever.retrieve_line(line, &snapshot.index);
        trace.push(LifecycleState::Retrieved {
            shape: match retrieval.candidates.len() {
                0 => RetrievalShape::Empty,
                1 => RetrievalShape::Single,
                _ => RetrievalShape::Multiple,
            },
        });

        let result = self.run(&retrieval, &snapshot, &mut trace).await;
        trace.push(if result.is_ok() {
            LifecycleState::Delivered
        } else {
            LifecycleState::Failed
        });

        match &result {
            Ok(artifact) => log::info!(
                "Delivered {} artifact for '{}' after {} attempt(s)",
                artifact.origin.as_str(),
                line.trim(),
                artifact.attempts
            ),
            Err(err) => log::warn!("Query '{}' failed: {err}", line.trim()),
        }

        QueryOutcome {
            query: line.to_string(),
            index_version: snapshot.version,
            trace,
            suggestions: retrieval.suggestions,
            result,
        }
    }

    async fn run(
        &self,
        retrieval: &Retrieval,
        snapshot: &IndexSnapshot,
        trace: &mut Vec<LifecycleState>,
    ) -> Result<AssembledArtifact> {
        retrieval.ensure_match()?;

        let mut tied: Option<Vec<String>> = None;
        if retrieval.is_ambiguous() {
            match self.config.bridge.ambiguity_policy {
                AmbiguityPolicy::Reject => return Err(retrieval.ambiguity_error().into()),
                AmbiguityPolicy::Report => {
                    let keys: Vec<String> = retrieval
                        .top_tied()
                        .iter()
                        .map(|c| c.signature.key().to_string())
                        .collect();
                    log::debug!("Ambiguous query, tied candidates: {}", keys.join(", "));
                    tied = Some(keys);
                }
            }
        }

        let (fallback_reason, attempts) =
            if self.config.bridge.enabled && self.backend.is_available() {
                match self.generate(retrieval, snapshot, trace).await? {
                    Generation::Verified(mut artifact) => {
                        if let Some(tied) = &tied {
                            let warning = ambiguity_warning(tied, &artifact.referenced_functions);
                            artifact.warnings.push(warning);
                        }
                        return Ok(artifact);
                    }
                    Generation::Fallback { reason, attempts } => (Some(reason), attempts),
                }
            } else {
                trace.push(LifecycleState::Assembling);
                (None, 0)
            };

        let mut verification: Option<Verification> = None;
        let ranked = self
            .assembler
            .assemble_ranked_checked(&retrieval.candidates, |draft| {
                let expected = BTreeSet::from([draft.signature.key()]);
                let verdict = self
                    .verifier
                    .verify(&draft.code_text, &snapshot.index, &expected)
                    .map_err(|err| err.to_string())?;
                match &verdict.rejection {
                    Some(rejection) => {
                        log::warn!(
                            "Deterministic output for {} rejected: {rejection}",
                            expected_label(&expected)
                        );
                        trace.push(LifecycleState::Rejected {
                            reason: rejection.to_string(),
                        });
                        Err(rejection.to_string())
                    }
                    None => {
                        verification = Some(verdict);
                        Ok(())
                    }
                }
            })
            .map_err(|err| match err {
                AssemblyError::NoAssemblableCandidate { errors }
                    if errors
                        .iter()
                        .any(|e| matches!(e, AssemblyError::DraftRejected { .. })) =>
                {
                    BridgeError::VerificationFailure(format!(
                        "no deterministic output verified: {}",
                        AssemblyError::NoAssemblableCandidate { errors }
                    ))
                }
                err => err.into(),
            })?;
        let verification = verification.ok_or_else(|| {
            BridgeError::VerificationFailure("assembled call was never verified".to_string())
        })?;
        if fallback_reason.is_some() {
            trace.push(LifecycleState::FallbackAssembled);
        }

        let mut artifact = ranked
            .draft
            .into_artifact(snapshot.version, &self.config.assembler.default_filename);
        artifact.attempts = attempts;
        for (candidate, err) in ranked.skipped {
            artifact.warnings.push(ArtifactWarning::SkippedCandidate {
                candidate,
                reason: err.to_string(),
            });
        }
        if let Some(reason) = fallback_reason {
            artifact.warnings.push(ArtifactWarning::Fallback { reason });
        }

        trace.push(LifecycleState::Verified);
        artifact.referenced_functions = verification.referenced;
        if let Some(tied) = &tied {
            let warning = ambiguity_warning(tied, &artifact.referenced_functions);
            artifact.warnings.push(warning);
        }
        artifact.verified = true;
        Ok(artifact)
    }

    /// Generate, verify, retry; `Fallback` when attempts run out or the backend fails
    async fn generate(
        &self,
        retrieval: &Retrieval,
        snapshot: &IndexSnapshot,
        trace: &mut Vec<LifecycleState>,
    ) -> Result<Generation> {
        let mut prompt = self
            .prompts
            .build(retrieval.query.raw.trim(), &retrieval.candidates);
        let expected: BTreeSet<SignatureKey> =
            prompt.signatures.iter().map(|sig| sig.key()).collect();
        let max_attempts = self.config.bridge.max_retries + 1;

        for attempt in 1..=max_attempts {
            trace.push(LifecycleState::Generating { attempt });

            let reply = match self.call_backend(&prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    if err.is_backend_unavailable() {
                        log::warn!("Backend {} unavailable: {err}", self.backend.name());
                    } else {
                        log::warn!("Backend {} failed: {err}", self.backend.name());
                    }
                    return Ok(Generation::Fallback {
                        reason: err.to_string(),
                        attempts: attempt,
                    });
                }
            };

            let response = parse_response(&reply);
            let verification = self
                .verifier
                .verify(&response.code, &snapshot.index, &expected)?;

            let Some(rejection) = verification.rejection.clone() else {
                trace.push(LifecycleState::Verified);
                return Ok(Generation::Verified(self.generated_artifact(
                    response.code,
                    response.reasoning,
                    response.filename,
                    verification,
                    attempt,
                    snapshot.version,
                )));
            };

            log::warn!("Attempt {attempt}/{max_attempts} rejected: {rejection}");
            trace.push(LifecycleState::Rejected {
                reason: rejection.to_string(),
            });

            if attempt < max_attempts {
                trace.push(LifecycleState::Retry {
                    attempt: attempt + 1,
                });
                prompt = self.amend(&prompt, &rejection, &verification);
            }
        }

        Ok(Generation::Fallback {
            reason: format!("generation rejected after {max_attempts} attempt(s)"),
            attempts: max_attempts,
        })
    }

    async fn call_backend(&self, prompt: &Prompt) -> Result<String> {
        let timeout_ms = self.config.bridge.timeout_ms;
        match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.backend.generate(prompt),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BridgeError::BackendTimeout(timeout_ms)),
        }
    }

    fn amend(&self, prompt: &Prompt, rejection: &Rejection, verification: &Verification) -> Prompt {
        self.prompts
            .amend(prompt, &rejection.to_string(), verification.invalid_calls())
    }

    fn generated_artifact(
        &self,
        code: String,
        reasoning: Option<String>,
        filename: Option<String>,
        verification: Verification,
        attempts: usize,
        index_version: u64,
    ) -> AssembledArtifact {
        AssembledArtifact {
            code_text: code,
            referenced_functions: verification.referenced,
            verified: true,
            origin: ArtifactOrigin::Generated,
            warnings: Vec::new(),
            attempts,
            index_version,
            reasoning: reasoning
                .unwrap_or_else(|| format!("Generated by {}", self.backend.name())),
            filename: filename.unwrap_or_else(|| self.config.assembler.default_filename.clone()),
        }
    }
}

/// The tied candidate actually used, and the others
fn ambiguity_warning(tied: &[String], referenced: &BTreeSet<SignatureKey>) -> ArtifactWarning {
    let chosen = tied
        .iter()
        .find(|key| referenced.iter().any(|r| r.to_string() == **key))
        .or_else(|| tied.first())
        .cloned()
        .unwrap_or_default();
    ArtifactWarning::Ambiguous {
        alternatives: tied.iter().filter(|k| **k != chosen).cloned().collect(),
        chosen,
    }
}

fn expected_label(expected: &BTreeSet<SignatureKey>) -> String {
    expected
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
