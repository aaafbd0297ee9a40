use crate::artifact::{ArtifactOrigin, ArtifactWarning, AssembledArtifact};
use crate::coerce::{coerce, ScalarType, TypeMismatchWarning};
use crate::config::{is_python_identifier, AssemblerConfig};
use crate::error::{AssemblyError, Result};
use crate::literal::Literal;
use assembly_extractor::{FunctionSignature, TypeHint};
use assembly_retriever::Candidate;
use std::collections::BTreeSet;

/// Call code built for one signature, before verification
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyDraft {
    pub signature: FunctionSignature,
    pub arguments: Vec<Literal>,
    pub code_text: String,
    pub warnings: Vec<TypeMismatchWarning>,
}

impl AssemblyDraft {
    /// Wrap as an unverified deterministic artifact
    pub fn into_artifact(self, index_version: u64, filename: &str) -> AssembledArtifact {
        let reasoning = format!(
            "Deterministic call to {} ({}) with {} argument(s)",
            self.signature.qualified_name(),
            self.signature.location,
            self.arguments.len()
        );
        AssembledArtifact {
            code_text: self.code_text,
            referenced_functions: BTreeSet::from([self.signature.key()]),
            verified: false,
            origin: ArtifactOrigin::Deterministic,
            warnings: self
                .warnings
                .into_iter()
                .map(ArtifactWarning::TypeMismatch)
                .collect(),
            attempts: 0,
            index_version,
            reasoning,
            filename: filename.to_string(),
        }
    }
}

/// First assemblable candidate in rank order
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAssembly {
    pub draft: AssemblyDraft,
    /// Position of the chosen candidate in the ranked list
    pub chosen: usize,
    /// Higher-ranked candidates that failed, with the reason
    pub skipped: Vec<(String, AssemblyError)>,
}

/// Deterministic call assembler.
///
/// Emits `from <module> import <name>` followed by `<binding> = <name>(<args>)`.
/// Arguments are always Python literals, so query text can never become code.
pub struct Assembler {
    config: AssemblerConfig,
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            config: AssemblerConfig::default(),
        }
    }
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn assemble_candidate(&self, candidate: &Candidate) -> Result<AssemblyDraft> {
        self.assemble(&candidate.signature, &candidate.arguments)
    }

    /// Build the call for `signature` with positional literal `arguments`
    pub fn assemble(
        &self,
        signature: &FunctionSignature,
        arguments: &[String],
    ) -> Result<AssemblyDraft> {
        if !signature.is_module_level() {
            return Err(AssemblyError::NotDirectlyCallable {
                qualified_name: signature.qualified_name(),
                kind: signature.kind,
            });
        }
        if !is_python_identifier(&signature.module) {
            return Err(AssemblyError::NotImportable {
                name: signature.name.clone(),
                module: signature.module.clone(),
            });
        }
        if !signature.accepts_arity(arguments.len()) {
            return Err(AssemblyError::ArityError {
                name: signature.name.clone(),
                expected: expected_arity(signature),
                got: arguments.len(),
            });
        }

        let positional: Vec<&TypeHint> = signature
            .positional_parameters()
            .map(|p| &p.type_hint)
            .collect();
        let names: Vec<&str> = signature
            .positional_parameters()
            .map(|p| p.name.as_str())
            .collect();

        let mut warnings = Vec::new();
        let mut literals = Vec::with_capacity(arguments.len());

        for (idx, raw) in arguments.iter().enumerate() {
            let literal = Literal::classify(raw);
            let target = positional.get(idx).and_then(|hint| ScalarType::from_hint(hint));

            let literal = match target {
                Some(target) => match coerce(&literal, target) {
                    Some(coerced) => coerced,
                    None => {
                        let warning = TypeMismatchWarning {
                            function: signature.name.clone(),
                            parameter: names
                                .get(idx)
                                .map(|n| (*n).to_string())
                                .unwrap_or_else(|| format!("#{idx}")),
                            expected: target,
                            found: literal.category().to_string(),
                            literal: raw.clone(),
                        };
                        log::debug!("{warning}");
                        warnings.push(warning);
                        literal
                    }
                },
                None => literal,
            };
            literals.push(literal);
        }

        let args = literals
            .iter()
            .map(Literal::to_python)
            .collect::<Vec<_>>()
            .join(", ");
        let mut binding = self.config.result_binding.clone();
        if binding == signature.name {
            binding.push_str("_value");
        }
        let code_text = format!(
            "from {module} import {name}\n\n{binding} = {name}({args})\n",
            module = signature.module,
            name = signature.name,
        );

        Ok(AssemblyDraft {
            signature: signature.clone(),
            arguments: literals,
            code_text,
            warnings,
        })
    }

    /// Try candidates in rank order; the first that assembles wins.
    ///
    /// Only candidate-local errors move on to the next candidate.
    pub fn assemble_ranked(&self, candidates: &[Candidate]) -> Result<RankedAssembly> {
        self.assemble_ranked_checked(candidates, |_| Ok(()))
    }

    /// Like [`Self::assemble_ranked`], but a draft must also pass `check`.
    ///
    /// A draft that `check` rejects is skipped with [`AssemblyError::DraftRejected`].
    pub fn assemble_ranked_checked<F>(
        &self,
        candidates: &[Candidate],
        mut check: F,
    ) -> Result<RankedAssembly>
    where
        F: FnMut(&AssemblyDraft) -> std::result::Result<(), String>,
    {
        let mut skipped: Vec<(String, AssemblyError)> = Vec::new();

        for (position, candidate) in candidates.iter().enumerate() {
            let assembled = self.assemble_candidate(candidate).and_then(|draft| {
                check(&draft).map(|()| draft).map_err(|reason| {
                    AssemblyError::DraftRejected {
                        name: candidate.signature.key().to_string(),
                        reason,
                    }
                })
            });
            match assembled {
                Ok(draft) => {
                    return Ok(RankedAssembly {
                        draft,
                        chosen: position,
                        skipped,
                    })
                }
                Err(err) if err.is_candidate_local() => {
                    log::debug!("Candidate {} skipped: {err}", candidate.signature.key());
                    skipped.push((candidate.signature.key().to_string(), err));
                }
                Err(err) => return Err(err),
            }
        }

        Err(AssemblyError::NoAssemblableCandidate {
            errors: skipped.into_iter().map(|(_, err)| err).collect(),
        })
    }
}

fn expected_arity(signature: &FunctionSignature) -> String {
    let positional = signature.positional_parameters().count();
    let required = signature
        .positional_parameters()
        .filter(|p| !p.has_default)
        .count();
    if signature.has_var_args() {
        format!("at least {required}")
    } else if required == positional {
        positional.to_string()
    } else {
        format!("{required} to {positional}")
    }
}
