use crate::config::RetrieverConfig;
use crate::error::{Result, RetrieverError};
use crate::fuzzy::FuzzySuggester;
use crate::query::Query;
use assembly_extractor::FunctionSignature;
use assembly_indexer::{SignatureId, SignatureIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// A signature that survived token intersection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: SignatureId,
    pub signature: FunctionSignature,
    /// Number of leading query tokens consumed as name tokens
    pub match_score: usize,
    /// Name equals the consumed tokens joined by `_` or by nothing
    pub exact: bool,
    /// Raw query tokens after the consumed name tokens
    pub arguments: Vec<String>,
}

impl Candidate {
    /// Ranking key shared by tied candidates
    fn tie_key(&self) -> (usize, bool) {
        (self.match_score, self.exact)
    }
}

/// Ordered candidates for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retrieval {
    pub query: Query,
    pub candidates: Vec<Candidate>,
    /// Near-miss names, filled only when `candidates` is empty
    pub suggestions: Vec<String>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Candidates sharing the top `(score, exact)` key
    pub fn top_tied(&self) -> &[Candidate] {
        let Some(top) = self.candidates.first() else {
            return &[];
        };
        let key = top.tie_key();
        let end = self
            .candidates
            .iter()
            .position(|c| c.tie_key() != key)
            .unwrap_or(self.candidates.len());
        &self.candidates[..end]
    }

    /// More than one candidate shares the top key
    pub fn is_ambiguous(&self) -> bool {
        self.top_tied().len() > 1
    }

    /// `NoMatch` when nothing survived intersection
    pub fn ensure_match(&self) -> Result<()> {
        if self.is_empty() {
            return Err(RetrieverError::NoMatch {
                query: self.query.to_string(),
                suggestions: self.suggestions.clone(),
            });
        }
        Ok(())
    }

    /// `AmbiguousMatch` listing the tied top candidates
    pub fn ambiguity_error(&self) -> RetrieverError {
        RetrieverError::AmbiguousMatch {
            query: self.query.to_string(),
            candidates: self
                .top_tied()
                .iter()
                .map(|c| c.signature.key().to_string())
                .collect(),
        }
    }
}

/// Deterministic token-intersection retriever
pub struct Retriever {
    config: RetrieverConfig,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            config: RetrieverConfig::default(),
        }
    }
}

impl Retriever {
    pub fn new(config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Lex and retrieve in one step
    pub fn retrieve_line(&self, line: &str, index: &SignatureIndex) -> Retrieval {
        self.retrieve(Query::parse(line), index)
    }

    pub fn retrieve(&self, query: Query, index: &SignatureIndex) -> Retrieval {
        let mut candidates = retrieve(&query, index);

        if candidates.len() > self.config.max_candidates {
            let tied = top_tied_len(&candidates);
            candidates.truncate(self.config.max_candidates.max(tied));
        }

        // The leading token is the only one that must be a name.
        let suggestions = match query.name_tokens().first() {
            Some(needle) if candidates.is_empty() => FuzzySuggester::new().suggest(
                needle,
                index.names(),
                self.config.suggestion_count,
            ),
            _ => Vec::new(),
        };

        log::debug!(
            "Query '{}' → {} candidates{}",
            query,
            candidates.len(),
            if suggestions.is_empty() {
                String::new()
            } else {
                format!(", suggestions: {}", suggestions.join(", "))
            }
        );

        Retrieval {
            query,
            candidates,
            suggestions,
        }
    }
}

fn top_tied_len(candidates: &[Candidate]) -> usize {
    let Some(top) = candidates.first() else {
        return 0;
    };
    candidates
        .iter()
        .take_while(|c| c.tie_key() == top.tie_key())
        .count()
}

/// Intersect every non-empty prefix of the name tokens and rank the survivors.
///
/// A signature's score is the largest prefix length `k` for which it is in the
/// intersection of the token-map entries of the first `k` tokens. Ordering: score
/// descending, exact name first, lower arity, name, source location.
pub fn retrieve(query: &Query, index: &SignatureIndex) -> Vec<Candidate> {
    let name_tokens = query.name_tokens();
    let mut scores: BTreeMap<SignatureId, usize> = BTreeMap::new();
    let mut survivors: Option<BTreeSet<SignatureId>> = None;

    for (position, token) in name_tokens.iter().enumerate() {
        let ids = index.token_ids(token);
        let next: BTreeSet<SignatureId> = match survivors {
            None => ids,
            Some(previous) => previous.intersection(&ids).copied().collect(),
        };
        if next.is_empty() {
            break;
        }
        for id in &next {
            scores.insert(*id, position + 1);
        }
        survivors = Some(next);
    }

    let mut candidates: Vec<Candidate> = scores
        .into_iter()
        .filter_map(|(id, score)| {
            let signature = index.get(id)?;
            let consumed = &name_tokens[..score];
            let lowered = signature.name.to_lowercase();
            let exact = lowered == consumed.join("_") || lowered == consumed.concat();
            Some(Candidate {
                id,
                signature: signature.clone(),
                match_score: score,
                exact,
                arguments: query.arguments_after(score),
            })
        })
        .collect();

    candidates.sort_by(compare_candidates);
    candidates
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.match_score
        .cmp(&a.match_score)
        .then_with(|| b.exact.cmp(&a.exact))
        .then_with(|| a.signature.arity().cmp(&b.signature.arity()))
        .then_with(|| a.signature.name.cmp(&b.signature.name))
        .then_with(|| a.signature.location.cmp(&b.signature.location))
}
