use crate::tokenizer::split_name_tokens;
use assembly_extractor::{ExtractedCall, FunctionSignature, SignatureKey};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Dense position of a signature inside one [`SignatureIndex`]
pub type SignatureId = usize;

/// Immutable snapshot of every known signature.
///
/// Two lookup structures share one signature table:
/// - exact-name map: `name → {ids}` (covers overload-by-arity)
/// - token map: `sub-token → {ids}` (see [`split_name_tokens`])
///
/// Every id reachable from the token map is also reachable from the name map.
/// All maps are ordered, so iteration order never depends on hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureIndex {
    signatures: Vec<FunctionSignature>,
    by_name: BTreeMap<String, BTreeSet<SignatureId>>,
    by_token: BTreeMap<String, BTreeSet<SignatureId>>,
    shadowed: Vec<FunctionSignature>,
    fingerprint: String,
}

impl Default for SignatureIndex {
    fn default() -> Self {
        Self::from_signatures(Vec::new())
    }
}

impl SignatureIndex {
    /// Build an index from extractor output in any order.
    ///
    /// Signatures are ordered by (file path, line, name). For a duplicate
    /// `(name, arity)` the first in that order wins; later ones are kept aside as
    /// shadowed and never resolve.
    pub fn from_signatures(mut signatures: Vec<FunctionSignature>) -> Self {
        signatures.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.cmp(b))
        });

        let mut seen: BTreeSet<SignatureKey> = BTreeSet::new();
        let mut kept = Vec::with_capacity(signatures.len());
        let mut shadowed = Vec::new();

        for signature in signatures {
            if seen.insert(signature.key()) {
                kept.push(signature);
            } else {
                log::debug!(
                    "Shadowed duplicate {} at {}",
                    signature.key(),
                    signature.location
                );
                shadowed.push(signature);
            }
        }

        let mut by_name: BTreeMap<String, BTreeSet<SignatureId>> = BTreeMap::new();
        let mut by_token: BTreeMap<String, BTreeSet<SignatureId>> = BTreeMap::new();

        for (id, signature) in kept.iter().enumerate() {
            by_name.entry(signature.name.clone()).or_default().insert(id);
            for token in split_name_tokens(&signature.name) {
                by_token.entry(token).or_default().insert(id);
            }
        }

        let fingerprint = fingerprint(&kept);

        Self {
            signatures: kept,
            by_name,
            by_token,
            shadowed,
            fingerprint,
        }
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn get(&self, id: SignatureId) -> Option<&FunctionSignature> {
        self.signatures.get(id)
    }

    /// All resolvable signatures in index order
    pub fn signatures(&self) -> &[FunctionSignature] {
        &self.signatures
    }

    /// Duplicates that lost to an earlier `(name, arity)`
    pub fn shadowed(&self) -> &[FunctionSignature] {
        &self.shadowed
    }

    /// Every signature the index was built from, shadowed ones included
    pub fn source_signatures(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.signatures.iter().chain(self.shadowed.iter())
    }

    /// Hex SHA-256 over the ordered resolvable signature set
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Exact-name lookup (case-sensitive, as Python is)
    pub fn by_name(&self, name: &str) -> impl Iterator<Item = &FunctionSignature> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.signatures.get(*id))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Ids indexed under a token; unknown tokens yield the empty set
    pub fn token_ids(&self, token: &str) -> BTreeSet<SignatureId> {
        self.by_token
            .get(&token.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Every indexed token in order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.by_token.keys().map(String::as_str)
    }

    /// Every distinct declared name in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// First signature (in index order) that accepts the call's name and shape
    pub fn resolve(&self, call: &ExtractedCall) -> Option<&FunctionSignature> {
        if !call.is_resolvable() {
            return None;
        }
        self.by_name(&call.name).find(|signature| signature.accepts(call))
    }
}

fn fingerprint(signatures: &[FunctionSignature]) -> String {
    let mut hasher = Sha256::new();
    for signature in signatures {
        hasher.update(signature.kind.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(signature.module.as_bytes());
        hasher.update([0]);
        hasher.update(signature.qualified_name().as_bytes());
        hasher.update([0]);
        hasher.update(signature.render().as_bytes());
        hasher.update([0]);
        hasher.update(signature.location.to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
