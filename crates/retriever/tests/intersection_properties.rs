use assembly_extractor::{FunctionSignature, Parameter, SignatureKind, SourceLocation, TypeHint};
use assembly_indexer::{split_name_tokens, SignatureIndex};
use assembly_retriever::{retrieve, Query, Retriever};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;

const VOCABULARY: &[&str] = &["add", "rocket", "pipe", "spawn", "draw", "vector", "jump"];

fn signature(name: &str, arity: usize, line: usize) -> FunctionSignature {
    FunctionSignature {
        name: name.to_string(),
        parameters: (0..arity)
            .map(|i| Parameter::positional(format!("p{i}"), TypeHint::Unknown))
            .collect(),
        return_type: TypeHint::Unknown,
        location: SourceLocation {
            file_path: "lib.py".to_string(),
            line,
        },
        kind: SignatureKind::Function,
        scope: Vec::new(),
        module: "lib".to_string(),
    }
}

fn name_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::sample::select(VOCABULARY), 1..4)
        .prop_map(|parts| parts.join("_"))
}

/// Longest query prefix whose tokens all index the name
fn brute_force_score(name: &str, tokens: &[String]) -> usize {
    let name_tokens = split_name_tokens(name);
    tokens
        .iter()
        .take_while(|t| name_tokens.contains(t.as_str()))
        .count()
}

proptest! {
    #[test]
    fn scores_match_brute_force(
        names in proptest::collection::vec((name_strategy(), 0usize..4), 1..12),
        query in proptest::collection::vec(proptest::sample::select(VOCABULARY), 0..4),
    ) {
        let signatures: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(line, (name, arity))| signature(name, *arity, line + 1))
            .collect();
        let index = SignatureIndex::from_signatures(signatures);
        let query = Query::parse(&query.join(" "));
        let tokens = query.name_tokens();

        let found = retrieve(&query, &index);

        let mut expected: BTreeMap<usize, usize> = BTreeMap::new();
        for (id, sig) in index.signatures().iter().enumerate() {
            let score = brute_force_score(&sig.name, &tokens);
            if score > 0 {
                expected.insert(id, score);
            }
        }
        let actual: BTreeMap<usize, usize> =
            found.iter().map(|c| (c.id, c.match_score)).collect();
        prop_assert_eq!(actual, expected);

        for pair in found.windows(2) {
            prop_assert!(pair[0].match_score >= pair[1].match_score);
        }
    }

    #[test]
    fn retrieval_is_deterministic(
        names in proptest::collection::vec((name_strategy(), 0usize..4), 1..12),
        line in "[a-z_ ]{0,24}",
    ) {
        let signatures: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, (name, arity))| signature(name, *arity, i + 1))
            .collect();
        let mut reversed = signatures.clone();
        reversed.reverse();

        let retriever = Retriever::default();
        let a = retriever.retrieve_line(&line, &SignatureIndex::from_signatures(signatures));
        let b = retriever.retrieve_line(&line, &SignatureIndex::from_signatures(reversed));
        prop_assert_eq!(a, b);
    }
}

#[test]
fn add_returns_tied_candidates_lexicographically() {
    let index = SignatureIndex::from_signatures(vec![
        signature("add_vectors", 2, 1),
        signature("add_numbers", 2, 2),
    ]);
    let retrieval = Retriever::default().retrieve_line("add", &index);

    let names: Vec<_> = retrieval
        .candidates
        .iter()
        .map(|c| c.signature.name.as_str())
        .collect();
    assert_eq!(names, vec!["add_numbers", "add_vectors"]);
    assert!(retrieval.is_ambiguous());
}

#[test]
fn unknown_function_yields_no_candidates() {
    let index = SignatureIndex::from_signatures(vec![signature("rocket_add", 2, 1)]);
    let retrieval = Retriever::default().retrieve_line("zzz_not_a_function", &index);
    assert!(retrieval.is_empty());
    assert!(retrieval.ensure_match().is_err());
}
