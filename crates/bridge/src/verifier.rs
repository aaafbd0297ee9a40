use crate::error::Result;
use assembly_extractor::{
    BindingKind, CallExtractor, CalleeShape, ExtractorError, FunctionSignature, NameBinding,
    SignatureKey, SourceSurvey,
};
use assembly_indexer::SignatureIndex;
use std::collections::BTreeSet;
use std::fmt;

/// Why a piece of code was not verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The code does not parse
    Syntax { line: usize, column: usize },
    /// The parser produced no tree
    Unparseable(String),
    /// Calls with no matching signature in the index
    Unresolved(Vec<String>),
    /// Imports other than `from <module> import <name>` of an indexed module-level name
    ForeignImport(Vec<String>),
    /// A called name is bound by the code itself, so the call may not reach the index
    Rebound(Vec<String>),
    /// Every call resolved, but none targets an expected signature
    NoExpectedCall,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { line, column } => {
                write!(f, "syntax error at line {line}, column {column}")
            }
            Self::Unparseable(reason) => write!(f, "unparseable: {reason}"),
            Self::Unresolved(calls) => write!(f, "unresolved calls: {}", calls.join(", ")),
            Self::ForeignImport(imports) => {
                write!(f, "imports outside the index: {}", imports.join(", "))
            }
            Self::Rebound(bindings) => {
                write!(f, "called names rebound: {}", bindings.join(", "))
            }
            Self::NoExpectedCall => f.write_str("no call to any of the provided functions"),
        }
    }
}

/// Result of checking one piece of code against an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Signatures the resolved calls bound to
    pub referenced: BTreeSet<SignatureKey>,
    pub calls: usize,
    pub rejection: Option<Rejection>,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        self.rejection.is_none()
    }

    /// Offending calls, imports or bindings, for retry prompts
    pub fn invalid_calls(&self) -> &[String] {
        match &self.rejection {
            Some(
                Rejection::Unresolved(items)
                | Rejection::ForeignImport(items)
                | Rejection::Rebound(items),
            ) => items,
            _ => &[],
        }
    }
}

/// Cross-checks generated code against the signature index.
///
/// Verified means: the code parses, every call expression resolves by name and
/// argument shape, and at least one call binds to an expected signature.
/// The only imports allowed are `from <module> import <name>` of indexed
/// module-level names, and no called name may be bound any other way.
#[derive(Debug, Default, Clone, Copy)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Self
    }

    pub fn verify(
        &self,
        code: &str,
        index: &SignatureIndex,
        expected: &BTreeSet<SignatureKey>,
    ) -> Result<Verification> {
        let mut extractor = CallExtractor::new()?;
        let survey = match extractor.survey(code) {
            Ok(survey) => survey,
            Err(ExtractorError::Syntax { line, column, .. }) => {
                return Ok(Verification {
                    referenced: BTreeSet::new(),
                    calls: 0,
                    rejection: Some(Rejection::Syntax { line, column }),
                });
            }
            Err(ExtractorError::ParseError { reason, .. }) => {
                return Ok(Verification {
                    referenced: BTreeSet::new(),
                    calls: 0,
                    rejection: Some(Rejection::Unparseable(reason)),
                });
            }
            Err(err) => return Err(err.into()),
        };
        Ok(check_survey(&survey, index, expected))
    }
}

fn check_survey(
    survey: &SourceSurvey,
    index: &SignatureIndex,
    expected: &BTreeSet<SignatureKey>,
) -> Verification {
    let mut referenced = BTreeSet::new();
    let mut unresolved = Vec::new();
    let mut rebound = Vec::new();

    for call in &survey.calls {
        let Some(signature) = index.resolve(call) else {
            log::debug!("Unresolved call on line {}: {call}", call.line);
            push_unique(&mut unresolved, call.to_string());
            continue;
        };
        referenced.insert(signature.key());
        for binding in survey.bindings.iter().filter(|b| b.binds(&call.name)) {
            if !imports_signature(binding, call.shape, signature) {
                log::debug!("Called name {} is rebound: {binding}", call.name);
                push_unique(&mut rebound, binding.to_string());
            }
        }
    }

    let mut foreign = Vec::new();
    for binding in &survey.bindings {
        let indexed = match &binding.kind {
            BindingKind::FromImport { module } => index
                .by_name(&binding.name)
                .any(|s| s.is_module_level() && &s.module == module),
            BindingKind::Import => false,
            _ => continue,
        };
        if !indexed {
            push_unique(&mut foreign, binding.to_string());
        }
    }

    let rejection = if !unresolved.is_empty() {
        Some(Rejection::Unresolved(unresolved))
    } else if !foreign.is_empty() {
        Some(Rejection::ForeignImport(foreign))
    } else if !rebound.is_empty() {
        Some(Rejection::Rebound(rebound))
    } else if referenced.is_disjoint(expected) {
        Some(Rejection::NoExpectedCall)
    } else {
        None
    };

    Verification {
        referenced,
        calls: survey.calls.len(),
        rejection,
    }
}

/// A plain from-import of the resolved signature is the one binding a bare
/// call may go through
fn imports_signature(
    binding: &NameBinding,
    shape: CalleeShape,
    signature: &FunctionSignature,
) -> bool {
    match &binding.kind {
        BindingKind::FromImport { module } => {
            shape == CalleeShape::Name && *module == signature.module
        }
        _ => false,
    }
}

fn push_unique(items: &mut Vec<String>, text: String) {
    if !items.contains(&text) {
        items.push(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assembly_extractor::{ExtractorConfig, SignatureExtractor};
    use pretty_assertions::assert_eq;

    const LIB: &str = r#"
class Bird:
    def __init__(self, x, y):
        pass

    def jump(self):
        pass


def rocket_add(a: int, b: int) -> int:
    return a + b
"#;

    fn index() -> SignatureIndex {
        let mut extractor = SignatureExtractor::new(ExtractorConfig::default()).unwrap();
        SignatureIndex::from_signatures(extractor.extract("game_lib.py", LIB).unwrap())
    }

    fn key(name: &str, arity: usize) -> SignatureKey {
        SignatureKey {
            name: name.to_string(),
            arity,
        }
    }

    #[test]
    fn test_verifies_resolved_code() {
        let expected = BTreeSet::from([key("rocket_add", 2)]);
        let verdict = Verifier::new()
            .verify(
                "from game_lib import rocket_add\n\nresult = rocket_add(100, b=50)\n",
                &index(),
                &expected,
            )
            .unwrap();
        assert!(verdict.is_verified());
        assert_eq!(verdict.referenced, expected);
        assert_eq!(verdict.calls, 1);
    }

    #[test]
    fn test_methods_and_constructors_resolve() {
        let expected = BTreeSet::from([key("Bird", 2)]);
        let verdict = Verifier::new()
            .verify("bird = Bird(50, 300)\nbird.jump()\n", &index(), &expected)
            .unwrap();
        assert!(verdict.is_verified());
        assert_eq!(
            verdict.referenced,
            BTreeSet::from([key("Bird", 2), key("jump", 0)])
        );
    }

    #[test]
    fn test_any_unresolved_call_rejects() {
        let expected = BTreeSet::from([key("rocket_add", 2)]);
        let verdict = Verifier::new()
            .verify(
                "result = rocket_add(1, 2)\nprint(result)\nrocket_add(1)\n",
                &index(),
                &expected,
            )
            .unwrap();
        assert!(!verdict.is_verified());
        assert_eq!(
            verdict.invalid_calls(),
            ["print/1 (line 2)", "rocket_add/1 (line 3)"]
        );
    }

    #[test]
    fn test_syntax_errors_reject() {
        let verdict = Verifier::new()
            .verify("result = rocket_add(1, 2", &index(), &BTreeSet::new())
            .unwrap();
        assert!(matches!(verdict.rejection, Some(Rejection::Syntax { .. })));
    }

    #[test]
    fn test_requires_a_call_to_an_expected_signature() {
        let expected = BTreeSet::from([key("rocket_add", 2)]);
        let verdict = Verifier::new()
            .verify("Bird(1, 2)\n", &index(), &expected)
            .unwrap();
        assert_eq!(verdict.rejection, Some(Rejection::NoExpectedCall));

        let verdict = Verifier::new()
            .verify("# rocket_add(1, 2)\nx = 'rocket_add(1, 2)'\n", &index(), &expected)
            .unwrap();
        assert_eq!(verdict.calls, 0);
        assert_eq!(verdict.rejection, Some(Rejection::NoExpectedCall));
    }

    fn rejection_of(code: &str) -> Option<Rejection> {
        let expected = BTreeSet::from([key("rocket_add", 2)]);
        Verifier::new()
            .verify(code, &index(), &expected)
            .unwrap()
            .rejection
    }

    #[test]
    fn test_assigned_callee_is_rebound() {
        assert_eq!(
            rejection_of("rocket_add = exec\nrocket_add(\"import os\", 1)\n"),
            Some(Rejection::Rebound(vec![
                "rocket_add (assigned, line 1)".to_string()
            ]))
        );
        assert_eq!(
            rejection_of(
                "from game_lib import rocket_add\n\n\
                 def rocket_add(a, b):\n    pass\n\n\
                 rocket_add(1, 2)\n"
            ),
            Some(Rejection::Rebound(vec![
                "rocket_add (defined, line 3)".to_string()
            ]))
        );
    }

    #[test]
    fn test_aliased_imports_are_foreign() {
        for code in [
            "from os import system as rocket_add\nrocket_add(\"ls\", 1)\n",
            "from subprocess import call as rocket_add\nrocket_add(\"ls\", 1)\n",
            "import os\nfrom game_lib import rocket_add\nrocket_add(1, 2)\n",
            "from game_lib import *\nrocket_add(1, 2)\n",
        ] {
            assert!(
                matches!(rejection_of(code), Some(Rejection::ForeignImport(_))),
                "{code}"
            );
        }
        assert_eq!(
            rejection_of("from os import rocket_add\nrocket_add(1, 2)\n"),
            Some(Rejection::ForeignImport(vec![
                "rocket_add (imported from os, line 1)".to_string()
            ]))
        );
    }

    #[test]
    fn test_methods_need_an_attribute_callee() {
        let expected = BTreeSet::from([key("jump", 0)]);
        let verdict = Verifier::new()
            .verify("from game_lib import jump\njump()\n", &index(), &expected)
            .unwrap();
        assert_eq!(
            verdict.rejection,
            Some(Rejection::Unresolved(vec!["jump/0 (line 2)".to_string()]))
        );
    }

    #[test]
    fn test_rebinding_is_reported_for_retry() {
        let expected = BTreeSet::from([key("rocket_add", 2)]);
        let verdict = Verifier::new()
            .verify("for rocket_add in []:\n    pass\nrocket_add(1, 2)\n", &index(), &expected)
            .unwrap();
        assert_eq!(verdict.invalid_calls(), ["rocket_add (assigned, line 1)"]);
        assert_eq!(
            verdict.rejection.unwrap().to_string(),
            "called names rebound: rocket_add (assigned, line 1)"
        );
    }
}
