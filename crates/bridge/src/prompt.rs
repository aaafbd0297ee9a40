use assembly_extractor::FunctionSignature;
use assembly_retriever::Candidate;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A generation request: prompt text plus the signatures it exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub query: String,
    pub text: String,
    pub signatures: Vec<FunctionSignature>,
}

/// Builds prompts that expose only the top-ranked candidate signatures
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_candidates: usize,
    default_filename: String,
}

impl PromptBuilder {
    pub fn new(max_candidates: usize, default_filename: impl Into<String>) -> Self {
        Self {
            max_candidates: max_candidates.max(1),
            default_filename: default_filename.into(),
        }
    }

    /// First prompt for `query` over the ranked `candidates`
    pub fn build(&self, query: &str, candidates: &[Candidate]) -> Prompt {
        let signatures: Vec<FunctionSignature> = candidates
            .iter()
            .take(self.max_candidates)
            .map(|c| c.signature.clone())
            .collect();
        let text = self.render(query, &signatures, None);
        Prompt {
            query: query.to_string(),
            text,
            signatures,
        }
    }

    /// Retry prompt: same signatures, plus the reason the last reply was rejected
    pub fn amend(&self, previous: &Prompt, rejection: &str, invalid_calls: &[String]) -> Prompt {
        let mut feedback = format!("Your previous answer was rejected: {rejection}\n");
        if !invalid_calls.is_empty() {
            let _ = writeln!(
                feedback,
                "Fix these calls, imports or bindings: {}",
                invalid_calls.join(", ")
            );
        }
        feedback.push_str("Call only the functions listed above, with matching arguments.\n");
        feedback.push_str("Import them only as shown and never reassign their names.\n");

        Prompt {
            query: previous.query.clone(),
            text: self.render(&previous.query, &previous.signatures, Some(&feedback)),
            signatures: previous.signatures.clone(),
        }
    }

    fn render(
        &self,
        query: &str,
        signatures: &[FunctionSignature],
        feedback: Option<&str>,
    ) -> String {
        let mut text = String::new();
        text.push_str(
            "You are a code assembler, not a code generator.\n\
             Use ONLY the functions listed below. Do not define new functions.\n",
        );
        let _ = writeln!(
            text,
            "Reply with JSON: {{\"reasoning\": \"...\", \"code\": \"...\", \
             \"filename\": \"{}\"}}\n",
            self.default_filename
        );

        text.push_str("Imports:\n");
        for (module, names) in import_groups(signatures) {
            let _ = writeln!(text, "from {module} import {}", names.join(", "));
        }

        text.push_str("\nAvailable functions:\n");
        for signature in signatures {
            let _ = writeln!(
                text,
                "{}  # {} at {}",
                signature.render(),
                signature.qualified_name(),
                signature.location
            );
        }

        let _ = write!(text, "\nTask: {query}\n");
        if let Some(feedback) = feedback {
            text.push('\n');
            text.push_str(feedback);
        }
        text
    }
}

/// Importable names grouped by module; methods import their outermost class
fn import_groups(signatures: &[FunctionSignature]) -> BTreeMap<&str, Vec<&str>> {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for signature in signatures {
        let name = signature
            .scope
            .first()
            .map(String::as_str)
            .unwrap_or(signature.name.as_str());
        let names = groups.entry(signature.module.as_str()).or_default();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    groups
}
