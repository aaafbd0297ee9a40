use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static FENCED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").unwrap_or_else(|e| unreachable!("{e}"))
});

static SAFE_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\.py$").unwrap_or_else(|e| unreachable!("{e}"))
});

/// Which shape the generator reply had
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Json,
    Fenced,
    Raw,
}

/// Code and metadata pulled out of a generator reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResponse {
    pub code: String,
    pub reasoning: Option<String>,
    /// Suggested filename; only plain `name.py` values are kept
    pub filename: Option<String>,
    pub shape: ResponseShape,
}

#[derive(Deserialize)]
struct JsonReply {
    code: String,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

/// Extract code from a reply: a JSON object with a `code` field, else the first
/// fenced block, else the raw text.
pub fn parse_response(reply: &str) -> GeneratedResponse {
    let trimmed = reply.trim();

    if let Some(json) = parse_json(trimmed) {
        return GeneratedResponse {
            code: strip_fences(&json.code),
            reasoning: json.reasoning.filter(|r| !r.trim().is_empty()),
            filename: json.filename.filter(|f| SAFE_FILENAME_RE.is_match(f)),
            shape: ResponseShape::Json,
        };
    }

    if let Some(caps) = FENCED_RE.captures(trimmed) {
        if let Some(body) = caps.get(1) {
            return GeneratedResponse {
                code: body.as_str().trim().to_string(),
                reasoning: None,
                filename: None,
                shape: ResponseShape::Fenced,
            };
        }
    }

    GeneratedResponse {
        code: trimmed.to_string(),
        reasoning: None,
        filename: None,
        shape: ResponseShape::Raw,
    }
}

fn parse_json(text: &str) -> Option<JsonReply> {
    if let Ok(reply) = serde_json::from_str::<JsonReply>(text) {
        return Some(reply);
    }
    // Chatty replies: try the outermost braces
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<JsonReply>(&text[start..=end]).ok()
}

fn strip_fences(code: &str) -> String {
    match FENCED_RE.captures(code).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => code.trim().to_string(),
    }
}
