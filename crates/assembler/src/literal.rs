use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static INT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap_or_else(|e| unreachable!("{e}")));

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+",
        r"|[0-9]+(?:\.[0-9]*)?[eE][+-]?[0-9]+",
        r"|\.[0-9]+[eE][+-]?[0-9]+)$"
    ))
    .unwrap_or_else(|e| unreachable!("{e}"))
});

/// A query argument classified by the universal literal grammar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// Decimal integer, kept as normalized digits (Python ints are unbounded)
    Int(String),
    Float(f64),
    /// Quoted string, quotes removed and escapes resolved
    Str(String),
    Bool(bool),
    /// Anything else; emitted as a string literal
    Bare(String),
}

impl Literal {
    /// Classify one raw query token
    pub fn classify(token: &str) -> Self {
        if let Some(content) = unquote(token) {
            return Self::Str(content);
        }
        if INT_RE.is_match(token) {
            return Self::Int(normalize_int(token));
        }
        if FLOAT_RE.is_match(token) {
            if let Ok(value) = token.parse::<f64>() {
                if value.is_finite() {
                    return Self::Float(value);
                }
            }
        }
        match token {
            "true" | "True" | "TRUE" => Self::Bool(true),
            "false" | "False" | "FALSE" => Self::Bool(false),
            _ => Self::Bare(token.to_string()),
        }
    }

    /// Grammar category name, used in warnings
    pub fn category(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bool(_) => "bool",
            Self::Bare(_) => "bare word",
        }
    }

    /// Render as Python source; never produces anything but a literal
    pub fn to_python(&self) -> String {
        match self {
            Self::Int(digits) => digits.clone(),
            Self::Float(value) => python_float(*value),
            Self::Str(text) | Self::Bare(text) => python_string(text),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
        }
    }

    /// Text form used when coercing to `str`
    pub fn text(&self) -> String {
        match self {
            Self::Int(digits) => digits.clone(),
            Self::Float(value) => python_float(*value),
            Self::Str(text) | Self::Bare(text) => text.clone(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_python())
    }
}

/// Strip matching quotes and resolve simple escapes; `None` when not quoted
fn unquote(token: &str) -> Option<String> {
    let mut chars = token.chars();
    let open = chars.next()?;
    if (open != '"' && open != '\'') || token.len() < 2 || !token.ends_with(open) {
        return None;
    }
    let inner = &token[1..token.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut iter = inner.chars();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Some(out)
}

/// Drop `+` and leading zeros (`007` is a syntax error in Python 3)
fn normalize_int(token: &str) -> String {
    let (sign, digits) = match token.as_bytes().first() {
        Some(b'-') => ("-", &token[1..]),
        Some(b'+') => ("", &token[1..]),
        _ => ("", token),
    };
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        format!("{sign}{trimmed}")
    }
}

pub(crate) fn python_float(value: f64) -> String {
    let text = format!("{value:?}");
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

/// Double-quoted Python string literal with every special character escaped
pub fn python_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integers() {
        assert_eq!(Literal::classify("100"), Literal::Int("100".to_string()));
        assert_eq!(Literal::classify("-7"), Literal::Int("-7".to_string()));
        assert_eq!(Literal::classify("+007"), Literal::Int("7".to_string()));
        assert_eq!(Literal::classify("-000"), Literal::Int("0".to_string()));
        assert_eq!(
            Literal::classify("123456789012345678901234567890").to_python(),
            "123456789012345678901234567890"
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(Literal::classify("1.5"), Literal::Float(1.5));
        assert_eq!(Literal::classify(".5"), Literal::Float(0.5));
        assert_eq!(Literal::classify("3."), Literal::Float(3.0));
        assert_eq!(Literal::classify("1e3"), Literal::Float(1000.0));
        assert_eq!(Literal::classify("3.").to_python(), "3.0");
        assert_eq!(Literal::classify("1e3").to_python(), "1000.0");
        assert_eq!(Literal::classify("1e400"), Literal::Bare("1e400".to_string()));
    }

    #[test]
    fn test_quoted_strings() {
        assert_eq!(
            Literal::classify("\"hello world\""),
            Literal::Str("hello world".to_string())
        );
        assert_eq!(Literal::classify("'x'"), Literal::Str("x".to_string()));
        assert_eq!(Literal::classify(r#""a \" b""#), Literal::Str("a \" b".to_string()));
        assert_eq!(Literal::classify("\"\""), Literal::Str(String::new()));
        // Lone or mismatched quotes are bare words
        assert_eq!(Literal::classify("\""), Literal::Bare("\"".to_string()));
        assert_eq!(Literal::classify("\"abc'"), Literal::Bare("\"abc'".to_string()));
    }

    #[test]
    fn test_booleans_and_bare_words() {
        assert_eq!(Literal::classify("true"), Literal::Bool(true));
        assert_eq!(Literal::classify("False"), Literal::Bool(false));
        assert_eq!(Literal::classify("yes"), Literal::Bare("yes".to_string()));
        assert_eq!(Literal::classify("yes").to_python(), "\"yes\"");
    }

    #[test]
    fn test_bare_words_cannot_inject_code() {
        let hostile = Literal::classify("__import__('os').system('rm')");
        assert_eq!(hostile.category(), "bare word");
        assert_eq!(
            hostile.to_python(),
            "\"__import__('os').system('rm')\""
        );

        let quoted = Literal::classify(r#""x\") or print(\"""#);
        assert!(quoted.to_python().starts_with('"'));
        assert!(quoted.to_python().ends_with('"'));
        assert_eq!(python_string("a\"b\\c\n"), r#""a\"b\\c\n""#);
    }
}
