use crate::literal::Literal;
use assembly_extractor::TypeHint;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static OPTIONAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:typing\.)?Optional\[\s*(.+?)\s*\]$").unwrap_or_else(|e| unreachable!("{e}"))
});

/// Scalar parameter types arguments can be coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Int,
    Float,
    Str,
    Bool,
}

impl ScalarType {
    /// Recognize `int`, `float`, `str`, `bool`, also wrapped in `Optional[...]`
    /// or unioned with `None`; any other annotation is not coerced.
    pub fn from_hint(hint: &TypeHint) -> Option<Self> {
        let declared = hint.declared()?.trim();
        let inner = optional_inner(declared).unwrap_or(declared);
        match inner.trim_matches(|c| c == '"' || c == '\'') {
            "int" | "builtins.int" => Some(Self::Int),
            "float" | "builtins.float" => Some(Self::Float),
            "str" | "builtins.str" => Some(Self::Str),
            "bool" | "builtins.bool" => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn optional_inner(declared: &str) -> Option<&str> {
    if let Some(caps) = OPTIONAL_RE.captures(declared) {
        return caps.get(1).map(|m| m.as_str());
    }
    // `int | None` / `None | int`
    let parts: Vec<&str> = declared.split('|').map(str::trim).collect();
    if parts.len() == 2 {
        return match (parts[0], parts[1]) {
            ("None", other) | (other, "None") => Some(other),
            _ => None,
        };
    }
    None
}

/// A literal that could not be converted to its parameter's declared type.
///
/// Non-fatal: the argument is emitted as classified and assembly continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMismatchWarning {
    pub function: String,
    pub parameter: String,
    pub expected: ScalarType,
    pub found: String,
    pub literal: String,
}

impl fmt::Display for TypeMismatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: argument {} for parameter '{}' is a {}, expected {}",
            self.function, self.literal, self.parameter, self.found, self.expected
        )
    }
}

/// Convert a literal to `target`, or `None` when the conversion is not lossless
pub fn coerce(literal: &Literal, target: ScalarType) -> Option<Literal> {
    match (target, literal) {
        (ScalarType::Int, Literal::Int(_))
        | (ScalarType::Float, Literal::Float(_))
        | (ScalarType::Bool, Literal::Bool(_)) => Some(literal.clone()),

        (ScalarType::Str, other) => Some(Literal::Str(other.text())),

        (ScalarType::Int, Literal::Str(text)) => match Literal::classify(text.trim()) {
            int @ Literal::Int(_) => Some(int),
            _ => None,
        },

        (ScalarType::Float, Literal::Int(digits)) => finite_float(digits),
        (ScalarType::Float, Literal::Str(text)) => match Literal::classify(text.trim()) {
            Literal::Float(value) => Some(Literal::Float(value)),
            Literal::Int(digits) => finite_float(&digits),
            _ => None,
        },

        (ScalarType::Bool, Literal::Int(digits)) => match digits.as_str() {
            "0" => Some(Literal::Bool(false)),
            "1" => Some(Literal::Bool(true)),
            _ => None,
        },
        (ScalarType::Bool, Literal::Str(text)) => match Literal::classify(text.trim()) {
            b @ Literal::Bool(_) => Some(b),
            _ => None,
        },

        _ => None,
    }
}

/// Integers too large for an `f64` stay ints (Python's `float()` would overflow)
fn finite_float(digits: &str) -> Option<Literal> {
    digits
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Literal::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hint(text: &str) -> TypeHint {
        TypeHint::Declared(text.to_string())
    }

    #[test]
    fn test_scalar_types_from_hints() {
        assert_eq!(ScalarType::from_hint(&hint("int")), Some(ScalarType::Int));
        assert_eq!(
            ScalarType::from_hint(&hint("Optional[float]")),
            Some(ScalarType::Float)
        );
        assert_eq!(
            ScalarType::from_hint(&hint("typing.Optional[ str ]")),
            Some(ScalarType::Str)
        );
        assert_eq!(ScalarType::from_hint(&hint("bool | None")), Some(ScalarType::Bool));
        assert_eq!(ScalarType::from_hint(&hint("None | int")), Some(ScalarType::Int));
        assert_eq!(ScalarType::from_hint(&hint("list[int]")), None);
        assert_eq!(ScalarType::from_hint(&hint("int | str")), None);
        assert_eq!(ScalarType::from_hint(&TypeHint::Unknown), None);
    }

    #[test]
    fn test_int_coercions() {
        let int = Literal::Int("100".to_string());
        assert_eq!(coerce(&int, ScalarType::Int), Some(int.clone()));
        assert_eq!(
            coerce(&Literal::Str("42".to_string()), ScalarType::Int),
            Some(Literal::Int("42".to_string()))
        );
        assert_eq!(coerce(&Literal::Float(1.5), ScalarType::Int), None);
        assert_eq!(coerce(&Literal::Bare("abc".to_string()), ScalarType::Int), None);
    }

    #[test]
    fn test_float_coercions() {
        assert_eq!(
            coerce(&Literal::Int("3".to_string()), ScalarType::Float),
            Some(Literal::Float(3.0))
        );
        assert_eq!(
            coerce(&Literal::Str("2.5".to_string()), ScalarType::Float),
            Some(Literal::Float(2.5))
        );
        assert_eq!(coerce(&Literal::Bool(true), ScalarType::Float), None);
    }

    #[test]
    fn test_float_overflow_is_a_mismatch() {
        let huge = format!("1{}", "0".repeat(400));
        assert_eq!(coerce(&Literal::Int(huge.clone()), ScalarType::Float), None);
        assert_eq!(coerce(&Literal::Str(huge), ScalarType::Float), None);
    }

    #[test]
    fn test_str_always_succeeds() {
        assert_eq!(
            coerce(&Literal::Int("7".to_string()), ScalarType::Str),
            Some(Literal::Str("7".to_string()))
        );
        assert_eq!(
            coerce(&Literal::Bare("hello".to_string()), ScalarType::Str),
            Some(Literal::Str("hello".to_string()))
        );
    }

    #[test]
    fn test_bool_coercions() {
        assert_eq!(
            coerce(&Literal::Int("1".to_string()), ScalarType::Bool),
            Some(Literal::Bool(true))
        );
        assert_eq!(
            coerce(&Literal::Str("false".to_string()), ScalarType::Bool),
            Some(Literal::Bool(false))
        );
        assert_eq!(coerce(&Literal::Int("2".to_string()), ScalarType::Bool), None);
    }
}
