use crate::calls::{CalleeShape, ExtractedCall};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type annotation, or `Unknown` when the source has none
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeHint {
    Declared(String),
    Unknown,
}

impl TypeHint {
    /// Build from optional annotation text
    pub fn from_annotation(text: Option<&str>) -> Self {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Self::Declared(text.to_string()),
            None => Self::Unknown,
        }
    }

    #[must_use]
    pub fn declared(&self) -> Option<&str> {
        match self {
            Self::Declared(text) => Some(text.as_str()),
            Self::Unknown => None,
        }
    }

}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared(text) => f.write_str(text),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// How a parameter binds arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Bound by position or keyword
    Positional,
    /// Declared after `*` / `*args`; bound by keyword only
    KeywordOnly,
    /// `*args`
    VarArgs,
    /// `**kwargs`
    KwArgs,
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_hint: TypeHint,
    pub kind: ParamKind,
    /// The declaration supplies a default value
    #[serde(default)]
    pub has_default: bool,
}

impl Parameter {
    pub fn positional(name: impl Into<String>, type_hint: TypeHint) -> Self {
        Self {
            name: name.into(),
            type_hint,
            kind: ParamKind::Positional,
            has_default: false,
        }
    }

    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    /// Counted towards arity (variadic markers are not)
    #[must_use]
    pub const fn is_named_slot(&self) -> bool {
        matches!(self.kind, ParamKind::Positional | ParamKind::KeywordOnly)
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.is_named_slot() && !self.has_default
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::VarArgs => f.write_str("*")?,
            ParamKind::KwArgs => f.write_str("**")?,
            _ => {}
        }
        f.write_str(&self.name)?;
        if let TypeHint::Declared(ty) = &self.type_hint {
            write!(f, ": {ty}")?;
        }
        if self.has_default {
            f.write_str(" = ...")?;
        }
        Ok(())
    }
}

/// Declaration shape the signature was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureKind {
    /// Module-level `def`
    Function,
    /// `def` directly inside a class body (receiver dropped)
    Method,
    /// A class, callable through its `__init__`
    Constructor,
    /// `def` inside another function
    Nested,
}

impl SignatureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Nested => "nested",
        }
    }
}

/// Where a declaration lives
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file_path: String,
    /// 1-indexed line of the `def` / `class` keyword
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_path, self.line)
    }
}

/// Identity of a signature inside an index: overloads differ by arity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignatureKey {
    pub name: String,
    pub arity: usize,
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A verifiable function signature extracted from a syntax tree.
///
/// Signatures are created once during indexing and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeHint,
    pub location: SourceLocation,
    pub kind: SignatureKind,
    /// Enclosing class/function names, outermost first
    #[serde(default)]
    pub scope: Vec<String>,
    /// File stem, used for import lines
    pub module: String,
}

impl FunctionSignature {
    /// Number of named parameter slots (excludes `*args` / `**kwargs`)
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.iter().filter(|p| p.is_named_slot()).count()
    }

    /// Number of parameters without defaults
    #[must_use]
    pub fn required_arity(&self) -> usize {
        self.parameters.iter().filter(|p| p.is_required()).count()
    }

    #[must_use]
    pub fn has_var_args(&self) -> bool {
        self.parameters.iter().any(|p| p.kind == ParamKind::VarArgs)
    }

    #[must_use]
    pub fn has_kw_args(&self) -> bool {
        self.parameters.iter().any(|p| p.kind == ParamKind::KwArgs)
    }

    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.has_var_args() || self.has_kw_args()
    }

    #[must_use]
    pub fn key(&self) -> SignatureKey {
        SignatureKey {
            name: self.name.clone(),
            arity: self.arity(),
        }
    }

    /// Importable from its module with a plain `from <module> import <name>`
    #[must_use]
    pub fn is_module_level(&self) -> bool {
        self.scope.is_empty()
            && matches!(self.kind, SignatureKind::Function | SignatureKind::Constructor)
    }

    /// Positional parameters in declaration order
    pub fn positional_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.kind == ParamKind::Positional)
    }

    /// Check whether `n` positional arguments bind cleanly
    #[must_use]
    pub fn accepts_arity(&self, n: usize) -> bool {
        self.accepts_shape(n, &[], false)
    }

    /// Check whether an extracted call binds cleanly against this signature
    #[must_use]
    pub fn accepts(&self, call: &ExtractedCall) -> bool {
        call.name == self.name
            && self.reachable_through(call.shape)
            && self.accepts_shape(call.positional, &call.keywords, call.has_splat)
    }

    /// Free names reach module-level functions and classes; attributes reach methods
    #[must_use]
    pub fn reachable_through(&self, shape: CalleeShape) -> bool {
        match shape {
            CalleeShape::Name => self.is_module_level(),
            CalleeShape::Attribute => self.kind == SignatureKind::Method,
            CalleeShape::Other => false,
        }
    }

    fn accepts_shape(&self, positional: usize, keywords: &[String], has_splat: bool) -> bool {
        if has_splat {
            // Unpacked arguments cannot be counted statically.
            return self.is_variadic();
        }

        let positional_params: Vec<&Parameter> = self.positional_parameters().collect();
        if positional > positional_params.len() && !self.has_var_args() {
            return false;
        }

        for (idx, keyword) in keywords.iter().enumerate() {
            if keywords[..idx].contains(keyword) {
                return false;
            }
            let slot = self
                .parameters
                .iter()
                .position(|p| p.is_named_slot() && &p.name == keyword);
            match slot {
                Some(_) => {
                    let already_bound = positional_params
                        .iter()
                        .take(positional)
                        .any(|p| &p.name == keyword);
                    if already_bound {
                        return false;
                    }
                }
                None if self.has_kw_args() => {}
                None => return false,
            }
        }

        let bound_by_keyword = |name: &str| keywords.iter().any(|k| k == name);
        let positional_ok = positional_params
            .iter()
            .skip(positional)
            .all(|p| p.has_default || bound_by_keyword(&p.name));
        let keyword_only_ok = self
            .parameters
            .iter()
            .filter(|p| p.kind == ParamKind::KeywordOnly)
            .all(|p| p.has_default || bound_by_keyword(&p.name));

        positional_ok && keyword_only_ok
    }

    /// Python-style rendering, e.g. `def rocket_add(a: int, b: int) -> int`
    #[must_use]
    pub fn render(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = match self.kind {
            SignatureKind::Constructor => format!("class {}({params})", self.name),
            _ => format!("def {}({params})", self.name),
        };
        if let TypeHint::Declared(ret) = &self.return_type {
            out.push_str(" -> ");
            out.push_str(ret);
        }
        out
    }

    /// Name qualified by its enclosing scopes, e.g. `Bird.jump`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            return self.name.clone();
        }
        format!("{}.{}", self.scope.join("."), self.name)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.render(), self.location)
    }
}
