//! # Assembly Extractor
//!
//! Grammar-aware extraction of verifiable function signatures from Python source,
//! plus the call-expression extractor used to verify generated code.
//!
//! ## Philosophy
//!
//! Every signature produced here corresponds to a declaration that exists in the
//! parsed syntax tree. Nothing is inferred from text matching, so comments and string
//! literals can never introduce a signature or a call.
//!
//! ## Architecture
//!
//! ```text
//! Source file (path, text)
//!     │
//!     ├──> Tree-sitter Parsing (tree-sitter-python) → AST
//!     │      └─> syntax errors → ExtractorError::Syntax (file is skipped by the indexer)
//!     │
//!     └──> Declaration Walk
//!            ├─> def at module level      → SignatureKind::Function
//!            ├─> def inside a class body  → SignatureKind::Method (receiver dropped)
//!            ├─> def inside a def         → SignatureKind::Nested
//!            └─> class                    → SignatureKind::Constructor (__init__ params)
//!
//! Generated text
//!     │
//!     └──> CallExtractor → ExtractedCall[] (name, positional, keywords, splats)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use assembly_extractor::{ExtractorConfig, SignatureExtractor};
//!
//! let mut extractor = SignatureExtractor::new(ExtractorConfig::default()).unwrap();
//! let code = "def rocket_add(a: int, b: int) -> int:\n    return a + b\n";
//!
//! let signatures = extractor.extract("rockets.py", code).unwrap();
//! assert_eq!(signatures[0].name, "rocket_add");
//! assert_eq!(signatures[0].arity(), 2);
//! ```

mod calls;
mod config;
mod error;
mod extractor;
mod language;
mod types;

pub use calls::{
    BindingKind, CallExtractor, CalleeShape, ExtractedCall, NameBinding, SourceSurvey,
};
pub use config::ExtractorConfig;
pub use error::{ExtractorError, Result};
pub use extractor::SignatureExtractor;
pub use language::{is_python_path, module_name_for_path, new_parser, python_language};
pub use types::{
    FunctionSignature, ParamKind, Parameter, SignatureKey, SignatureKind, SourceLocation,
    TypeHint,
};
