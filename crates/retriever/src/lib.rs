//! # Assembly Retriever
//!
//! Deterministic retrieval of indexed signatures by token set intersection.
//! No probabilistic ranking is involved: the same query over the same index always
//! yields the same ordered candidates.
//!
//! ```text
//! "rocket add 100 50"
//!     │
//!     ├──> Query::parse (quote aware)  → [rocket, add, 100, 50]
//!     ├──> prefix intersection        → k=1 {rocket_*}, k=2 {rocket_add}, k=3 ∅
//!     └──> rank                       → rocket_add (score 2, exact), args [100, 50]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use assembly_extractor::{FunctionSignature, Parameter, SignatureKind, SourceLocation, TypeHint};
//! use assembly_indexer::SignatureIndex;
//! use assembly_retriever::Retriever;
//!
//! let signature = FunctionSignature {
//!     name: "rocket_add".to_string(),
//!     parameters: vec![
//!         Parameter::positional("a", TypeHint::Declared("int".into())),
//!         Parameter::positional("b", TypeHint::Declared("int".into())),
//!     ],
//!     return_type: TypeHint::Declared("int".into()),
//!     location: SourceLocation { file_path: "rockets.py".into(), line: 1 },
//!     kind: SignatureKind::Function,
//!     scope: Vec::new(),
//!     module: "rockets".into(),
//! };
//! let index = SignatureIndex::from_signatures(vec![signature]);
//!
//! let retrieval = Retriever::default().retrieve_line("rocket_add 100 50", &index);
//! let top = retrieval.top().unwrap();
//! assert_eq!(top.signature.name, "rocket_add");
//! assert_eq!(top.arguments, vec!["100", "50"]);
//! ```

mod config;
mod error;
mod fuzzy;
mod query;
mod retriever;

pub use config::RetrieverConfig;
pub use error::{Result, RetrieverError};
pub use fuzzy::FuzzySuggester;
pub use query::{Query, QueryToken};
pub use retriever::{retrieve, Candidate, Retrieval, Retriever};
