//! # Assembly Assembler
//!
//! Deterministic assembly of a call from a retrieved signature and literal query
//! arguments.
//!
//! ## Steps
//!
//! 1. The signature must be importable (module-level function or class) and must
//!    accept the argument count, otherwise the candidate fails with
//!    [`AssemblyError`] and the next ranked candidate is tried.
//! 2. Each argument is classified by the literal grammar (int, float, quoted string,
//!    bool, bare word) and coerced to a declared `int` / `float` / `str` / `bool`
//!    parameter type. A failed coercion is a [`TypeMismatchWarning`], never an error.
//! 3. The call is emitted with the true name and literal arguments only.
//!
//! ```text
//! rocket_add(a: int, b: int) + ["100", "50"]
//!     │
//!     └──> from rockets import rocket_add
//!
//!          result = rocket_add(100, 50)
//! ```

mod artifact;
mod assembler;
mod coerce;
mod config;
mod error;
mod literal;

pub use artifact::{ArtifactOrigin, ArtifactWarning, AssembledArtifact};
pub use assembler::{Assembler, AssemblyDraft, RankedAssembly};
pub use coerce::{coerce, ScalarType, TypeMismatchWarning};
pub use config::AssemblerConfig;
pub use error::{AssemblyError, Result};
pub use literal::{python_string, Literal};
