//! # Assembly Bridge
//!
//! Query pipeline on top of the index: optional generation through a pluggable
//! backend, verification of every call against the index, bounded retry, and a
//! deterministic fallback.
//!
//! ## Flow
//!
//! ```text
//! query line
//!     │
//!     ├──> Retriever → ranked candidates (empty → NoMatch, tied → report/reject)
//!     │
//!     ├──> bridge enabled?
//!     │      ├─ yes: prompt(top N signatures) → backend (timeout)
//!     │      │        → parse reply → Verifier
//!     │      │            ├─ verified → deliver
//!     │      │            └─ rejected → amended prompt, retry (≤ max_retries)
//!     │      │        backend failure / timeout / retries exhausted → fallback
//!     │      └─ no: deterministic assembly
//!     │
//!     └──> Assembler over ranked candidates → Verifier → deliver
//! ```
//!
//! No path delivers `verified = true` for code containing a call that does not
//! resolve in the snapshot the query ran against.
//!
//! ## Example
//!
//! ```rust
//! use assembly_bridge::{DisabledBackend, Engine, EngineConfig};
//! use assembly_indexer::SourceFile;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> assembly_bridge::Result<()> {
//! let engine = Engine::new(EngineConfig::default(), Arc::new(DisabledBackend))?;
//! engine
//!     .index_sources(vec![SourceFile::new(
//!         "rockets.py",
//!         "def rocket_add(a: int, b: int) -> int:\n    return a + b\n",
//!     )])
//!     .await?;
//!
//! let artifact = engine.query("rocket_add 100 50").await.into_result()?;
//! assert!(artifact.verified);
//! assert_eq!(
//!     artifact.code_text,
//!     "from rockets import rocket_add\n\nresult = rocket_add(100, 50)\n"
//! );
//! # Ok(())
//! # }
//! ```

mod backend;
mod config;
mod engine;
mod error;
mod prompt;
mod response;
mod verifier;

pub use backend::{CommandBackend, DisabledBackend, GenerativeBackend, StubBackend, StubReply};
pub use config::{
    AmbiguityPolicy, BridgeConfig, EngineConfig, BACKEND_COMMAND_ENV, BACKEND_TIMEOUT_ENV,
    MAX_RETRIES_ENV,
};
pub use engine::{Engine, LifecycleState, QueryOutcome, RetrievalShape};
pub use error::{BridgeError, Result};
pub use prompt::{Prompt, PromptBuilder};
pub use response::{parse_response, GeneratedResponse, ResponseShape};
pub use verifier::{Rejection, Verification, Verifier};
