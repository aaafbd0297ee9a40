//! # Assembly Indexer
//!
//! Builds the immutable signature index that retrieval and verification read from.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware, *.py only)
//!     │      └─> (path, text) pairs
//!     │
//!     ├──> Signature Extractor (bounded worker pool, one parse per file)
//!     │      └─> signatures | per-file parse failure (skipped, recorded)
//!     │
//!     ├──> SignatureIndex (exact-name map + token map, ordered, fingerprinted)
//!     │
//!     └──> IndexHandle::publish (atomic swap, versioned)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use assembly_indexer::{IndexBuilder, IndexHandle, IndexerConfig};
//!
//! #[tokio::main]
//! async fn main() -> assembly_indexer::Result<()> {
//!     let builder = IndexBuilder::new(IndexerConfig::default())?;
//!     let output = builder.build_dir("/path/to/project").await?;
//!     println!("{}", output.stats);
//!
//!     let handle = IndexHandle::new();
//!     let version = handle.publish(output);
//!     println!("published v{version}");
//!     Ok(())
//! }
//! ```

mod builder;
mod config;
mod error;
mod handle;
mod index;
mod limits;
mod persist;
mod scanner;
mod stats;
mod tokenizer;

pub use builder::{read_sources, BuildOutput, IndexBuilder, SourceFile, SourceScan};
pub use config::IndexerConfig;
pub use error::{IndexerError, Result};
pub use handle::{IndexHandle, IndexSnapshot};
pub use index::{SignatureId, SignatureIndex};
pub use limits::{resolve_index_concurrency, IndexConcurrencySnapshot, INDEX_CONCURRENCY_ENV};
pub use persist::{index_path_for_root, load_index, save_index, INDEX_SCHEMA_VERSION};
pub use scanner::FileScanner;
pub use stats::{IndexStats, ParseFailure};
pub use tokenizer::split_name_tokens;
