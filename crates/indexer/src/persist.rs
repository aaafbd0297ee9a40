use crate::error::{IndexerError, Result};
use crate::index::SignatureIndex;
use assembly_extractor::FunctionSignature;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const INDEX_SCHEMA_VERSION: u32 = 1;

const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    schema_version: u32,
    fingerprint: String,
    signatures: Vec<FunctionSignature>,
}

/// Default location of the persisted index under a project root
pub fn index_path_for_root(root: &Path) -> PathBuf {
    root.join(".assembly").join(INDEX_FILE_NAME)
}

/// Write the index atomically (temp file + rename).
///
/// Shadowed signatures are stored too, so loading rebuilds the exact same maps.
pub async fn save_index(path: &Path, index: &SignatureIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let persisted = PersistedIndex {
        schema_version: INDEX_SCHEMA_VERSION,
        fingerprint: index.fingerprint().to_string(),
        signatures: index.source_signatures().cloned().collect(),
    };

    let bytes = serde_json::to_vec_pretty(&persisted)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;

    log::debug!(
        "Saved {} signatures to {}",
        persisted.signatures.len(),
        path.display()
    );
    Ok(())
}

/// Load a persisted index; `Ok(None)` when nothing was saved yet
pub async fn load_index(path: &Path) -> Result<Option<SignatureIndex>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }

    let bytes = tokio::fs::read(path).await?;
    let persisted: PersistedIndex = serde_json::from_slice(&bytes)?;
    if persisted.schema_version != INDEX_SCHEMA_VERSION {
        return Err(IndexerError::SchemaMismatch {
            found: persisted.schema_version,
            expected: INDEX_SCHEMA_VERSION,
        });
    }

    let index = SignatureIndex::from_signatures(persisted.signatures);
    if index.fingerprint() != persisted.fingerprint {
        log::warn!(
            "Persisted index fingerprint mismatch at {}; using rebuilt maps",
            path.display()
        );
    }
    Ok(Some(index))
}
