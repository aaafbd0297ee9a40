use crate::builder::BuildOutput;
use crate::index::SignatureIndex;
use crate::stats::IndexStats;
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};

/// One published, immutable index together with the build that produced it
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    /// Monotonic publication counter (0 = the initial empty snapshot)
    pub version: u64,
    pub index: SignatureIndex,
    pub stats: IndexStats,
}

/// Versioned, atomically swappable holder of the current index.
///
/// Readers take an `Arc` to a complete snapshot and keep it for as long as they
/// need; a concurrent [`IndexHandle::publish`] never mutates a snapshot in place.
/// Publishers are serialized so versions are stored in increasing order.
#[derive(Debug)]
pub struct IndexHandle {
    current: ArcSwap<IndexSnapshot>,
    publish_lock: Mutex<()>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexHandle {
    /// Handle holding an empty index at version 0
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(IndexSnapshot::default()),
            publish_lock: Mutex::new(()),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Replace the published index; returns the new version
    pub fn publish(&self, output: BuildOutput) -> u64 {
        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let version = self.current.load().version + 1;
        let snapshot = IndexSnapshot {
            version,
            index: output.index,
            stats: output.stats,
        };
        log::debug!(
            "Publishing index v{version} ({} signatures, fingerprint {})",
            snapshot.index.len(),
            short_fingerprint(snapshot.index.fingerprint())
        );
        self.current.store(Arc::new(snapshot));
        version
    }
}

fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assembly_extractor::{FunctionSignature, SignatureKind, SourceLocation, TypeHint};

    fn output(names: &[&str]) -> BuildOutput {
        let signatures = names
            .iter()
            .enumerate()
            .map(|(line, name)| FunctionSignature {
                name: (*name).to_string(),
                parameters: Vec::new(),
                return_type: TypeHint::Unknown,
                location: SourceLocation {
                    file_path: "lib.py".to_string(),
                    line: line + 1,
                },
                kind: SignatureKind::Function,
                scope: Vec::new(),
                module: "lib".to_string(),
            })
            .collect();
        BuildOutput {
            index: SignatureIndex::from_signatures(signatures),
            stats: IndexStats::default(),
        }
    }

    #[test]
    fn test_publish_bumps_version() {
        let handle = IndexHandle::new();
        assert_eq!(handle.version(), 0);
        assert!(handle.snapshot().index.is_empty());

        assert_eq!(handle.publish(output(&["jump"])), 1);
        assert_eq!(handle.publish(output(&["jump", "move"])), 2);
        assert_eq!(handle.version(), 2);
        assert_eq!(handle.snapshot().index.len(), 2);
    }

    #[test]
    fn test_old_snapshot_survives_publish() {
        let handle = IndexHandle::new();
        handle.publish(output(&["jump"]));
        let held = handle.snapshot();

        handle.publish(output(&["move", "draw", "spawn_pipe"]));

        assert_eq!(held.version, 1);
        assert_eq!(held.index.len(), 1);
        assert!(held.index.contains_name("jump"));
        assert_eq!(handle.snapshot().index.len(), 3);
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let handle = Arc::new(IndexHandle::new());
        let sizes = [1usize, 3, 5];

        std::thread::scope(|scope| {
            let writer = handle.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    writer.publish(output(&["a"]));
                    writer.publish(output(&["a", "b", "c"]));
                    writer.publish(output(&["a", "b", "c", "d", "e"]));
                }
            });

            for _ in 0..4 {
                let reader = handle.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let snapshot = reader.snapshot();
                        let len = snapshot.index.len();
                        assert!(snapshot.version == 0 || sizes.contains(&len));
                        assert_eq!(snapshot.index.signatures().len(), len);
                    }
                });
            }
        });
    }
}
