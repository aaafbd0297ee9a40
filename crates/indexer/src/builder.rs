use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::index::SignatureIndex;
use crate::limits::{resolve_index_concurrency, IndexConcurrencySnapshot, WorkerPool};
use crate::scanner::FileScanner;
use crate::stats::{IndexStats, ParseFailure};
use assembly_extractor::{ExtractorConfig, ExtractorError, FunctionSignature, SignatureExtractor};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One `(path, text)` pair handed to the builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Python files read from disk, plus the ones that could not be read
#[derive(Debug, Clone, Default)]
pub struct SourceScan {
    pub files: Vec<SourceFile>,
    pub unreadable: Vec<ParseFailure>,
}

/// Result of one full build pass
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub index: SignatureIndex,
    pub stats: IndexStats,
}

/// Builds a [`SignatureIndex`] from source files on a bounded worker pool.
///
/// Each file is parsed independently on a blocking thread; a file that fails to
/// parse is recorded in [`IndexStats::failures`] and skipped. The index is only
/// assembled after every worker has finished.
pub struct IndexBuilder {
    config: IndexerConfig,
    pool: WorkerPool,
}

impl IndexBuilder {
    pub fn new(config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        let limit = resolve_index_concurrency(config.concurrency);
        log::debug!("Index worker pool limit: {limit}");
        Ok(Self {
            config,
            pool: WorkerPool::new(limit),
        })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn concurrency(&self) -> IndexConcurrencySnapshot {
        self.pool.snapshot()
    }

    /// Index every Python file under `root`; unreadable files count as failures
    pub async fn build_dir(&self, root: impl AsRef<Path>) -> Result<BuildOutput> {
        let scan = read_sources(root.as_ref(), self.config.max_file_bytes).await?;
        let mut output = self.build(scan.files).await?;
        if !scan.unreadable.is_empty() {
            output.stats.files_seen += scan.unreadable.len();
            output.stats.failures.extend(scan.unreadable);
            output.stats.failures.sort_by(|a, b| a.path.cmp(&b.path));
        }
        Ok(output)
    }

    /// Index an explicit set of files
    pub async fn build(&self, mut files: Vec<SourceFile>) -> Result<BuildOutput> {
        let start = Instant::now();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        let before = files.len();
        files.dedup_by(|later, earlier| later.path == earlier.path);
        if files.len() != before {
            log::warn!(
                "Ignoring {} duplicate file paths in index input",
                before - files.len()
            );
        }

        let mut stats = IndexStats::new();
        stats.files_seen = files.len();

        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let pool = self.pool.clone();
            let config = self.config.extractor.clone();
            handles.push(tokio::spawn(async move {
                let permit = pool.acquire().await;
                let path = file.path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    extract_file(&config, &file)
                })
                .await;
                (path, outcome)
            }));
        }

        let mut signatures: Vec<FunctionSignature> = Vec::new();
        for handle in handles {
            let (path, outcome) = handle
                .await
                .map_err(|e| IndexerError::WorkerFailed(e.to_string()))?;
            match outcome {
                Ok(Ok(found)) => {
                    stats.add_file();
                    signatures.extend(found);
                }
                Ok(Err(err)) => {
                    log::warn!("Skipping {path}: {err}");
                    stats.add_failure(path, err.to_string());
                }
                Err(join_err) => {
                    log::warn!("Parse worker for {path} failed: {join_err}");
                    stats.add_failure(path, format!("parse worker failed: {join_err}"));
                }
            }
        }

        let index = SignatureIndex::from_signatures(signatures);
        stats.signatures = index.len();
        stats.shadowed = index.shadowed().len();
        stats.time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        log::info!("Indexed {stats}");
        Ok(BuildOutput { index, stats })
    }
}

fn extract_file(
    config: &ExtractorConfig,
    file: &SourceFile,
) -> std::result::Result<Vec<FunctionSignature>, ExtractorError> {
    let mut extractor = SignatureExtractor::new(config.clone())?;
    extractor.extract(&file.path, &file.text)
}

/// Discover and read Python files under `root`.
///
/// Paths are stored relative to `root` with `/` separators so that the same tree
/// produces the same index wherever it is checked out. A file that vanished,
/// cannot be opened, or is not UTF-8 is reported in [`SourceScan::unreadable`].
pub async fn read_sources(root: &Path, max_file_bytes: u64) -> Result<SourceScan> {
    if !root.is_dir() {
        return Err(IndexerError::InvalidPath(root.display().to_string()));
    }

    let scanner = FileScanner::new(root).with_max_file_bytes(max_file_bytes);
    Ok(read_paths(root, scanner.scan()).await)
}

async fn read_paths(root: &Path, paths: Vec<PathBuf>) -> SourceScan {
    let mut scan = SourceScan::default();

    for path in paths {
        let display = relative_display(root, &path);
        let reason = match tokio::fs::read(&path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    scan.files.push(SourceFile::new(display, text));
                    continue;
                }
                Err(_) => "not valid UTF-8".to_string(),
            },
            Err(err) => format!("read failed: {err}"),
        };
        log::warn!("Skipping {display}: {reason}");
        scan.unreadable.push(ParseFailure {
            path: display,
            reason,
        });
    }

    scan
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builder() -> IndexBuilder {
        IndexBuilder::new(IndexerConfig {
            concurrency: Some(2),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_parse_failure_is_skipped() {
        let output = builder()
            .build(vec![
                SourceFile::new(
                    "good.py",
                    "def rocket_add(a: int, b: int) -> int:\n    return a + b\n",
                ),
                SourceFile::new("bad.py", "def broken(:\n"),
            ])
            .await
            .unwrap();

        assert_eq!(output.stats.files_seen, 2);
        assert_eq!(output.stats.files_indexed, 1);
        assert_eq!(output.stats.failures.len(), 1);
        assert_eq!(output.stats.failures[0].path, "bad.py");
        assert_eq!(output.index.len(), 1);
        assert!(output.index.contains_name("rocket_add"));
    }

    #[tokio::test]
    async fn test_empty_input_builds_empty_index() {
        let output = builder().build(Vec::new()).await.unwrap();
        assert!(output.index.is_empty());
        assert_eq!(output.stats.files_seen, 0);
    }

    #[tokio::test]
    async fn test_duplicate_paths_are_collapsed() {
        let output = builder()
            .build(vec![
                SourceFile::new("a.py", "def f():\n    pass\n"),
                SourceFile::new("a.py", "def f():\n    pass\n"),
            ])
            .await
            .unwrap();
        assert_eq!(output.stats.files_seen, 1);
        assert_eq!(output.index.len(), 1);
        assert!(output.index.shadowed().is_empty());
    }

    #[tokio::test]
    async fn test_shadowed_duplicates_are_counted() {
        let output = builder()
            .build(vec![
                SourceFile::new("b.py", "def draw(screen):\n    pass\n"),
                SourceFile::new("a.py", "def draw(canvas):\n    pass\n"),
            ])
            .await
            .unwrap();
        assert_eq!(output.stats.shadowed, 1);
        let kept: Vec<_> = output.index.by_name("draw").collect();
        assert_eq!(kept[0].location.file_path, "a.py");
    }

    #[tokio::test]
    async fn test_pool_bound_is_respected() {
        let builder = builder();
        let files = (0..16)
            .map(|i| SourceFile::new(format!("m{i}.py"), format!("def f{i}(x):\n    return x\n")))
            .collect();
        let output = builder.build(files).await.unwrap();
        assert_eq!(output.index.len(), 16);
        assert!(builder.concurrency().peak_in_flight <= builder.concurrency().limit);
    }

    #[tokio::test]
    async fn test_unreadable_files_are_recorded_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        std::fs::write(root.join("game_lib.py"), "def jump():\n    pass\n").unwrap();
        std::fs::write(root.join("latin1.py"), [0x63, 0x61, 0x66, 0xe9]).unwrap();

        // `vanished.py` was listed by the scanner but deleted before it was read.
        let scan = read_paths(
            root,
            vec![
                root.join("game_lib.py"),
                root.join("latin1.py"),
                root.join("vanished.py"),
            ],
        )
        .await;

        assert_eq!(scan.files.len(), 1);
        assert_eq!(scan.files[0].path, "game_lib.py");
        let failed: Vec<_> = scan.unreadable.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, vec!["latin1.py", "vanished.py"]);
        assert!(scan.unreadable[1].reason.starts_with("read failed"));
    }

    #[tokio::test]
    async fn test_build_dir_counts_unreadable_files() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("game_lib.py"), "def jump():\n    pass\n").unwrap();
        std::fs::write(temp.path().join("latin1.py"), [0x63, 0x61, 0x66, 0xe9]).unwrap();

        let output = builder().build_dir(temp.path()).await.unwrap();
        assert_eq!(output.stats.files_seen, 2);
        assert_eq!(output.stats.files_indexed, 1);
        assert_eq!(output.stats.failures[0].path, "latin1.py");
        assert!(output.index.contains_name("jump"));
    }
}
