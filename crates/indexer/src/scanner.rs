use crate::config::DEFAULT_MAX_FILE_BYTES;
use assembly_extractor::is_python_path;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Scanner for finding Python source files in a project
pub struct FileScanner {
    root: PathBuf,
    max_file_bytes: u64,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Scan directory for Python files (.gitignore aware), sorted by path
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true) // do not index hidden files by default
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !FileScanner::is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if !is_python_path(path) {
                        continue;
                    }

                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > self.max_file_bytes {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.max_file_bytes
                            );
                            continue;
                        }
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::info!("Found {} Python files", files.len());
        files
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            for component in relative.components() {
                if let std::path::Component::Normal(name) = component {
                    let lowered = name.to_string_lossy().to_lowercase();
                    if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // virtualenvs / installed packages
    ".venv",
    "venv",
    ".tox",
    ".nox",
    "site-packages",
    ".eggs",
    // caches / builds
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".cache",
    "node_modules",
    "build",
    "dist",
    "target",
    // the engine's own state
    ".assembly",
];

#[cfg(test)]
mod tests {
    use super::FileScanner;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_only_python_files_in_order() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("pkg")).unwrap();
        fs::write(temp.path().join("pkg").join("b.py"), b"def b(): pass\n").unwrap();
        fs::write(temp.path().join("a.py"), b"def a(): pass\n").unwrap();
        fs::write(temp.path().join("README.md"), b"# readme").unwrap();
        fs::write(temp.path().join("main.rs"), b"fn main() {}").unwrap();

        let files = FileScanner::new(temp.path()).scan();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                std::path::PathBuf::from("a.py"),
                std::path::PathBuf::from("pkg").join("b.py")
            ]
        );
    }

    #[test]
    fn skips_virtualenvs_and_caches() {
        let temp = tempdir().unwrap();
        for scope in ["venv/lib", "__pycache__", ".venv/lib"] {
            let dir = temp.path().join(scope);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("hidden.py"), b"def hidden(): pass\n").unwrap();
        }
        fs::write(temp.path().join("game_lib.py"), b"def jump(): pass\n").unwrap();

        let files = FileScanner::new(temp.path()).scan();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("game_lib.py"));
    }

    #[test]
    fn respects_gitignore_and_size_limit() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::create_dir_all(temp.path().join("generated")).unwrap();
        fs::write(temp.path().join(".gitignore"), b"/generated\n").unwrap();
        fs::write(temp.path().join("generated").join("out.py"), b"x = 1\n").unwrap();
        fs::write(temp.path().join("small.py"), b"x = 1\n").unwrap();
        fs::write(temp.path().join("large.py"), vec![b'#'; 4096]).unwrap();

        let files = FileScanner::new(temp.path())
            .with_max_file_bytes(1024)
            .scan();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("small.py"));
    }
}
