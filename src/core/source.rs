use ignore::WalkBuilder;
use std::path::Path;
use tracing::{debug, trace, warn};

use super::language::Language;
use crate::config::ScanConfig;
use crate::error::{Result, SysvistaError};

/// A recognized source file handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the scan root, `/`-separated
    pub path: String,

    /// Language classified from the extension
    pub language: Language,

    /// Full file text
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, language: Language, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            content: content.into(),
        }
    }

    /// Classify `path` and build a source file, or `None` for unrecognized files
    pub fn classify(path: impl Into<String>, content: impl Into<String>) -> Option<Self> {
        let path = path.into();
        let language = Language::classify(Path::new(&path))?;
        Some(Self::new(path, language, content))
    }
}

/// Result of walking a scan root
#[derive(Debug, Default)]
pub struct CollectedSources {
    pub files: Vec<SourceFile>,

    /// Unrecognized, oversized or unreadable files
    pub skipped: u64,
}

/// Walks a directory tree honoring ignore rules and reads recognized files
pub struct SourceCollector {
    config: ScanConfig,
}

impl SourceCollector {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Collect every recognized file under `root`, sorted by path
    pub fn collect<P: AsRef<Path>>(&self, root: P) -> Result<CollectedSources> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(SysvistaError::FileSystem(format!(
                "scan root {} does not exist",
                root.display()
            )));
        }
        if root.is_dir() {
            if let Err(e) = std::fs::read_dir(root) {
                return Err(SysvistaError::Scan(format!(
                    "cannot read directory {}: {}",
                    root.display(),
                    e
                )));
            }
        }

        let mut collected = CollectedSources::default();

        // Use ignore crate to respect .gitignore and global excludes
        let walker = WalkBuilder::new(root)
            .hidden(!self.config.include_hidden)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    collected.skipped += 1;
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let Some(language) = Language::classify(path) else {
                trace!("Unrecognized file: {}", path.display());
                collected.skipped += 1;
                continue;
            };

            match self.read(path) {
                Ok(content) => {
                    collected
                        .files
                        .push(SourceFile::new(relative_path(root, path), language, content));
                }
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    collected.skipped += 1;
                }
            }
        }

        collected.files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(collected)
    }

    fn read(&self, path: &Path) -> Result<String> {
        let size = std::fs::metadata(path)?.len();
        if size > self.config.max_file_size {
            return Err(SysvistaError::FileSystem(format!(
                "file exceeds maximum size of {} bytes",
                self.config.max_file_size
            )));
        }
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Relative, `/`-separated form of `path` under `root`
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative = if relative.as_os_str().is_empty() {
        // the root itself was a file
        Path::new(path.file_name().unwrap_or(path.as_os_str()))
    } else {
        relative
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collects_recognized_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/models")).unwrap();
        fs::write(dir.path().join("src/models/user.ts"), "interface User {}").unwrap();
        fs::write(dir.path().join("src/app.py"), "x = 1").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let collected = SourceCollector::new(&ScanConfig::default())
            .collect(dir.path())
            .unwrap();

        let paths: Vec<&str> = collected.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/app.py", "src/models/user.ts"]);
        assert_eq!(collected.files[1].language, Language::TypeScript);
        assert_eq!(collected.skipped, 1);
    }

    #[test]
    fn test_respects_gitignore_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join(".gitignore"), "dist/\n").unwrap();
        fs::write(dir.path().join("dist/bundle.js"), "export function a() {}").unwrap();
        fs::write(dir.path().join(".cache/tmp.ts"), "type A = {}").unwrap();
        fs::write(dir.path().join("main.go"), "package main").unwrap();

        let collected = SourceCollector::new(&ScanConfig::default())
            .collect(dir.path())
            .unwrap();
        let paths: Vec<&str> = collected.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["main.go"]);

        let config = ScanConfig {
            include_hidden: true,
            ..ScanConfig::default()
        };
        let collected = SourceCollector::new(&config).collect(dir.path()).unwrap();
        assert!(collected.files.iter().any(|f| f.path == ".cache/tmp.ts"));
    }

    #[test]
    fn test_oversized_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.rs"), "x".repeat(64)).unwrap();

        let config = ScanConfig {
            max_file_size: 16,
            ..ScanConfig::default()
        };
        let collected = SourceCollector::new(&config).collect(dir.path()).unwrap();
        assert!(collected.files.is_empty());
        assert_eq!(collected.skipped, 1);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = SourceCollector::new(&ScanConfig::default()).collect("/no/such/root/here");
        assert!(matches!(result, Err(SysvistaError::FileSystem(_))));
    }

    #[test]
    fn test_classify_source() {
        assert!(SourceFile::classify("a/b.kt", "").is_some());
        assert!(SourceFile::classify("a/b.txt", "").is_none());
    }
}
