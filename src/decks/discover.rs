use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A deck archive found under the scan root, before its database is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredArchive {
    pub full_path: PathBuf,
    pub folder: String,
    pub file: String,
    pub relative_path: String,
}

impl DiscoveredArchive {
    pub fn new(root: &Path, full_path: PathBuf) -> Self {
        let file = full_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = match full_path.parent() {
            Some(parent) => parent
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| parent.to_string_lossy().into_owned()),
            None => String::new(),
        };
        let relative_path = full_path
            .strip_prefix(root)
            .unwrap_or(full_path.as_path())
            .to_string_lossy()
            .into_owned();

        Self {
            full_path,
            folder,
            file,
            relative_path,
        }
    }

    pub fn size_bytes(&self) -> Result<u64> {
        let meta = fs::metadata(&self.full_path)
            .with_context(|| format!("failed to stat {}", self.full_path.display()))?;
        Ok(meta.len())
    }
}

/// Every non-directory entry under `root` whose name ends with `extension`,
/// sorted by full path text. Unreadable sub-directories are skipped.
pub fn discover_archives(root: &Path, extension: &str) -> Vec<DiscoveredArchive> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(extension))
        })
        .map(|entry| entry.into_path())
        .collect();
    found.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));

    found
        .into_iter()
        .map(|path| DiscoveredArchive::new(root, path))
        .collect()
}
