use crate::decks::discover::DiscoveredArchive;
use crate::decks::util::write_atomic;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One successfully counted archive, as stored in the results document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub folder: String,
    pub file: String,
    pub path: String,
    pub count: u64,
    pub size: u64,
}

impl ArchiveRecord {
    pub fn from_archive(archive: &DiscoveredArchive, count: u64, size: u64) -> Self {
        Self {
            folder: archive.folder.clone(),
            file: archive.file.clone(),
            path: archive.relative_path.clone(),
            count,
            size,
        }
    }
}

/// Records grouped by folder, folders and files each sorted by name.
pub fn group_by_folder(records: &[ArchiveRecord]) -> BTreeMap<&str, Vec<&ArchiveRecord>> {
    let mut by_folder: BTreeMap<&str, Vec<&ArchiveRecord>> = BTreeMap::new();
    for record in records {
        by_folder
            .entry(record.folder.as_str())
            .or_default()
            .push(record);
    }
    for group in by_folder.values_mut() {
        group.sort_by(|a, b| a.file.cmp(&b.file));
    }
    by_folder
}

pub fn write_results(path: &Path, records: &[ArchiveRecord]) -> Result<()> {
    let data = serde_json::to_string_pretty(records)?;
    write_atomic(path, &format!("{data}\n"))
}

pub fn read_results(path: &Path) -> Result<Vec<ArchiveRecord>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Vec<ArchiveRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}
