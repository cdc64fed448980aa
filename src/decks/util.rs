use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Convert a byte count into mebibytes for display.
pub fn mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}

/// Write `contents` to `path` by way of a sibling temp file and a rename,
/// so readers see either the old document or the complete new one.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage a temp file in {}", parent.display()))?;
    staged
        .write_all(contents.as_bytes())
        .with_context(|| format!("failed to write staged copy of {}", path.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("failed to flush staged copy of {}", path.display()))?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
