//! Reading card counts out of `.apkg` deck archives.
//!
//! An archive is a zip container holding a SQLite collection. Each archive
//! is unpacked into its own temporary directory which is removed when the
//! read finishes, whether or not it succeeded.

use crate::decks::config::ScanConfig;
use crate::error::DeckCountError;
use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

/// First candidate name that exists inside `dir`.
pub fn locate_database(dir: &Path, candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn extract_into(archive: &Path, dest: &Path) -> Result<()> {
    let file =
        File::open(archive).with_context(|| format!("failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a readable zip archive", archive.display()))?;
    zip.extract(dest)
        .with_context(|| format!("failed to extract {}", archive.display()))?;
    Ok(())
}

/// Count rows of `table` in the SQLite file at `db_path`, opened read-only.
pub fn count_rows(db_path: &Path, table: &str) -> Result<u64> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database {}", db_path.display()))?;

    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("count query failed on {}", db_path.display()))?;
    conn.close()
        .map_err(|(_, err)| err)
        .with_context(|| format!("failed to close database {}", db_path.display()))?;

    u64::try_from(count).context("database reported a negative row count")
}

/// Same as [`read_card_count`], staging the extraction under `staging_root`.
pub fn read_card_count_in(archive: &Path, cfg: &ScanConfig, staging_root: &Path) -> Result<u64> {
    let staging = tempfile::Builder::new()
        .prefix("deck-counts-")
        .tempdir_in(staging_root)
        .with_context(|| {
            format!(
                "failed to create extraction dir in {}",
                staging_root.display()
            )
        })?;

    extract_into(archive, staging.path())?;

    let Some(db_path) = locate_database(staging.path(), &cfg.database_names) else {
        return Err(DeckCountError::MissingDatabase {
            archive: archive.to_path_buf(),
            candidates: cfg.database_names.join(", "),
        }
        .into());
    };

    let count = count_rows(&db_path, &cfg.count_table)?;
    staging
        .close()
        .with_context(|| format!("failed to clean up extraction of {}", archive.display()))?;
    Ok(count)
}

pub fn read_card_count(archive: &Path, cfg: &ScanConfig) -> Result<u64> {
    read_card_count_in(archive, cfg, &env::temp_dir())
}
