use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::decks::apkg;
use crate::decks::config::{ScanConfig, load_config};
use crate::decks::discover::{DiscoveredArchive, discover_archives};
use crate::decks::paths::resolve_paths;
use crate::decks::results::{ArchiveRecord, group_by_folder, write_results};
use crate::decks::util::mib;
use crate::decks::warn::{self, WarnCode, WarnEvent};
use crate::error::DeckCountError;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Default)]
pub struct CountCardsOptions {
    pub decks_folder: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CountCardsOutcome {
    pub discovered: usize,
    pub records: Vec<ArchiveRecord>,
}

impl CountCardsOutcome {
    pub fn failed(&self) -> usize {
        self.discovered - self.records.len()
    }
}

fn count_one(archive: &DiscoveredArchive, cfg: &ScanConfig) -> Result<ArchiveRecord> {
    let size = archive.size_bytes()?;
    let count = apkg::read_card_count(&archive.full_path, cfg)?;
    Ok(ArchiveRecord::from_archive(archive, count, size))
}

fn print_summary(records: &[ArchiveRecord]) {
    println!("📊 Card Counts by Folder:\n");
    for (folder, group) in group_by_folder(records) {
        println!("\n📁 {folder}:");
        for r in group {
            println!(
                "  {:<60} {:>6} cards  {:>7.1} MB",
                r.file,
                r.count,
                mib(r.size)
            );
        }
    }
}

pub fn run(opts: &CountCardsOptions) -> Result<CountCardsOutcome> {
    let Some(root) = opts.decks_folder.as_deref() else {
        return Err(DeckCountError::Usage.into());
    };
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    scan(root, &cfg.scan, &paths.results_file)
}

/// Count every archive under `root` and write the results document.
pub fn scan(root: &Path, cfg: &ScanConfig, results_file: &Path) -> Result<CountCardsOutcome> {
    if !root.is_dir() {
        return Err(DeckCountError::DirectoryNotFound(root.to_path_buf()).into());
    }
    println!("🔍 Scanning decks in: {}\n", root.display());

    let archives = discover_archives(root, &cfg.archive_extension);
    if archives.is_empty() {
        return Err(DeckCountError::NoArchivesFound {
            root: root.to_path_buf(),
            extension: cfg.archive_extension.clone(),
        }
        .into());
    }

    println!("Found {} {} files\n", archives.len(), cfg.archive_extension);
    println!("{}", "=".repeat(RULE_WIDTH));

    let mut records = Vec::with_capacity(archives.len());
    for archive in &archives {
        print!("📦 {}... ", archive.file);
        let _ = std::io::stdout().flush();

        match count_one(archive, cfg) {
            Ok(record) => {
                println!("✓ {} cards ({:.1} MB)", record.count, mib(record.size));
                records.push(record);
            }
            Err(err) => {
                println!("✗ Failed");
                warn::emit(WarnEvent {
                    code: WarnCode::ArchiveReadFailed,
                    stage: "count",
                    archive: &archive.relative_path,
                    reason: "archive skipped",
                    err: &format!("{err:#}"),
                });
            }
        }
    }

    println!("{}", "=".repeat(RULE_WIDTH));
    println!(
        "\n✅ Successfully read {} out of {} decks\n",
        records.len(),
        archives.len()
    );
    print_summary(&records);

    write_results(results_file, &records)?;
    println!("\n💾 Full results saved to: {}", results_file.display());
    println!("\n🔧 To update the catalog, run:");
    println!("   catalog-updater");

    Ok(CountCardsOutcome {
        discovered: archives.len(),
        records,
    })
}
