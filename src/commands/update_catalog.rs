use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::decks::catalog::{CountLookup, DeckChange, load_catalog, reconcile, save_catalog};
use crate::decks::config::{CatalogConfig, load_config};
use crate::decks::paths::resolve_paths;
use crate::decks::results::read_results;
use crate::decks::util::mib;
use crate::error::DeckCountError;

#[derive(Debug, Clone, Default)]
pub struct UpdateCatalogOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCatalogOutcome {
    MissingResults(PathBuf),
    MissingCatalog(PathBuf),
    AlreadyAccurate,
    Updated { decks: usize, written: bool },
}

fn size_mib(value: &serde_json::Value) -> String {
    match value.as_f64() {
        Some(bytes) => format!("{:.1}", bytes / (1024.0 * 1024.0)),
        None => value.to_string(),
    }
}

fn print_change(change: &DeckChange) {
    println!("📝 {}", change.name);
    if let Some(cards) = &change.card_count {
        println!("   Cards: {} → {}", cards.old, cards.new);
    }
    if let Some(size) = &change.size {
        println!(
            "   Size:  {} MB → {:.1} MB",
            size_mib(&size.old),
            mib(size.new)
        );
    }
}

pub fn run(opts: &UpdateCatalogOptions) -> Result<UpdateCatalogOutcome> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    sync(
        &paths.results_file,
        &paths.catalog_file,
        &cfg.catalog,
        opts.dry_run,
    )
}

/// Copy counted sizes and card counts into the catalog. The catalog is
/// rewritten once, after every deck has been reconciled, or not at all.
pub fn sync(
    results_file: &Path,
    catalog_file: &Path,
    cfg: &CatalogConfig,
    dry_run: bool,
) -> Result<UpdateCatalogOutcome> {
    if !results_file.exists() {
        println!("❌ {} not found", results_file.display());
        println!("   Run: archive-counter /path/to/decks/folder");
        return Ok(UpdateCatalogOutcome::MissingResults(
            results_file.to_path_buf(),
        ));
    }
    if !catalog_file.exists() {
        println!("❌ Catalog not found: {}", catalog_file.display());
        return Ok(UpdateCatalogOutcome::MissingCatalog(
            catalog_file.to_path_buf(),
        ));
    }

    let records = read_results(results_file)?;
    let lookup = CountLookup::from_records(&records);
    let mut catalog = load_catalog(catalog_file)?;

    let changes = reconcile(&mut catalog, &cfg.decks_key, &lookup).map_err(|reason| {
        DeckCountError::InvalidCatalog {
            path: catalog_file.to_path_buf(),
            reason,
        }
    })?;
    for change in &changes {
        print_change(change);
    }

    if changes.is_empty() {
        println!("✅ All card counts are already accurate!");
        return Ok(UpdateCatalogOutcome::AlreadyAccurate);
    }

    let catalog_name = catalog_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| catalog_file.display().to_string());

    if dry_run {
        println!(
            "\n🔎 Dry run: {} deck counts would change in {catalog_name}; nothing written",
            changes.len()
        );
        return Ok(UpdateCatalogOutcome::Updated {
            decks: changes.len(),
            written: false,
        });
    }

    save_catalog(catalog_file, &catalog)?;
    println!(
        "\n✅ Updated {} deck counts in {catalog_name}",
        changes.len()
    );
    println!("   Next: {}", cfg.deploy_hint);

    Ok(UpdateCatalogOutcome::Updated {
        decks: changes.len(),
        written: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const RESULTS: &str = r#"[
  {"folder": "French", "file": "French.apkg", "path": "French/French.apkg", "count": 1200, "size": 5242880}
]"#;

    const CATALOG: &str = r#"{
  "decks": [
    {
      "name": "French Essentials",
      "downloadUrl": "https://cdn.example.com/decks/French.apkg?token=x",
      "cardCount": 1000,
      "size": 4000000,
      "language": "fr"
    }
  ]
}"#;

    fn fixture(results: Option<&str>, catalog: Option<&str>) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let tmp = tempdir().expect("tempdir");
        let results_file = tmp.path().join("actual-card-counts.json");
        let catalog_file = tmp.path().join("hosting/decks/decks.json");
        if let Some(raw) = results {
            fs::write(&results_file, raw).expect("write results");
        }
        if let Some(raw) = catalog {
            fs::create_dir_all(catalog_file.parent().expect("parent")).expect("mkdir");
            fs::write(&catalog_file, raw).expect("write catalog");
        }
        (tmp, results_file, catalog_file)
    }

    #[test]
    fn second_run_is_already_accurate_and_does_not_write() {
        let (_tmp, results, catalog) = fixture(Some(RESULTS), Some(CATALOG));
        let cfg = CatalogConfig::default();

        let first = sync(&results, &catalog, &cfg, false).expect("first");
        assert_eq!(
            first,
            UpdateCatalogOutcome::Updated {
                decks: 1,
                written: true
            }
        );
        let after_first = fs::read_to_string(&catalog).expect("read");
        let parsed: serde_json::Value = serde_json::from_str(&after_first).expect("json");
        assert_eq!(parsed["decks"][0]["cardCount"], 1200);
        assert_eq!(parsed["decks"][0]["size"], 5242880);
        assert_eq!(parsed["decks"][0]["language"], "fr");

        let second = sync(&results, &catalog, &cfg, false).expect("second");
        assert_eq!(second, UpdateCatalogOutcome::AlreadyAccurate);
        assert_eq!(fs::read_to_string(&catalog).expect("read"), after_first);
    }

    #[test]
    fn dry_run_leaves_catalog_bytes_alone() {
        let (_tmp, results, catalog) = fixture(Some(RESULTS), Some(CATALOG));

        let outcome = sync(&results, &catalog, &CatalogConfig::default(), true).expect("sync");

        assert_eq!(
            outcome,
            UpdateCatalogOutcome::Updated {
                decks: 1,
                written: false
            }
        );
        assert_eq!(fs::read_to_string(&catalog).expect("read"), CATALOG);
    }

    #[test]
    fn missing_inputs_are_reported_without_writes() {
        let (_tmp, results, catalog) = fixture(None, Some(CATALOG));
        let outcome = sync(&results, &catalog, &CatalogConfig::default(), false).expect("sync");
        assert_eq!(outcome, UpdateCatalogOutcome::MissingResults(results.clone()));
        assert_eq!(fs::read_to_string(&catalog).expect("read"), CATALOG);

        let (_tmp, results, catalog) = fixture(Some(RESULTS), None);
        let outcome = sync(&results, &catalog, &CatalogConfig::default(), false).expect("sync");
        assert_eq!(outcome, UpdateCatalogOutcome::MissingCatalog(catalog.clone()));
        assert!(!catalog.exists());
    }

    #[test]
    fn catalog_without_decks_array_is_an_error() {
        let (_tmp, results, catalog) = fixture(Some(RESULTS), Some(r#"{"decks": null}"#));
        let err = sync(&results, &catalog, &CatalogConfig::default(), false).expect_err("fail");
        assert!(err.to_string().contains("`decks` is not an array"));
    }
}
