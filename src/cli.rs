use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::commands::count_cards::{self, CountCardsOptions};
use crate::commands::update_catalog::{self, UpdateCatalogOptions};
use crate::decks::config::warn_unknown_env_keys;

#[derive(Debug, Parser)]
#[command(
    name = "archive-counter",
    version,
    about = "Count the cards in every .apkg deck archive under a folder."
)]
pub struct ArchiveCounterCli {
    /// Folder to scan recursively for deck archives.
    pub decks_folder: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(
    name = "catalog-updater",
    version,
    about = "Copy counted card totals and sizes into the hosted deck catalog."
)]
pub struct CatalogUpdaterCli {
    /// Print the changes without rewriting the catalog.
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run_archive_counter() -> Result<()> {
    let cli = ArchiveCounterCli::parse();
    warn_unknown_env_keys();
    count_cards::run(&CountCardsOptions {
        decks_folder: cli.decks_folder,
    })?;
    Ok(())
}

pub fn run_catalog_updater() -> Result<()> {
    let cli = CatalogUpdaterCli::parse();
    warn_unknown_env_keys();
    update_catalog::run(&UpdateCatalogOptions {
        dry_run: cli.dry_run,
    })?;
    Ok(())
}
