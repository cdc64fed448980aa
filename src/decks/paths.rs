use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const RESULTS_FILE_NAME: &str = "actual-card-counts.json";
pub const CONFIG_FILE_NAME: &str = "deck-counts.toml";

#[derive(Debug, Clone)]
pub struct DeckPaths {
    pub results_file: PathBuf,
    pub catalog_file: PathBuf,
    pub config_file: PathBuf,
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    env_path(var).unwrap_or(fallback)
}

fn resolve_home() -> Result<PathBuf> {
    if let Some(home) = env_path("DECK_COUNTS_HOME") {
        return Ok(home);
    }
    env::current_dir().context("current directory could not be resolved")
}

pub fn resolve_paths() -> Result<DeckPaths> {
    let home = resolve_home()?;

    let results_file =
        env_or_default_path("DECK_COUNTS_RESULTS_FILE", home.join(RESULTS_FILE_NAME));
    let catalog_file = env_or_default_path(
        "DECK_COUNTS_CATALOG_FILE",
        home.join("hosting").join("decks").join("decks.json"),
    );
    let config_file = env_or_default_path("DECK_COUNTS_CONFIG_PATH", home.join(CONFIG_FILE_NAME));

    Ok(DeckPaths {
        results_file,
        catalog_file,
        config_file,
    })
}
