use crate::decks::paths::DeckPaths;
use crate::decks::warn::{self, WarnCode, WarnEvent};
use crate::error::DeckCountError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

include!(concat!(env!("OUT_DIR"), "/deck_counts_env_allowlist.rs"));

const ENV_PREFIX: &str = "DECK_COUNTS_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub archive_extension: String,
    /// Embedded database names, tried in order.
    pub database_names: Vec<String>,
    pub count_table: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            archive_extension: ".apkg".to_string(),
            database_names: vec![
                "collection.anki21".to_string(),
                "collection.anki2".to_string(),
            ],
            count_table: "cards".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub decks_key: String,
    pub deploy_hint: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            decks_key: "decks".to_string(),
            deploy_hint: "firebase deploy --only hosting".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeckCountsConfig {
    pub scan: ScanConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialDeckCountsConfig {
    scan: Option<ScanConfig>,
    catalog: Option<CatalogConfig>,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = parse_csv(&v);
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate(cfg: &DeckCountsConfig) -> Result<(), DeckCountError> {
    if cfg.scan.archive_extension.trim().is_empty() {
        return Err(DeckCountError::InvalidConfig(
            "archive extension cannot be empty".to_string(),
        ));
    }
    if cfg.scan.database_names.is_empty() {
        return Err(DeckCountError::InvalidConfig(
            "at least one database name is required".to_string(),
        ));
    }
    for name in &cfg.scan.database_names {
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            return Err(DeckCountError::InvalidConfig(format!(
                "invalid database name `{name}`: must be a bare file name"
            )));
        }
    }
    if !is_sql_identifier(&cfg.scan.count_table) {
        return Err(DeckCountError::InvalidConfig(format!(
            "invalid count table `{}`: use letters, digits and `_` only",
            cfg.scan.count_table
        )));
    }
    if cfg.catalog.decks_key.trim().is_empty() {
        return Err(DeckCountError::InvalidConfig(
            "catalog decks key cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn merge_toml(base: &mut DeckCountsConfig, raw: &str) -> Result<()> {
    let parsed: PartialDeckCountsConfig = toml::from_str(raw)?;
    if let Some(scan) = parsed.scan {
        base.scan = scan;
    }
    if let Some(catalog) = parsed.catalog {
        base.catalog = catalog;
    }
    Ok(())
}

fn merge_file_config(base: &mut DeckCountsConfig, paths: &DeckPaths) -> Result<()> {
    let path = &paths.config_file;
    if !path.exists() {
        return Ok(());
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    merge_toml(base, &raw)
        .with_context(|| format!("failed to parse deck-counts config {}", path.display()))
}

pub fn load_config(paths: &DeckPaths) -> Result<DeckCountsConfig> {
    let mut cfg = DeckCountsConfig::default();
    merge_file_config(&mut cfg, paths)?;

    cfg.scan.archive_extension =
        env_or_string("DECK_COUNTS_ARCHIVE_EXTENSION", &cfg.scan.archive_extension);
    cfg.scan.database_names =
        env_or_csv("DECK_COUNTS_DATABASE_NAMES", &cfg.scan.database_names);
    cfg.scan.count_table = env_or_string("DECK_COUNTS_COUNT_TABLE", &cfg.scan.count_table);
    cfg.catalog.decks_key = env_or_string("DECK_COUNTS_DECKS_KEY", &cfg.catalog.decks_key);
    cfg.catalog.deploy_hint = env_or_string("DECK_COUNTS_DEPLOY_HINT", &cfg.catalog.deploy_hint);

    validate(&cfg)?;
    Ok(cfg)
}

fn unknown_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = keys
        .into_iter()
        .filter(|key| key.starts_with(ENV_PREFIX))
        .filter(|key| !GENERATED_DECK_COUNTS_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect();
    out.sort();
    out
}

/// Warn about `DECK_COUNTS_*` variables the tools never read, usually typos.
pub fn warn_unknown_env_keys() {
    let keys = env::vars_os().filter_map(|(key, _)| key.into_string().ok());
    for key in unknown_keys(keys) {
        warn::emit(WarnEvent {
            code: WarnCode::UnknownEnvKey,
            stage: "config",
            archive: "",
            reason: &key,
            err: "variable is not read by deck-counts",
        });
    }
}
