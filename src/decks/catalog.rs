//! Reconciling counted archives into the hosted deck catalog.
//!
//! The catalog stays an untyped JSON document so that fields this tool does
//! not own pass through a rewrite untouched, in their original order.

use crate::decks::results::ArchiveRecord;
use crate::decks::util::write_atomic;
use crate::decks::warn::{self, WarnCode, WarnEvent};
use crate::error::DeckCountError;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const CARD_COUNT_KEY: &str = "cardCount";
pub const SIZE_KEY: &str = "size";
pub const DOWNLOAD_URL_KEY: &str = "downloadUrl";
pub const NAME_KEY: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measured {
    pub count: u64,
    pub size: u64,
}

/// Bare file name to measured count/size. Later records win on collisions.
#[derive(Debug, Clone, Default)]
pub struct CountLookup {
    by_file: HashMap<String, Measured>,
}

impl CountLookup {
    pub fn from_records(records: &[ArchiveRecord]) -> Self {
        let mut by_file = HashMap::with_capacity(records.len());
        for record in records {
            let measured = Measured {
                count: record.count,
                size: record.size,
            };
            if by_file.insert(record.file.clone(), measured).is_some() {
                warn::emit(WarnEvent {
                    code: WarnCode::DuplicateFileName,
                    stage: "lookup",
                    archive: &record.file,
                    reason: &record.path,
                    err: "later record replaces the earlier one",
                });
            }
        }
        Self { by_file }
    }

    pub fn get(&self, file: &str) -> Option<Measured> {
        self.by_file.get(file).copied()
    }

    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

/// File name a catalog download URL points at.
///
/// `https://host/o/decks%2FFrench.apkg?alt=media` resolves to `French.apkg`.
pub fn derive_file_name(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or_default();
    let segment = without_query.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode_binary(segment.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);
    decoded.rsplit('/').next().unwrap_or_default().to_string()
}

/// One field's stored value and its replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub old: Value,
    pub new: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckChange {
    pub name: String,
    pub card_count: Option<FieldChange>,
    pub size: Option<FieldChange>,
}

fn stored_value(deck: &Map<String, Value>, key: &str) -> Value {
    deck.get(key).cloned().unwrap_or_else(|| Value::from(0u64))
}

fn field_change(deck: &Map<String, Value>, key: &str, new: u64) -> Option<FieldChange> {
    let old = stored_value(deck, key);
    if old.as_u64() == Some(new) {
        return None;
    }
    Some(FieldChange { old, new })
}

fn deck_name(deck: &Map<String, Value>) -> String {
    match deck.get(NAME_KEY) {
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => "(unnamed deck)".to_string(),
    }
}

/// Apply measured counts to every matching deck in `catalog[decks_key]`,
/// in place and in catalog order. Returns one entry per deck that changed.
pub fn reconcile(
    catalog: &mut Value,
    decks_key: &str,
    lookup: &CountLookup,
) -> Result<Vec<DeckChange>, String> {
    let decks = catalog
        .get_mut(decks_key)
        .ok_or_else(|| format!("missing `{decks_key}` key"))?
        .as_array_mut()
        .ok_or_else(|| format!("`{decks_key}` is not an array"))?;

    let mut changes = Vec::new();
    for deck in decks.iter_mut() {
        let Some(deck) = deck.as_object_mut() else {
            continue;
        };
        let Some(url) = deck.get(DOWNLOAD_URL_KEY).and_then(Value::as_str) else {
            warn::emit(WarnEvent {
                code: WarnCode::DeckWithoutUrl,
                stage: "reconcile",
                archive: "",
                reason: &deck_name(deck),
                err: "entry left unchanged",
            });
            continue;
        };
        let Some(measured) = lookup.get(&derive_file_name(url)) else {
            continue;
        };

        let card_count = field_change(deck, CARD_COUNT_KEY, measured.count);
        let size = field_change(deck, SIZE_KEY, measured.size);
        if card_count.is_none() && size.is_none() {
            continue;
        }

        deck.insert(CARD_COUNT_KEY.to_string(), Value::from(measured.count));
        deck.insert(SIZE_KEY.to_string(), Value::from(measured.size));
        changes.push(DeckChange {
            name: deck_name(deck),
            card_count,
            size,
        });
    }
    Ok(changes)
}

pub fn load_catalog(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if !parsed.is_object() {
        return Err(DeckCountError::InvalidCatalog {
            path: path.to_path_buf(),
            reason: "top level is not an object".to_string(),
        }
        .into());
    }
    Ok(parsed)
}

pub fn save_catalog(path: &Path, catalog: &Value) -> Result<()> {
    let data = serde_json::to_string_pretty(catalog)?;
    write_atomic(path, &format!("{data}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(file: &str, count: u64, size: u64) -> ArchiveRecord {
        ArchiveRecord {
            folder: "French".to_string(),
            file: file.to_string(),
            path: format!("French/{file}"),
            count,
            size,
        }
    }

    #[test]
    fn file_name_ignores_query_and_percent_encoding() {
        let plain = derive_file_name("https://cdn.example.com/decks/My Deck.apkg");
        let encoded = derive_file_name("https://cdn.example.com/decks/My%20Deck.apkg?alt=media");
        assert_eq!(plain, "My Deck.apkg");
        assert_eq!(encoded, "My Deck.apkg");
    }

    #[test]
    fn file_name_takes_last_segment_of_encoded_object_path() {
        let url = "https://firebasestorage.googleapis.com/v0/b/app.appspot.com/o/decks%2FFrench%2FFrench%20A1.apkg?alt=media&token=abc";
        assert_eq!(derive_file_name(url), "French A1.apkg");
    }

    #[test]
    fn file_name_survives_slashes_in_query_and_bad_utf8() {
        assert_eq!(
            derive_file_name("https://x.test/d/Deck.apkg?next=/a/b"),
            "Deck.apkg"
        );
        assert_eq!(derive_file_name("https://x.test/d/Bad%FF.apkg"), "Bad\u{FFFD}.apkg");
        assert_eq!(derive_file_name("Deck.apkg"), "Deck.apkg");
    }

    #[test]
    fn reconcile_updates_matching_deck() {
        let mut catalog = json!({
            "decks": [{
                "name": "French",
                "downloadUrl": "https://cdn.example.com/decks/French.apkg?token=x",
                "cardCount": 1000,
                "size": 4000000
            }]
        });
        let lookup = CountLookup::from_records(&[record("French.apkg", 1200, 5242880)]);

        let changes = reconcile(&mut catalog, "decks", &lookup).expect("reconcile");

        assert_eq!(changes.len(), 1);
        assert_eq!(catalog["decks"][0]["cardCount"], 1200);
        assert_eq!(catalog["decks"][0]["size"], 5242880);
        assert_eq!(
            changes[0].card_count,
            Some(FieldChange {
                old: json!(1000),
                new: 1200
            })
        );
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut catalog = json!({
            "decks": [{
                "name": "French",
                "downloadUrl": "https://cdn.example.com/French.apkg",
                "cardCount": 1,
                "size": 1
            }]
        });
        let lookup = CountLookup::from_records(&[record("French.apkg", 1200, 5242880)]);

        assert_eq!(reconcile(&mut catalog, "decks", &lookup).expect("first").len(), 1);
        let after_first = catalog.clone();
        assert!(reconcile(&mut catalog, "decks", &lookup).expect("second").is_empty());
        assert_eq!(catalog, after_first);
    }

    #[test]
    fn reconcile_preserves_other_fields_order_and_entries() {
        let mut catalog = json!({
            "version": 3,
            "decks": [
                {
                    "id": "fr",
                    "name": "French",
                    "downloadUrl": "https://cdn.example.com/French.apkg",
                    "tags": ["lang", "a1"],
                    "cardCount": 1,
                    "size": 2,
                    "featured": true
                },
                {
                    "id": "unknown",
                    "name": "Unmatched",
                    "downloadUrl": "https://cdn.example.com/Other.apkg",
                    "cardCount": 5,
                    "size": 6
                }
            ]
        });
        let before = catalog.clone();
        let lookup = CountLookup::from_records(&[record("French.apkg", 10, 20)]);

        reconcile(&mut catalog, "decks", &lookup).expect("reconcile");

        let deck = catalog["decks"][0].as_object().expect("object");
        let keys: Vec<&str> = deck.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["id", "name", "downloadUrl", "tags", "cardCount", "size", "featured"]
        );
        for key in ["id", "name", "downloadUrl", "tags", "featured"] {
            assert_eq!(deck[key], before["decks"][0][key]);
        }
        assert_eq!(catalog["decks"][1], before["decks"][1]);
        assert_eq!(catalog["version"], 3);
    }

    #[test]
    fn missing_fields_count_as_zero() {
        let mut catalog = json!({
            "decks": [
                {"name": "Empty", "downloadUrl": "https://x.test/Empty.apkg"},
                {"name": "New", "downloadUrl": "https://x.test/New.apkg"}
            ]
        });
        let lookup = CountLookup::from_records(&[
            record("Empty.apkg", 0, 0),
            record("New.apkg", 4, 0),
        ]);

        let changes = reconcile(&mut catalog, "decks", &lookup).expect("reconcile");

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "New");
        assert!(changes[0].size.is_none());
        assert!(catalog["decks"][0].get("cardCount").is_none());
        assert_eq!(catalog["decks"][1]["cardCount"], 4);
        assert_eq!(catalog["decks"][1]["size"], 0);
    }

    #[test]
    fn non_integer_stored_count_is_replaced() {
        let mut catalog = json!({
            "decks": [{"name": "Str", "downloadUrl": "https://x.test/S.apkg", "cardCount": "12", "size": 3}]
        });
        let lookup = CountLookup::from_records(&[record("S.apkg", 12, 3)]);

        let changes = reconcile(&mut catalog, "decks", &lookup).expect("reconcile");
        assert_eq!(changes.len(), 1);
        assert_eq!(catalog["decks"][0]["cardCount"], 12);
    }

    #[test]
    fn later_duplicate_file_name_wins() {
        let lookup = CountLookup::from_records(&[
            record("Same.apkg", 1, 1),
            record("Same.apkg", 2, 2),
        ]);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get("Same.apkg"), Some(Measured { count: 2, size: 2 }));
    }

    #[test]
    fn entries_without_url_are_left_alone() {
        let mut catalog = json!({"decks": [{"name": "Manual", "cardCount": 9}]});
        let before = catalog.clone();
        let lookup = CountLookup::from_records(&[record("Manual.apkg", 1, 1)]);

        assert!(reconcile(&mut catalog, "decks", &lookup).expect("reconcile").is_empty());
        assert_eq!(catalog, before);
    }

    #[test]
    fn missing_decks_key_is_reported() {
        let mut catalog = json!({"items": []});
        let err = reconcile(&mut catalog, "decks", &CountLookup::default()).expect_err("fail");
        assert_eq!(err, "missing `decks` key");

        let mut catalog = json!({"decks": {}});
        let err = reconcile(&mut catalog, "decks", &CountLookup::default()).expect_err("fail");
        assert_eq!(err, "`decks` is not an array");
    }
}
