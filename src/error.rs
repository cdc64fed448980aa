use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeckCountError {
    #[error("usage: archive-counter <decks-folder>")]
    Usage,
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("no {extension} files found under {}", .root.display())]
    NoArchivesFound { root: PathBuf, extension: String },
    #[error("no collection database ({candidates}) inside {}", .archive.display())]
    MissingDatabase { archive: PathBuf, candidates: String },
    #[error("catalog {} is invalid: {reason}", .path.display())]
    InvalidCatalog { path: PathBuf, reason: String },
    #[error("config invalid: {0}")]
    InvalidConfig(String),
}
