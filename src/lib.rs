pub mod cli;
pub mod commands;
pub mod decks;
pub mod env_loader;
pub mod error;

pub use error::DeckCountError;
