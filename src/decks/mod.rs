pub mod apkg;
pub mod catalog;
pub mod config;
pub mod discover;
pub mod paths;
pub mod results;
pub mod util;
pub mod warn;
