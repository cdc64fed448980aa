pub mod count_cards;
pub mod update_catalog;
