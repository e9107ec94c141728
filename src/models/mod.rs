//! Data model structures.

pub mod item;
pub mod rule;

pub use item::ParsedItem;
pub use rule::{SeedPolicy, SiteRule, Sites};
