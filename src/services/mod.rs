//! Fetching, link discovery and article parsing services.

pub mod detail;
pub mod extract;
pub mod fetch;

pub use detail::{parse_detail, parse_document};
pub use extract::LinkExtractor;
pub use fetch::{create_client, fetch_text};
