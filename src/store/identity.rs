// src/store/identity.rs

//! Content-addressed item identity.
//!
//! The identity is the dedup key: hash collisions are treated as "same
//! item" by design.

use sha2::{Digest, Sha256};

use crate::models::{ParsedItem, SiteRule};

/// Compute the stable identity of an item under a site rule.
///
/// `brand_new_only` rules hash the URL alone, so later content updates to
/// a known URL are not new events. Otherwise the revision date joins the
/// key, so an edited publish date re-triggers notification.
pub fn identity_of(item: &ParsedItem, rule: &SiteRule) -> String {
    let basis = if rule.brand_new_only {
        item.url.clone()
    } else {
        format!("{}|{}", item.url, item.revision_date())
    };
    sha_hex(&basis)
}

fn sha_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}
