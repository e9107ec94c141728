// src/pipeline/policy.rs

//! Seed / notification policy.
//!
//! Chooses, per site and before any item is evaluated, how matched items
//! are handled for the run, and provides the best-effort recency
//! comparator used by the latest-only strategies.

use std::cmp::Ordering;

use crate::config::RunMode;
use crate::error::Result;
use crate::models::{ParsedItem, SeedPolicy, SiteRule};
use crate::store::SeenStore;

/// Per-site processing mode for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteMode {
    /// Unknown identities are recorded and notified; known ones skipped.
    Steady,

    /// First encounter: record everything, notify nothing.
    SilentSeed,

    /// First encounter: record everything, notify only the most recent.
    NotifyLatest,

    /// Operator override: one sample mail ever, most recent matched item.
    ForcedSample,
}

/// A matched item together with its content identity.
#[derive(Debug, Clone)]
pub struct SiteMatch {
    pub item: ParsedItem,
    pub id: String,
}

/// Choose the mode for a site. Called once per site per run.
pub fn select_mode(rule: &SiteRule, store: &SeenStore, run_mode: RunMode) -> Result<SiteMode> {
    if run_mode.force_sample && !store.sample_sent(&rule.name)? {
        return Ok(SiteMode::ForcedSample);
    }
    if store.has_any_seen_for(&rule.name)? {
        return Ok(SiteMode::Steady);
    }
    Ok(match rule.seed_policy {
        SeedPolicy::Silent => SiteMode::SilentSeed,
        SeedPolicy::NotifyLatest => SiteMode::NotifyLatest,
    })
}

/// Numeric recency key: the date string's digits concatenated.
///
/// A heuristic, not date parsing; `2024.05.01` and `2024年5月1日` both
/// normalize upstream, so equal-width keys compare correctly. `None`
/// (no digits) sorts last.
pub fn recency_key(date: &str) -> Option<u64> {
    let digits: String = date.chars().filter(|c| c.is_ascii_digit()).take(16).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Index of the best-effort most recent match, ties broken by URL
/// descending. `None` only for an empty slice.
pub fn most_recent(matches: &[SiteMatch]) -> Option<usize> {
    matches
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| cmp_recency(&a.item, &b.item))
        .map(|(idx, _)| idx)
}

fn cmp_recency(a: &ParsedItem, b: &ParsedItem) -> Ordering {
    match (
        recency_key(a.revision_date()),
        recency_key(b.revision_date()),
    ) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.url.cmp(&b.url)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.url.cmp(&b.url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sites;

    fn rule() -> SiteRule {
        Sites::default().sites.remove(0)
    }

    fn site_match(url: &str, published: &str) -> SiteMatch {
        SiteMatch {
            item: ParsedItem {
                url: url.into(),
                published: published.into(),
                ..ParsedItem::default()
            },
            id: url.into(),
        }
    }

    #[test]
    fn recency_key_from_normalized_date() {
        assert_eq!(recency_key("2024.05.01"), Some(20240501));
        assert_eq!(recency_key("2024.06.01"), Some(20240601));
        assert_eq!(recency_key(""), None);
        assert_eq!(recency_key("近日公開"), None);
    }

    #[test]
    fn most_recent_prefers_newer_date() {
        let matches = vec![
            site_match("https://a/", "2024.05.01"),
            site_match("https://b/", "2024.06.01"),
            site_match("https://c/", "2024.04.01"),
        ];
        assert_eq!(most_recent(&matches), Some(1));
    }

    #[test]
    fn unparsable_dates_sort_last() {
        let matches = vec![
            site_match("https://a/", ""),
            site_match("https://b/", "2024.01.01"),
        ];
        assert_eq!(most_recent(&matches), Some(1));
    }

    #[test]
    fn ties_break_by_url_descending() {
        let matches = vec![
            site_match("https://a/", "2024.05.01"),
            site_match("https://b/", "2024.05.01"),
        ];
        assert_eq!(most_recent(&matches), Some(1));
    }

    #[test]
    fn most_recent_of_empty_is_none() {
        assert_eq!(most_recent(&[]), None);
    }

    #[test]
    fn fresh_site_uses_rule_seed_policy() {
        let store = SeenStore::open_in_memory().unwrap();
        let mut r = rule();
        assert_eq!(
            select_mode(&r, &store, RunMode::default()).unwrap(),
            SiteMode::SilentSeed
        );
        r.seed_policy = SeedPolicy::NotifyLatest;
        assert_eq!(
            select_mode(&r, &store, RunMode::default()).unwrap(),
            SiteMode::NotifyLatest
        );
    }

    #[test]
    fn seen_site_runs_steady() {
        let store = SeenStore::open_in_memory().unwrap();
        let r = rule();
        store
            .record(&ParsedItem::default(), "id-1", &r.name)
            .unwrap();
        assert_eq!(
            select_mode(&r, &store, RunMode::default()).unwrap(),
            SiteMode::Steady
        );
    }

    #[test]
    fn force_sample_overrides_until_marked() {
        let store = SeenStore::open_in_memory().unwrap();
        let r = rule();
        let mode = RunMode {
            force_sample: true,
            force_empty_mail: false,
        };
        assert_eq!(
            select_mode(&r, &store, mode).unwrap(),
            SiteMode::ForcedSample
        );

        store.mark_sample_sent(&r.name).unwrap();
        // Marker set: the override no longer applies, normal selection runs.
        assert_eq!(select_mode(&r, &store, mode).unwrap(), SiteMode::SilentSeed);
    }
}
