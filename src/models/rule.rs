//! Site rule structures and the rules file loader.

use std::fs;
use std::path::Path;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ParsedItem;

/// First-run seeding strategy for a site with no prior seen records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Record the entire matching backlog without sending mail.
    #[default]
    Silent,

    /// Mail only the best-effort most recent match; record the rest silently.
    NotifyLatest,
}

/// Monitoring rule for one site. Loaded once at startup, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRule {
    /// Display label, also recorded as the source of each seen item
    pub name: String,

    /// Listing pages to sweep, in order
    pub entrances: Vec<String>,

    /// Keywords; any substring hit qualifies an article
    pub keywords: Vec<String>,

    /// Case-insensitive path patterns a candidate URL must match
    pub include_patterns: Vec<String>,

    /// Path patterns that reject a candidate, checked before inclusion
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Optional stricter article-path shape, required in addition to
    /// the inclusion patterns when configured
    #[serde(default)]
    pub detail_patterns: Vec<String>,

    /// Match keywords against the title alone instead of title + body
    #[serde(default)]
    pub title_only: bool,

    /// Identity depends on the URL alone, so content updates to a known
    /// URL never re-trigger a notification
    #[serde(default)]
    pub brand_new_only: bool,

    /// First-run seeding strategy
    #[serde(default)]
    pub seed_policy: SeedPolicy,

    /// Cap on candidate links taken from one entrance page
    #[serde(default = "defaults::max_candidates")]
    pub max_candidates: usize,
}

impl SiteRule {
    /// Whether the parsed item is relevant to this rule.
    ///
    /// Plain substring containment, OR across the keyword set.
    pub fn matches(&self, item: &ParsedItem) -> bool {
        self.keywords.iter().any(|k| {
            item.title.contains(k.as_str())
                || (!self.title_only && item.body.contains(k.as_str()))
        })
    }

    /// Validate rule values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("site name is empty"));
        }
        if self.entrances.is_empty() {
            return Err(AppError::validation(format!(
                "site '{}' has no entrance URLs",
                self.name
            )));
        }
        for entrance in &self.entrances {
            url::Url::parse(entrance)?;
        }
        if self.keywords.is_empty() {
            return Err(AppError::validation(format!(
                "site '{}' has no keywords",
                self.name
            )));
        }
        if self.include_patterns.is_empty() {
            return Err(AppError::validation(format!(
                "site '{}' has no include patterns",
                self.name
            )));
        }
        if self.max_candidates == 0 || self.max_candidates > 200 {
            return Err(AppError::validation(format!(
                "site '{}': max_candidates must be in 1..=200",
                self.name
            )));
        }
        for pattern in self
            .include_patterns
            .iter()
            .chain(&self.exclude_patterns)
            .chain(&self.detail_patterns)
        {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::pattern(pattern, e))?;
        }
        Ok(())
    }
}

/// Root rules file: the immutable list of monitored sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sites {
    pub sites: Vec<SiteRule>,
}

impl Sites {
    /// Load site rules from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load site rules or return the built-in defaults if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Failed to load site rules from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate every rule.
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(AppError::validation("no sites defined"));
        }
        for site in &self.sites {
            site.validate()?;
        }
        Ok(())
    }
}

impl Default for Sites {
    fn default() -> Self {
        Self {
            sites: defaults::default_sites(),
        }
    }
}

mod defaults {
    use super::{SeedPolicy, SiteRule};

    pub fn max_candidates() -> usize {
        100
    }

    pub fn default_sites() -> Vec<SiteRule> {
        vec![SiteRule {
            name: "滋賀プラザ".to_string(),
            entrances: vec![
                "https://www.shigaplaza.or.jp/news/support/subsidy/".to_string(),
                "https://www.shigaplaza.or.jp/service/support/subsidy/".to_string(),
                "https://www.shigaplaza.or.jp/service/hojyokin-introduction/".to_string(),
            ],
            keywords: vec![
                "補助金".to_string(),
                "支援金".to_string(),
                "講座".to_string(),
                "セミナー".to_string(),
            ],
            include_patterns: vec!["/news/".to_string()],
            exclude_patterns: Vec::new(),
            detail_patterns: Vec::new(),
            title_only: false,
            brand_new_only: false,
            seed_policy: SeedPolicy::Silent,
            max_candidates: max_candidates(),
        }]
    }
}
