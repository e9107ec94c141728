// src/services/extract.rs

//! Candidate-link discovery on entrance pages.
//!
//! Resolves every anchor against the entrance URL, keeps same-host
//! same-scheme targets, and filters them through the site rule's path
//! patterns. Output is deduplicated, lexicographically ordered and capped.

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SiteRule;
use crate::utils::resolve_url;

/// Path fragments that mark navigation or search pages, never articles.
const NAV_EXCLUDES: &[&str] = &["/search", "/sitemap", "/contact", "/privacy", "/tag/"];

/// Link extractor with the rule's patterns compiled once.
pub struct LinkExtractor {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    detail: Vec<Regex>,
    max_candidates: usize,
}

impl LinkExtractor {
    /// Compile the extractor for a site rule.
    pub fn for_rule(rule: &SiteRule) -> Result<Self> {
        Ok(Self {
            include: compile_all(&rule.include_patterns)?,
            exclude: compile_all(&rule.exclude_patterns)?,
            detail: compile_all(&rule.detail_patterns)?,
            max_candidates: rule.max_candidates,
        })
    }

    /// Extract candidate article URLs from an entrance page.
    pub fn extract(&self, base_url: &str, html: &str) -> Result<Vec<String>> {
        let base = Url::parse(base_url)?;
        let document = Html::parse_document(html);
        let anchor_sel = parse_selector("a[href]")?;

        let mut candidates = BTreeSet::new();
        for anchor in document.select(&anchor_sel) {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty()
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("javascript:")
            {
                continue;
            }

            let resolved = resolve_url(&base, href);
            let Ok(target) = Url::parse(&resolved) else {
                continue;
            };
            if target.scheme() != base.scheme() || target.host_str() != base.host_str() {
                continue;
            }
            if self.accepts_path(target.path()) {
                candidates.insert(resolved);
            }
        }

        Ok(candidates
            .into_iter()
            .take(self.max_candidates)
            .collect())
    }

    /// Apply exclusions first, then inclusion patterns, then the optional
    /// stricter article-shape tier.
    fn accepts_path(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        if NAV_EXCLUDES.iter().any(|nav| lower.contains(nav)) {
            return false;
        }
        if self.exclude.iter().any(|re| re.is_match(path)) {
            return false;
        }
        if !self.include.iter().any(|re| re.is_match(path)) {
            return false;
        }
        if !self.detail.is_empty() && !self.detail.iter().any(|re| re.is_match(path)) {
            return false;
        }
        true
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::pattern(p, e))
        })
        .collect()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
