// src/pipeline/run.rs

//! The monitor sweep.
//!
//! For each site: fetch entrances, discover candidates, parse details,
//! match keywords, consult the store, then hand the matches to the seed /
//! notification policy. Per-URL failures are logged and swallowed; store
//! failures abort the run.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::{HttpConfig, RunMode};
use crate::error::Result;
use crate::models::SiteRule;
use crate::notify::{
    self, Notifier, failure_body, failure_subject, item_body, item_subject,
};
use crate::pipeline::policy::{SiteMatch, SiteMode, most_recent, select_mode};
use crate::services::{LinkExtractor, create_client, parse_detail};
use crate::store::{SeenStore, identity_of};

/// Summary of one monitor run.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub entrance_total: usize,
    pub entrance_failures: usize,
    pub detail_total: usize,
    pub detail_failures: usize,
    pub matched: usize,
    pub recorded: usize,
    pub notified: usize,
    pub failure_mails: usize,
    pub probe_sent: bool,
}

/// Run one full sweep over all configured sites.
pub async fn run_monitor(
    http: &HttpConfig,
    run_mode: RunMode,
    sites: &[SiteRule],
    store: &SeenStore,
    notifier: &dyn Notifier,
) -> Result<RunOutcome> {
    let client = create_client(http)?;
    let mut outcome = RunOutcome::default();

    for rule in sites {
        let mode = select_mode(rule, store, run_mode)?;
        log::info!("Sweeping site '{}' in mode {:?}", rule.name, mode);

        let matches = sweep_site(&client, http, rule, notifier, &mut outcome).await?;
        dispatch_site(mode, rule, &matches, store, notifier, http, &mut outcome).await?;
    }

    if run_mode.force_empty_mail && outcome.notified == 0 && outcome.failure_mails == 0 {
        match notifier
            .send(&notify::probe_subject(), &notify::probe_body())
            .await
        {
            Ok(()) => outcome.probe_sent = true,
            Err(e) => log::error!("Failed to send delivery probe: {e}"),
        }
    }

    log::info!(
        "Run complete: {} matched, {} recorded, {} notified ({} entrance failures, {} detail failures)",
        outcome.matched,
        outcome.recorded,
        outcome.notified,
        outcome.entrance_failures,
        outcome.detail_failures
    );
    Ok(outcome)
}

/// Collect the matched items for one site across all its entrances.
///
/// A fetch failure aborts only the failing entrance. The first entrance
/// failure of a site may produce one diagnostic mail naming the site and
/// URL; further failures of the same site stay in the log.
async fn sweep_site(
    client: &reqwest::Client,
    http: &HttpConfig,
    rule: &SiteRule,
    notifier: &dyn Notifier,
    outcome: &mut RunOutcome,
) -> Result<Vec<SiteMatch>> {
    let extractor = LinkExtractor::for_rule(rule)?;
    let entrance_delay = Duration::from_millis(http.entrance_delay_ms);

    let mut matches: Vec<SiteMatch> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut failure_reported = false;

    for entrance in &rule.entrances {
        outcome.entrance_total += 1;

        let candidates = match fetch_candidates(client, &extractor, entrance).await {
            Ok(candidates) => candidates,
            Err(e) => {
                outcome.entrance_failures += 1;
                log::warn!("Failed to fetch entrance {entrance}: {e}");
                if !failure_reported {
                    failure_reported = true;
                    let subject = failure_subject(&rule.name);
                    let body = failure_body(entrance, &e.to_string());
                    match notifier.send(&subject, &body).await {
                        Ok(()) => outcome.failure_mails += 1,
                        Err(e) => log::error!("Failed to send failure mail: {e}"),
                    }
                }
                tokio::time::sleep(entrance_delay).await;
                continue;
            }
        };

        for url in candidates {
            if !visited.insert(url.clone()) {
                continue;
            }
            outcome.detail_total += 1;

            let item = match parse_detail(client, &url, rule).await {
                Ok(item) => item,
                Err(e) => {
                    outcome.detail_failures += 1;
                    log::warn!("Failed to fetch detail {url}: {e}");
                    continue;
                }
            };
            if !item.hit {
                continue;
            }
            outcome.matched += 1;

            let id = identity_of(&item, rule);
            matches.push(SiteMatch { item, id });
        }

        tokio::time::sleep(entrance_delay).await;
    }

    Ok(matches)
}

async fn fetch_candidates(
    client: &reqwest::Client,
    extractor: &LinkExtractor,
    entrance: &str,
) -> Result<Vec<String>> {
    let html = crate::services::fetch_text(client, entrance).await?;
    extractor.extract(entrance, &html)
}

/// Apply the site mode to the collected matches.
///
/// Every unknown identity is recorded exactly once regardless of mode,
/// before any send attempt: a failed notification still marks the item
/// seen and is not retried.
async fn dispatch_site(
    mode: SiteMode,
    rule: &SiteRule,
    matches: &[SiteMatch],
    store: &SeenStore,
    notifier: &dyn Notifier,
    http: &HttpConfig,
    outcome: &mut RunOutcome,
) -> Result<()> {
    let mut fresh: Vec<SiteMatch> = Vec::new();
    for m in matches {
        if store.is_known(&m.id)? {
            continue;
        }
        store.record(&m.item, &m.id, &rule.name)?;
        outcome.recorded += 1;
        fresh.push(m.clone());
    }

    match mode {
        SiteMode::Steady => {
            for m in &fresh {
                notify_item(notifier, rule, m, http, outcome).await;
            }
        }
        SiteMode::SilentSeed => {
            if !fresh.is_empty() {
                log::info!(
                    "Seeded {} items for '{}' without notification",
                    fresh.len(),
                    rule.name
                );
            }
        }
        SiteMode::NotifyLatest => {
            if let Some(idx) = most_recent(&fresh) {
                notify_item(notifier, rule, &fresh[idx], http, outcome).await;
            }
        }
        SiteMode::ForcedSample => {
            // Sample is picked from all matches, seen or not; the marker
            // is set after the attempt and never cleared.
            if let Some(idx) = most_recent(matches) {
                notify_item(notifier, rule, &matches[idx], http, outcome).await;
                store.mark_sample_sent(&rule.name)?;
            }
        }
    }

    Ok(())
}

async fn notify_item(
    notifier: &dyn Notifier,
    rule: &SiteRule,
    m: &SiteMatch,
    http: &HttpConfig,
    outcome: &mut RunOutcome,
) {
    let subject = item_subject(&rule.name, &m.item.title);
    let body = item_body(&m.item, &rule.name);
    match notifier.send(&subject, &body).await {
        Ok(()) => outcome.notified += 1,
        Err(e) => log::error!("Failed to send notification for {}: {e}", m.item.url),
    }
    tokio::time::sleep(Duration::from_millis(http.notify_delay_ms)).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::models::{ParsedItem, Sites};

    /// Notifier that records sent subjects, optionally failing every send.
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn subjects(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, subject: &str, _body: &str) -> Result<()> {
            if self.fail {
                return Err(AppError::config("send refused"));
            }
            self.sent.lock().unwrap().push(subject.to_string());
            Ok(())
        }
    }

    fn rule() -> SiteRule {
        Sites::default().sites.remove(0)
    }

    fn quick_http() -> HttpConfig {
        HttpConfig {
            entrance_delay_ms: 0,
            notify_delay_ms: 0,
            ..HttpConfig::default()
        }
    }

    fn site_match(url: &str, title: &str, published: &str) -> SiteMatch {
        let item = ParsedItem {
            url: url.into(),
            title: title.into(),
            published: published.into(),
            hit: true,
            ..ParsedItem::default()
        };
        let id = identity_of(&item, &rule());
        SiteMatch { item, id }
    }

    #[tokio::test]
    async fn silent_seed_records_without_notifying() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let mut outcome = RunOutcome::default();
        let matches = vec![
            site_match("https://a/", "補助金A", "2024.06.01"),
            site_match("https://b/", "補助金B", "2024.05.01"),
        ];

        dispatch_site(
            SiteMode::SilentSeed,
            &rule(),
            &matches,
            &store,
            &notifier,
            &quick_http(),
            &mut outcome,
        )
        .await
        .unwrap();

        assert_eq!(outcome.recorded, 2);
        assert_eq!(outcome.notified, 0);
        assert!(notifier.subjects().is_empty());
        assert!(store.has_any_seen_for(&rule().name).unwrap());
    }

    #[tokio::test]
    async fn notify_latest_mails_exactly_one_newest() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let mut outcome = RunOutcome::default();
        let matches = vec![
            site_match("https://a/", "古い補助金", "2024.05.01"),
            site_match("https://b/", "新しい補助金", "2024.06.01"),
        ];

        dispatch_site(
            SiteMode::NotifyLatest,
            &rule(),
            &matches,
            &store,
            &notifier,
            &quick_http(),
            &mut outcome,
        )
        .await
        .unwrap();

        assert_eq!(outcome.recorded, 2);
        assert_eq!(outcome.notified, 1);
        assert_eq!(
            notifier.subjects(),
            vec!["【滋賀プラザ】新着/更新: 新しい補助金"]
        );
    }

    #[tokio::test]
    async fn steady_state_notifies_only_unknown() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let known = site_match("https://a/", "既知の補助金", "2024.05.01");
        store.record(&known.item, &known.id, &rule().name).unwrap();

        let mut outcome = RunOutcome::default();
        let matches = vec![known, site_match("https://b/", "新規の補助金", "2024.06.01")];

        dispatch_site(
            SiteMode::Steady,
            &rule(),
            &matches,
            &store,
            &notifier,
            &quick_http(),
            &mut outcome,
        )
        .await
        .unwrap();

        assert_eq!(outcome.recorded, 1);
        assert_eq!(outcome.notified, 1);
        assert_eq!(
            notifier.subjects(),
            vec!["【滋賀プラザ】新着/更新: 新規の補助金"]
        );
    }

    #[tokio::test]
    async fn rerun_notifies_nothing() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let matches = vec![site_match("https://a/", "補助金", "2024.06.01")];

        for _ in 0..2 {
            let mut outcome = RunOutcome::default();
            dispatch_site(
                SiteMode::Steady,
                &rule(),
                &matches,
                &store,
                &notifier,
                &quick_http(),
                &mut outcome,
            )
            .await
            .unwrap();
        }

        // One send total across both runs.
        assert_eq!(notifier.subjects().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_still_records_item() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::failing();
        let mut outcome = RunOutcome::default();
        let matches = vec![site_match("https://a/", "補助金", "2024.06.01")];

        dispatch_site(
            SiteMode::Steady,
            &rule(),
            &matches,
            &store,
            &notifier,
            &quick_http(),
            &mut outcome,
        )
        .await
        .unwrap();

        assert_eq!(outcome.recorded, 1);
        assert_eq!(outcome.notified, 0);
        assert!(store.is_known(&matches[0].id).unwrap());
    }

    #[tokio::test]
    async fn forced_sample_sends_one_and_marks_site() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let mut outcome = RunOutcome::default();
        let matches = vec![
            site_match("https://a/", "古い補助金", "2024.05.01"),
            site_match("https://b/", "新しい補助金", "2024.06.01"),
        ];

        dispatch_site(
            SiteMode::ForcedSample,
            &rule(),
            &matches,
            &store,
            &notifier,
            &quick_http(),
            &mut outcome,
        )
        .await
        .unwrap();

        assert_eq!(notifier.subjects().len(), 1);
        assert!(store.sample_sent(&rule().name).unwrap());
    }

    #[tokio::test]
    async fn forced_sample_without_matches_leaves_marker_unset() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let mut outcome = RunOutcome::default();

        dispatch_site(
            SiteMode::ForcedSample,
            &rule(),
            &[],
            &store,
            &notifier,
            &quick_http(),
            &mut outcome,
        )
        .await
        .unwrap();

        assert!(notifier.subjects().is_empty());
        assert!(!store.sample_sent(&rule().name).unwrap());
    }

    #[tokio::test]
    async fn updated_date_change_is_a_new_event() {
        let store = SeenStore::open_in_memory().unwrap();
        let notifier = RecordingNotifier::new();
        let first = {
            let mut m = site_match("https://a/", "補助金", "2024.05.01");
            m.item.updated = "2024.05.01".into();
            m.id = identity_of(&m.item, &rule());
            m
        };
        store.record(&first.item, &first.id, &rule().name).unwrap();

        let mut second = first.clone();
        second.item.updated = "2024.06.01".into();
        second.id = identity_of(&second.item, &rule());

        let mut outcome = RunOutcome::default();
        dispatch_site(
            SiteMode::Steady,
            &rule(),
            &[second],
            &store,
            &notifier,
            &quick_http(),
            &mut outcome,
        )
        .await
        .unwrap();

        assert_eq!(outcome.notified, 1);
    }
}
