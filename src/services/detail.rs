// src/services/detail.rs

//! Article detail parsing.
//!
//! Extracts a title, best-effort publication/update dates and, for rules
//! that match against body text, the main content of the page. Missing or
//! malformed dates are normal states, never errors.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{ParsedItem, SiteRule};
use crate::services::fetch_text;
use crate::utils::collapse_whitespace;

/// `YYYY sep MM sep DD` with `.`, `/`, `-` or the 年/月/日 markers.
const DATE_BODY: &str = r"([0-9]{4})[./\-年]([01]?[0-9])[./\-月]([0-3]?[0-9])日?";

fn published_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"公開日\s*[:：]?\s*{DATE_BODY}")).expect("static regex")
    })
}

fn updated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?:最終更新日?|更新日)\s*[:：]?\s*{DATE_BODY}"))
            .expect("static regex")
    })
}

fn bare_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DATE_BODY).expect("static regex"))
}

/// Fetch a candidate URL and parse it into a [`ParsedItem`].
pub async fn parse_detail(
    client: &reqwest::Client,
    url: &str,
    rule: &SiteRule,
) -> Result<ParsedItem> {
    let html = fetch_text(client, url).await?;
    Ok(parse_document(url, &html, rule))
}

/// Parse a fetched document. Pure; all heuristics live here.
pub fn parse_document(url: &str, html: &str, rule: &SiteRule) -> ParsedItem {
    let document = Html::parse_document(html);
    let text = collapse_whitespace(&document.root_element().text().collect::<Vec<_>>().join(" "));

    let title = first_text(&document, "h1")
        .or_else(|| first_text(&document, "title"))
        .or_else(|| first_text(&document, "h2"))
        .unwrap_or_else(|| url.to_string());

    let published = find_date(published_re(), &text)
        .or_else(|| find_date(bare_date_re(), &text))
        .unwrap_or_default();
    let updated = find_date(updated_re(), &text).unwrap_or_default();

    let body = if rule.title_only {
        String::new()
    } else {
        body_text(&document)
    };

    let mut item = ParsedItem {
        url: url.to_string(),
        title,
        published,
        updated,
        body,
        hit: false,
    };
    item.hit = rule.matches(&item);
    item
}

/// Text of the first element matching the selector, if non-empty.
fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .map(element_text)
        .find(|t| !t.is_empty())
}

/// Main content text: prefer a content container, fall back to the body.
fn body_text(document: &Html) -> String {
    for selector in ["main", "article", "section"] {
        if let Some(text) = first_text(document, selector) {
            return text;
        }
    }
    first_text(document, "body").unwrap_or_default()
}

fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// First match of a date pattern, normalized to `YYYY.MM.DD`.
fn find_date(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    let year = caps.get(1)?.as_str();
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    Some(format!("{year}.{month:02}.{day:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sites;

    const URL: &str = "https://www.shigaplaza.or.jp/news/post1/";

    fn rule() -> crate::models::SiteRule {
        Sites::default().sites.remove(0)
    }

    #[test]
    fn title_prefers_h1() {
        let html = "<html><head><title>頁タイトル</title></head>\
                    <body><h1>補助金のご案内</h1><h2>副見出し</h2></body></html>";
        let item = parse_document(URL, html, &rule());
        assert_eq!(item.title, "補助金のご案内");
    }

    #[test]
    fn title_falls_back_to_document_title_then_h2() {
        let html = "<html><head><title>頁タイトル</title></head><body><p>本文</p></body></html>";
        assert_eq!(parse_document(URL, html, &rule()).title, "頁タイトル");

        let html = "<html><body><h2>副見出し</h2></body></html>";
        assert_eq!(parse_document(URL, html, &rule()).title, "副見出し");
    }

    #[test]
    fn title_falls_back_to_url() {
        let html = "<html><body><p>本文のみ</p></body></html>";
        assert_eq!(parse_document(URL, html, &rule()).title, URL);
    }

    #[test]
    fn extracts_labeled_dates() {
        let html = "<html><body><h1>補助金</h1>\
                    <p>公開日：2024.05.01</p><p>最終更新日：2024.06.02</p></body></html>";
        let item = parse_document(URL, html, &rule());
        assert_eq!(item.published, "2024.05.01");
        assert_eq!(item.updated, "2024.06.02");
    }

    #[test]
    fn normalizes_japanese_date_markers() {
        let html = "<html><body><h1>補助金</h1><p>更新日：2024年6月2日</p></body></html>";
        let item = parse_document(URL, html, &rule());
        assert_eq!(item.updated, "2024.06.02");
    }

    #[test]
    fn published_falls_back_to_first_bare_date() {
        let html = "<html><body><h1>補助金</h1><p>2024/05/01 掲載</p></body></html>";
        let item = parse_document(URL, html, &rule());
        assert_eq!(item.published, "2024.05.01");
        assert_eq!(item.updated, "");
    }

    #[test]
    fn missing_dates_are_empty_not_errors() {
        let html = "<html><body><h1>補助金</h1></body></html>";
        let item = parse_document(URL, html, &rule());
        assert_eq!(item.published, "");
        assert_eq!(item.updated, "");
    }

    #[test]
    fn body_prefers_main_content() {
        let html = "<html><body><nav>メニュー セミナー</nav>\
                    <main><p>講座の 案内</p></main></body></html>";
        let item = parse_document(URL, html, &rule());
        assert_eq!(item.body, "講座の 案内");
    }

    #[test]
    fn body_falls_back_to_document_body() {
        let html = "<html><body><p>講座の案内</p></body></html>";
        let item = parse_document(URL, html, &rule());
        assert_eq!(item.body, "講座の案内");
    }

    #[test]
    fn title_only_rule_skips_body() {
        let mut r = rule();
        r.title_only = true;
        let html = "<html><body><h1>補助金</h1><main>本文</main></body></html>";
        let item = parse_document(URL, html, &r);
        assert_eq!(item.body, "");
        assert!(item.hit);
    }

    #[test]
    fn hit_reflects_keyword_match() {
        let html = "<html><body><h1>イベント</h1><main>会場案内</main></body></html>";
        assert!(!parse_document(URL, html, &rule()).hit);

        let html = "<html><body><h1>イベント</h1><main>セミナー開催</main></body></html>";
        assert!(parse_document(URL, html, &rule()).hit);
    }
}
