//! Notification dispatch.
//!
//! The notifier contract is a single `send(subject, body)`; the message
//! formats are fixed plain-text blocks.

pub mod smtp;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ParsedItem;

pub use smtp::SmtpNotifier;

/// Notification backend.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message. Failures are reported, never retried.
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Disabled notifier used when SMTP credentials are not configured.
/// Logs the would-be message and reports success.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, subject: &str, _body: &str) -> Result<()> {
        log::info!("SMTP not configured; skipping mail '{subject}'");
        Ok(())
    }
}

/// Subject for a new/updated item notification.
pub fn item_subject(site_name: &str, title: &str) -> String {
    format!("【{site_name}】新着/更新: {title}")
}

/// Fixed-format body: title line, date line, URL line, source line.
pub fn item_body(item: &ParsedItem, source: &str) -> String {
    let published = if item.published.is_empty() {
        "—"
    } else {
        item.published.as_str()
    };
    let updated = if item.updated.is_empty() {
        "—"
    } else {
        item.updated.as_str()
    };
    format!(
        "タイトル：{}\n公開日：{} / 最終更新：{}\nURL：{}\n出所：{}\n",
        item.title, published, updated, item.url, source
    )
}

/// Subject for a per-site fetch failure diagnostic.
pub fn failure_subject(site_name: &str) -> String {
    format!("【{site_name}】監視失敗")
}

/// Body for a per-site fetch failure diagnostic.
pub fn failure_body(url: &str, error: &str) -> String {
    format!("URL: {url}\nError: {error}\n")
}

/// Subject of the zero-new-items delivery probe.
pub fn probe_subject() -> String {
    "【サイト監視】テスト通知".to_string()
}

/// Body of the zero-new-items delivery probe.
pub fn probe_body() -> String {
    "新着0件でしたが、通知経路の確認メールです。".to_string()
}
