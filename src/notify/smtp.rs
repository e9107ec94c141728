// src/notify/smtp.rs

//! SMTP mail delivery via STARTTLS.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::error::Result;
use crate::notify::Notifier;

/// STARTTLS SMTP notifier.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Build the notifier from mail configuration.
    ///
    /// Returns `None` when credentials are absent; the caller should fall
    /// back to [`crate::notify::NullNotifier`] so a run without mail setup
    /// still records items.
    pub fn from_config(mail: &MailConfig) -> Result<Option<Self>> {
        let (Some(sender), Some(password)) = (&mail.sender, &mail.password) else {
            return Ok(None);
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.host)?
            .port(mail.port)
            .credentials(Credentials::new(sender.clone(), password.clone()))
            .build();

        let from: Mailbox = format!("{} <{}>", mail.from_name, sender).parse()?;
        let to: Mailbox = mail.recipient.parse()?;

        Ok(Some(Self {
            transport,
            from,
            to,
        }))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}
