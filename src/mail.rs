// src/mail.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use sqlx::PgPool;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::{db, templating};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("failed to send email: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

#[async_trait]
pub trait MailClient: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

pub type DynMailClient = Arc<dyn MailClient>;

pub struct SmtpMailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailClient {
    pub fn new(smtp: &SmtpConfig, from_email: &str, from_name: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.username.clone(), smtp.password.clone()))
            .build();

        Ok(Self {
            transport,
            from: format!("{from_name} <{from_email}>"),
        })
    }
}

#[async_trait]
impl MailClient for SmtpMailClient {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.parse().map_err(|e| MailError::Address(format!("{e}")))?)
            .to(message.to.parse().map_err(|e| MailError::Address(format!("{e}")))?)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.body_html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Logs instead of delivering; for local development.
pub struct LogMailClient;

#[async_trait]
impl MailClient for LogMailClient {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        log::info!(
            "mail (log transport) to={} subject={:?} bytes={}",
            message.to,
            message.subject,
            message.body_html.len()
        );
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Default)]
pub struct RecordingMailClient {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailClient {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MailClient for RecordingMailClient {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// No active template with that name.
    Skipped,
}

/// Renders the named template with `vars` and sends it to `to`.
pub async fn send_template(
    pool: &PgPool,
    mailer: &dyn MailClient,
    name: &str,
    to: &str,
    vars: &HashMap<String, String>,
) -> Result<SendOutcome, crate::error::AppError> {
    let Some(template) = db::email_templates::get_active_by_name(pool, name).await? else {
        log::warn!("email template {name:?} missing or inactive, not sending to {to}");
        return Ok(SendOutcome::Skipped);
    };

    mailer
        .send(EmailMessage {
            to: to.to_string(),
            subject: templating::render(&template.subject, vars),
            body_html: templating::render(&template.html_body, vars),
        })
        .await?;

    log::info!("sent {name} email to {to}");
    Ok(SendOutcome::Sent)
}

/// Fire-and-log variant for notifications that must not fail the request.
pub async fn notify(pool: &PgPool, mailer: &dyn MailClient, name: &str, to: &str, vars: HashMap<String, String>) {
    if let Err(e) = send_template(pool, mailer, name, to, &vars).await {
        log::error!("failed to send {name} email to {to}: {e}");
    }
}

/// Builds a variable map from `(name, value)` pairs.
pub fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// `INR 2,499.00` style amount for email bodies.
pub fn format_amount(minor: i64, currency: &str) -> String {
    let negative = minor < 0;
    let minor = minor.unsigned_abs();
    let units = (minor / 100).to_string();
    let cents = minor % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, c) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{currency} {sign}{grouped}.{cents:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(249_900, "INR"), "INR 2,499.00");
        assert_eq!(format_amount(5, "USD"), "USD 0.05");
        assert_eq!(format_amount(123_456_789, "INR"), "INR 1,234,567.89");
        assert_eq!(format_amount(-1500, "INR"), "INR -15.00");
    }

    #[tokio::test]
    async fn recording_client_keeps_messages() {
        let client = RecordingMailClient::default();
        client
            .send(EmailMessage {
                to: "a@example.com".into(),
                subject: "Hi".into(),
                body_html: "<p>x</p>".into(),
            })
            .await
            .unwrap();
        assert_eq!(client.sent().len(), 1);
        assert_eq!(client.sent()[0].to, "a@example.com");
    }

    #[test]
    fn vars_builds_map() {
        let v = vars([("a", "1".to_string()), ("b", "2".to_string())]);
        assert_eq!(v.get("b").map(String::as_str), Some("2"));
    }
}
