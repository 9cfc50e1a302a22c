//! Human-agent notification.
//!
//! The webhook notifier posts a form (`email`, `message`) to a form-relay
//! endpoint such as Formspree. The log notifier writes the same content to
//! the tracing output, which is the default for local runs.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use support_harness_core::models::{ContactInfo, EscalationReason};

use crate::config::NotifyConfig;

/// Everything a human agent needs to pick up an escalation.
#[derive(Debug, Clone)]
pub struct Notification {
    pub session_id: String,
    pub reason: EscalationReason,
    pub summary: String,
    pub transcript: String,
    pub contact: ContactInfo,
}

impl Notification {
    /// Plain-text body shared by every notifier.
    pub fn message(&self) -> String {
        format!(
            "🔔 New Human Escalation Request!\n\n\
             Session: {}\nReason: {}\nEmail: {}\nPhone: {}\n\n\
             Summary:\n{}\n\nChat History:\n{}",
            self.session_id,
            self.reason,
            self.contact.email.as_deref().unwrap_or("(not provided)"),
            self.contact.phone.as_deref().unwrap_or("(not provided)"),
            self.summary,
            self.transcript,
        )
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

pub struct WebhookNotifier {
    url: String,
    sender: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, sender: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            sender: sender.into(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let message = notification.message();
        let form = [("email", self.sender.as_str()), ("message", message.as_str())];
        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .with_context(|| format!("notification POST to {} failed", self.url))?;
        let status = response.status();
        if !status.is_success() {
            bail!("notification endpoint returned {}", status);
        }
        info!(session_id = %notification.session_id, "escalation notification sent");
        Ok(())
    }
}

/// Writes notifications to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            session_id = %notification.session_id,
            reason = %notification.reason,
            email = notification.contact.email.as_deref().unwrap_or(""),
            phone = notification.contact.phone.as_deref().unwrap_or(""),
            summary = %notification.summary,
            "human escalation requested"
        );
        Ok(())
    }
}

pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}

pub fn create_notifier(config: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    match config.provider.as_str() {
        "webhook" => {
            let url = config
                .url
                .as_deref()
                .context("notify.url must be set when provider is 'webhook'")?;
            Ok(Arc::new(WebhookNotifier::new(
                url,
                config.sender.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        "log" => Ok(Arc::new(LogNotifier)),
        "disabled" => Ok(Arc::new(DisabledNotifier)),
        other => bail!("Unknown notify provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_includes_contact_and_history() {
        let n = Notification {
            session_id: "s1".to_string(),
            reason: EscalationReason::UserRequest,
            summary: "Wants a refund.".to_string(),
            transcript: "User: refund please\nAssistant: ok".to_string(),
            contact: ContactInfo {
                email: Some("a@b.com".to_string()),
                phone: None,
            },
        };
        let msg = n.message();
        assert!(msg.starts_with("🔔 New Human Escalation Request!"));
        assert!(msg.contains("Email: a@b.com"));
        assert!(msg.contains("Phone: (not provided)"));
        assert!(msg.contains("Reason: user_request"));
        assert!(msg.contains("User: refund please"));
    }

    #[test]
    fn test_webhook_requires_url() {
        let cfg = NotifyConfig {
            provider: "webhook".to_string(),
            ..NotifyConfig::default()
        };
        assert!(create_notifier(&cfg).is_err());
    }
}
