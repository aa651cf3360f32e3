use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

use crate::config::MailConfig;

/// Outbound notifications. Callers treat every send as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn welcome(&self, to: &str, name: &str) -> anyhow::Result<()>;
}

/// SMTP-backed notifier over an async transport.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .context("smtp relay")?
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();
        let from: Mailbox = config
            .from_address
            .parse()
            .context("parse MAIL_FROM address")?;
        Ok(Self { transport, from })
    }

    /// Connection probe run once at startup. The outcome is logged, never fatal.
    pub async fn verify(&self) -> anyhow::Result<bool> {
        let ok = self
            .transport
            .test_connection()
            .await
            .context("smtp test connection")?;
        Ok(ok)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        let recipient: Mailbox = to.parse().context("parse recipient address")?;
        let text = format!(
            "Hello {name},\n\n\
             Welcome to Signon! Your account has been created successfully.\n\
             We're glad to have you on board.\n"
        );
        let html = format!(
            "<p>Hello <strong>{name}</strong>,</p>\
             <p>Welcome to Signon! Your account has been created successfully.</p>\
             <p>We're glad to have you on board.</p>"
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject("Welcome to Signon - your account is ready!")
            .multipart(MultiPart::alternative_plain_html(text, html))
            .context("build welcome email")?;

        self.transport.send(message).await.context("smtp send")?;
        debug!(to = %to, "welcome email sent");
        Ok(())
    }
}

/// Stand-in when no mail transport is configured; records the skip and moves on.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn welcome(&self, to: &str, _name: &str) -> anyhow::Result<()> {
        debug!(to = %to, "mail transport not configured, skipping welcome email");
        Ok(())
    }
}

/// Builds the notifier for the loaded configuration: SMTP when configured,
/// otherwise the logging stand-in.
pub async fn from_config(mail: Option<&MailConfig>) -> anyhow::Result<Arc<dyn Notifier>> {
    match mail {
        Some(config) => {
            let notifier = SmtpNotifier::new(config)?;
            match notifier.verify().await {
                Ok(true) => info!(host = %config.smtp_host, "mail transport ready"),
                Ok(false) => warn!(host = %config.smtp_host, "mail transport refused the probe"),
                Err(error) => {
                    warn!(error = %error, host = %config.smtp_host, "mail transport verification failed")
                }
            }
            Ok(Arc::new(notifier) as Arc<dyn Notifier>)
        }
        None => {
            warn!("SMTP_HOST not set, welcome emails disabled");
            Ok(Arc::new(LogNotifier) as Arc<dyn Notifier>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_username: "mailer".into(),
            smtp_password: "hunter2".into(),
            from_address: "Signon <no-reply@example.com>".into(),
        }
    }

    // The async transport owns a connection pool that must be dropped on a
    // runtime, so these run under tokio even though new() itself is sync.
    #[tokio::test]
    async fn smtp_notifier_builds_from_config() {
        assert!(SmtpNotifier::new(&mail_config()).is_ok());
    }

    #[tokio::test]
    async fn bad_from_address_is_rejected() {
        let mut config = mail_config();
        config.from_address = "not an address".into();
        assert!(SmtpNotifier::new(&config).is_err());
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.welcome("ann@example.com", "Ann").await.is_ok());
    }
}
