//! Outbound mail.
//!
//! [`SmtpMailer`] relays through the configured SMTP server over STARTTLS. Without an SMTP
//! host the service falls back to [`LogMailer`], which only writes messages to the log.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Mailer for the given settings.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.smtp_host {
        Some(_) => Ok(Arc::new(SmtpMailer::new(config)?)),
        None => {
            tracing::warn!("OSF_SMTP_HOST not set; outbound mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let host = config.smtp_host.as_deref().unwrap_or("localhost");
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        tracing::info!(host, port = config.smtp_port, "SMTP mailer initialized");

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<lettre::message::Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .to(parse_mailbox(to)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(to, subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to, "Failed to send email");
                Err(MailError::Transport(e.to_string()))
            }
        }
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        parse_mailbox(to)?;
        tracing::info!(to, subject, body, "Email not sent (no SMTP host configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_valid_address() {
        assert!(LogMailer.send("admin@example.com", "Hi", "Body").await.is_ok());
    }

    #[tokio::test]
    async fn log_mailer_rejects_invalid_address() {
        let err = LogMailer.send("not an address", "Hi", "Body").await.unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { .. }));
    }

    #[test]
    fn missing_smtp_host_falls_back_to_log_mailer() {
        assert!(from_config(&MailConfig::default()).is_ok());
    }
}
