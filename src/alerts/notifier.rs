//! Notification channels for lag alerts

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{ChatConfig, Settings, SmtpConfig};

/// Delivery of alert text through email and chat
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain-text email
    async fn send_email(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<(), NotifierError>;

    /// Post a message to the chat webhook
    async fn send_chat_alert(&self, text: &str) -> Result<(), NotifierError>;
}

/// Notifier backed by SMTP and an HTTP chat webhook
pub struct AlertNotifier {
    client: reqwest::Client,
    smtp: SmtpConfig,
    chat: ChatConfig,
}

impl AlertNotifier {
    /// Create a new notifier
    pub fn new(smtp: SmtpConfig, chat: ChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            smtp,
            chat,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.email.clone(), settings.chat.clone())
    }

    fn build_email(&self, subject: &str, body: &str, recipient: &str) -> Result<Message, NotifierError> {
        let from = self
            .smtp
            .sender()
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::Email(format!("Invalid sender address: {}", e)))?;
        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::Email(format!("Invalid recipient {}: {}", recipient, e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifierError::Email(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for AlertNotifier {
    async fn send_email(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<(), NotifierError> {
        let email = self.build_email(subject, body, recipient)?;

        // Unpooled transport: each send opens its own TLS session and quits it
        // once the message is accepted or rejected.
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp.smtp_host)
            .map_err(|e| NotifierError::Email(format!("Invalid SMTP host: {}", e)))?
            .port(self.smtp.smtp_port)
            .credentials(Credentials::new(
                self.smtp.smtp_username.clone(),
                self.smtp.smtp_password.clone(),
            ))
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| NotifierError::Email(format!("Failed to send email to {}: {}", recipient, e)))?;

        tracing::info!(
            recipient = %recipient,
            at = %chrono::Local::now(),
            "Email sent"
        );

        Ok(())
    }

    async fn send_chat_alert(&self, text: &str) -> Result<(), NotifierError> {
        let payload = serde_json::json!({ "text": text });

        let response = self
            .client
            .post(&self.chat.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifierError::Webhook(format!("Failed to send webhook: {}", e)))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(NotifierError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::info!(at = %chrono::Local::now(), "Chat alert sent");

        Ok(())
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Email error: {0}")]
    Email(String),
}
