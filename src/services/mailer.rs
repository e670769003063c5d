use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::SmtpConfig,
    errors::{AppError, Result},
};

const MAIL_FAILURE_MESSAGE: &str = "Failed to send email";

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, username: &str, link: &str) -> Result<()>;
}

pub fn verification_body(username: &str, link: &str) -> String {
    format!(
        "<p>Hi {username},</p>\
         <p>Welcome to Aura. Please confirm your email address by opening the link below:</p>\
         <p><a href=\"{link}\">{link}</a></p>\
         <p>If you did not create an account you can ignore this message.</p>"
    )
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, username: &str, link: &str) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid email address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Verify your Aura account")
            .header(ContentType::TEXT_HTML)
            .body(verification_body(username, link))
            .map_err(|e| AppError::upstream(e.to_string(), MAIL_FAILURE_MESSAGE))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::upstream(e.to_string(), MAIL_FAILURE_MESSAGE))?;

        Ok(())
    }
}

/// Used when no SMTP relay is configured: the link goes to the log instead.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, username: &str, link: &str) -> Result<()> {
        tracing::info!(%to, %username, %link, "SMTP not configured, verification link logged");
        Ok(())
    }
}
