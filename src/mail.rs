use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// SMTP delivery via lettre. Sends are awaited inline by the callers, so a
/// slow relay stalls the request that triggered it.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("smtp relay")?
            .port(cfg.port);
        if !cfg.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ));
        }
        let from = cfg.from.parse().context("parse smtp from address")?;
        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let recipient: Mailbox = to.parse().context("parse recipient address")?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .context("build email message")?;
        self.transport.send(message).await.context("smtp send")?;
        info!(to, subject, "email sent");
        Ok(())
    }
}

/// Records messages instead of sending them. Used by `AppState::fake()`.
#[derive(Default)]
pub struct MockMailer {
    pub sent: std::sync::Mutex<Vec<SentMail>>,
    pub fail: bool,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("mock mailer failure");
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_mailer_records_messages() {
        let mailer = MockMailer::default();
        mailer
            .send("a@x.com", "Confirm your email", "<a href=\"#\">here</a>")
            .await
            .expect("mock send should succeed");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].subject, "Confirm your email");
    }

    #[tokio::test]
    async fn failing_mock_mailer_errors() {
        let mailer = MockMailer::failing();
        let err = mailer.send("a@x.com", "s", "b").await.unwrap_err();
        assert!(err.to_string().contains("mock mailer failure"));
    }
}
