use std::fmt;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::instrument;

use crate::config::EmailConfig;
use crate::notify::{Notifier, NotifyError, Result};

/// Plain-text mail over SMTP.
///
/// Port 465 uses implicit TLS, every other port STARTTLS. The sender
/// address doubles as the SMTP login.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

// The transport holds the SMTP credentials, so it stays out of the output.
impl fmt::Debug for EmailChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailChannel")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| NotifyError::NotConfigured(format!("email from address: {e}")))?;
        let to = config
            .to
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| NotifyError::NotConfigured(format!("email to address {addr}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if to.is_empty() {
            return Err(NotifyError::NotConfigured("email has no recipient".to_string()));
        }

        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.from.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from, to })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message> {
        let mut builder = Message::builder().from(self.from.clone());
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        builder
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailChannel {
    #[instrument(skip(self, body))]
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.message(subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}
