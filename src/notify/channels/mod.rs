mod discord;
mod email;
mod kafka;
mod slack;
mod telegram;

pub use discord::{DiscordChannel, Embed, EmbedField, EmbedFooter, Message, MessageBuilder};
pub use email::EmailChannel;
pub use kafka::{KafkaChannel, KafkaPayload};
pub use slack::SlackChannel;
pub use telegram::TelegramChannel;

use std::time::Duration;

use reqwest::Client;

use super::{NotifyError, Result};

/// Bound on one webhook request, connecting included.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

fn webhook_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Turn a non-success HTTP response into [`NotifyError::Status`].
async fn check_response(service: &str, response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Status {
        service: service.to_string(),
        status: status.as_u16(),
        body,
    })
}
