use async_trait::async_trait;
use tracing::warn;

use super::{ChannelFailure, Notifier, NotifyError, Result};

/// Sends to every channel in order, regardless of earlier failures.
///
/// Any failure is reported as [`NotifyError::Partial`] after all channels
/// were attempted. An empty fan-out always succeeds.
#[derive(Default)]
pub struct FanOut {
    channels: Vec<Box<dyn Notifier>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<N>(&mut self, channel: N)
    where
        N: Notifier + 'static,
    {
        self.channels.push(Box::new(channel));
    }

    pub fn with<N>(mut self, channel: N) -> Self
    where
        N: Notifier + 'static,
    {
        self.push(channel);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

#[async_trait]
impl Notifier for FanOut {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let mut failures = Vec::new();

        for channel in &self.channels {
            if let Err(error) = channel.send(subject, body).await {
                warn!(channel = channel.name(), "notification failed: {error}");
                failures.push(ChannelFailure {
                    channel: channel.name().to_string(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Partial(failures))
        }
    }

    fn name(&self) -> &str {
        "fanout"
    }
}
