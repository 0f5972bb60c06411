use std::fmt;

/// Errors raised while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// A channel is missing a required setting or has an invalid one.
    #[error("channel not configured: {0}")]
    NotConfigured(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("{service} answered with status {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("kafka error: {0}")]
    Kafka(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Some channels of a fan-out failed; the others delivered.
    #[error("{}", PartialDisplay(.0))]
    Partial(Vec<ChannelFailure>),
}

/// One failing channel inside a fan-out.
#[derive(Debug)]
pub struct ChannelFailure {
    pub channel: String,
    pub error: NotifyError,
}

struct PartialDisplay<'a>(&'a [ChannelFailure]);

impl fmt::Display for PartialDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} channel(s) failed: ", self.0.len())?;
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.channel, failure.error)?;
        }
        Ok(())
    }
}

impl NotifyError {
    /// Names of the failing channels, if this is a partial failure.
    pub fn failed_channels(&self) -> Vec<&str> {
        match self {
            NotifyError::Partial(failures) => {
                failures.iter().map(|f| f.channel.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
