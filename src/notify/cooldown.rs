use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::{Notifier, Result};

/// Suppresses a subject that was sent less than `window` ago.
///
/// The check and the record happen under one lock, so two concurrent sends
/// of the same subject deliver at most once. If delivery fails the record
/// is rolled back and the next attempt goes through.
pub struct Cooldown<N> {
    inner: N,
    window: Duration,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl<N> Cooldown<N> {
    pub fn new(inner: N, window: Duration) -> Self {
        Self {
            inner,
            window,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }

    /// Record `subject` as sent now, unless it is still cooling down.
    fn try_claim(&self, subject: &str, now: Instant) -> bool {
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match last_sent.get(subject) {
            Some(previous) if now.duration_since(*previous) < self.window => false,
            _ => {
                last_sent.insert(subject.to_string(), now);
                true
            }
        }
    }

    fn release(&self, subject: &str, claimed_at: Instant) {
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if last_sent.get(subject) == Some(&claimed_at) {
            last_sent.remove(subject);
        }
    }
}

#[async_trait]
impl<N> Notifier for Cooldown<N>
where
    N: Notifier,
{
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let now = Instant::now();
        if !self.try_claim(subject, now) {
            debug!(subject, "suppressed by cooldown");
            return Ok(());
        }

        let result = self.inner.send(subject, body).await;
        if result.is_err() {
            self.release(subject, now);
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
