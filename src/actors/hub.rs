//! Broadcast hub: fans events out to real-time subscribers.
//!
//! One task owns the subscriber map. Registration, removal and publishing
//! all arrive on its inbound queue, so the map needs no lock. Each
//! subscriber has a bounded buffer; a subscriber whose buffer is full when
//! an event arrives is dropped and its channel closed, so one slow reader
//! never delays the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use super::messages::{Frame, HubCommand, HubMessage};

const INBOUND_CAPACITY: usize = 1024;

struct HubActor {
    subscribers: HashMap<u64, mpsc::Sender<Frame>>,
    command_rx: mpsc::Receiver<HubCommand>,
}

impl HubActor {
    #[instrument(skip(self), name = "hub")]
    async fn run(mut self) {
        debug!("starting hub actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                HubCommand::Register { id, sender } => {
                    self.subscribers.insert(id, sender);
                    debug!(id, total = self.subscribers.len(), "subscriber registered");
                }
                HubCommand::Unregister { id } => {
                    if self.subscribers.remove(&id).is_some() {
                        debug!(id, total = self.subscribers.len(), "subscriber unregistered");
                    }
                }
                HubCommand::Publish(message) => self.publish(&message),
                HubCommand::Count { respond_to } => {
                    let _ = respond_to.send(self.subscribers.len());
                }
                HubCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        debug!("hub actor stopped");
    }

    fn publish(&mut self, message: &HubMessage) {
        let frame: Frame = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                error!("failed to serialize hub event: {e}");
                return;
            }
        };

        self.subscribers
            .retain(|id, sender| match sender.try_send(frame.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    info!(id, "dropping slow subscriber");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(id, "subscriber gone");
                    false
                }
            });
    }
}

/// Receiving side of one subscriber.
///
/// `recv` returns `None` once the hub dropped this subscriber or stopped.
pub struct Subscription {
    pub id: u64,
    receiver: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }
}

/// Handle for talking to the hub actor. Cheap to clone.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
    next_id: Arc<AtomicU64>,
    subscriber_buffer: usize,
}

impl HubHandle {
    /// Spawn the hub; every subscriber gets a buffer of `subscriber_buffer` frames.
    pub fn spawn(subscriber_buffer: usize) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(INBOUND_CAPACITY);

        let actor = HubActor {
            subscribers: HashMap::new(),
            command_rx: cmd_rx,
        };
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            next_id: Arc::new(AtomicU64::new(1)),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    pub async fn subscribe(&self) -> Result<Subscription> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);

        self.sender
            .send(HubCommand::Register { id, sender: tx })
            .await
            .context("failed to send Register command")?;

        Ok(Subscription { id, receiver: rx })
    }

    pub async fn unsubscribe(&self, id: u64) -> Result<()> {
        self.sender
            .send(HubCommand::Unregister { id })
            .await
            .context("failed to send Unregister command")?;
        Ok(())
    }

    /// Queue an event for fan-out without waiting.
    ///
    /// Returns `false` if the event was dropped because the hub is
    /// saturated or stopped.
    pub fn publish(&self, message: HubMessage) -> bool {
        match self.sender.try_send(HubCommand::Publish(message)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("hub inbound queue full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("hub stopped, event dropped");
                false
            }
        }
    }

    pub async fn subscriber_count(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Count { respond_to: tx })
            .await
            .context("failed to send Count command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(HubCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
