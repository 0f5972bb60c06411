//! Long-running tasks of the monitoring server.
//!
//! Each actor runs as an independent async task and is driven through a
//! cloneable handle that sends commands over an mpsc channel.
//!
//! ```text
//!   PollerActor ── tick ──► Poller::run_cycle ──► collectors (one task per agent)
//!        │                        │
//!        │                        ├─► notifier (fan-out + cooldown)
//!        │                        └─► HubActor ──► subscribers (bounded, drop-slow)
//!        └─ PollNow / Shutdown
//! ```
//!
//! Replies travel back on oneshot channels.

pub mod hub;
pub mod messages;
pub mod poller;

pub use hub::{HubHandle, Subscription};
pub use messages::{CycleReport, HubMessage};
pub use poller::{Poller, PollerHandle, PollerSettings};
