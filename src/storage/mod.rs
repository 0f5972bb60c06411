//! Secondary metrics store
//!
//! The poller mirrors every successful collection and every alert
//! transition into a [`MetricsStore`]. Only an in-memory backend ships;
//! nothing survives a restart.

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::MetricsStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
