pub mod alerts;
pub mod health;
pub mod servers;
pub mod state;
