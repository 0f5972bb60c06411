//! Error types for the secondary metrics store

use std::fmt;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while writing to or reading from a store
#[derive(Debug)]
pub enum StoreError {
    /// The store cannot be reached or has been closed
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "metrics store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            StoreError::Unavailable("connection reset".to_string()).to_string(),
            "metrics store unavailable: connection reset"
        );
    }
}
