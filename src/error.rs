//! Error types for the notification fabric.

use thiserror::Error;

/// Main error type for publish operations.
///
/// Contract violations (double-add, removing an unknown subscriber, dropping
/// a publisher that still has subscribers) are debug assertions rather than
/// error values; see the crate documentation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("call pool exhausted: {live} calls in flight (capacity {capacity})")]
    PoolExhausted { live: usize, capacity: usize },
}

/// Result type for publish operations.
pub type Result<T> = std::result::Result<T, Error>;
