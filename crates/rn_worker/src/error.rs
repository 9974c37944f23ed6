//! Error types for the worker coordinator.

/// Errors that can occur while coordinating the worker thread.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker has terminated")]
    Terminated,

    #[error("Worker channel closed")]
    ChannelClosed,

    #[error("Worker did not acknowledge readiness within the configured timeout")]
    HandshakeTimedOut,

    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),
}
