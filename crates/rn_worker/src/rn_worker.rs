//! Worker Thread Coordinator
//!
//! Manages the auxiliary script execution context that runs certain turbo
//! modules off the UI thread. One worker exists per process at most; all
//! instances share it. The coordinator owns the worker's OS thread, runs the
//! readiness handshake, and exposes typed post/wait messaging with
//! request/acknowledgment correlation.

pub mod environment;
pub mod error;
pub mod message;
pub mod thread;

pub use environment::{NullWorkerEnvironment, WorkerEnvironment};
pub use error::WorkerError;
pub use message::{MessageKind, WorkerMessage};
pub use thread::{WorkerErrorHandler, WorkerOptions, WorkerThread};
