//! Error types and the host error-reporting seam.

use rn_bridge::{BridgeError, InstanceId, RnError, Tag};
use rn_worker::WorkerError;

/// Host collaborator receiving reportable (non-fatal) errors, so the
/// application can show a recoverable-error UI instead of crashing.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: RnError);
}

/// Default handler that routes reported errors to the log.
#[derive(Debug, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle(&self, error: RnError) {
        tracing::error!(
            message = %error.message,
            suggestions = ?error.suggestions,
            "Reported error"
        );
    }
}

/// Errors from instance creation and teardown.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Instance {0} has been destroyed")]
    Destroyed(InstanceId),
}

impl InstanceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bridge(e) if e.is_fatal())
    }
}

/// Invalid surface state-machine transitions are programmer errors in the
/// calling layer and fail synchronously at the call site.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Surface must be stopped before can be destroyed")]
    DestroyWhileRunning,

    #[error("Surface {tag} is already running")]
    AlreadyRunning { tag: Tag },

    #[error("Surface {tag} has been destroyed")]
    Destroyed { tag: Tag },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
