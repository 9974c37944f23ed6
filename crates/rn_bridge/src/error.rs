//! Structured error types for the native/script boundary.

use serde::{Deserialize, Serialize};

/// Structured error crossing the native boundary.
///
/// Carries a human-readable message, zero-or-more actionable suggestions, and
/// an optional native stack trace. This is the shape handed to the host's
/// error-reporting collaborator, so a recoverable-error UI can be shown
/// instead of crashing the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RnError {
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub stacktrace: Vec<String>,
}

impl RnError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
            stacktrace: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_stacktrace(mut self, frames: Vec<String>) -> Self {
        self.stacktrace = frames;
        self
    }
}

impl std::fmt::Display for RnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        for suggestion in &self.suggestions {
            write!(f, "\n  hint: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for RnError {}

/// Errors produced by the Bridge Gateway.
///
/// `BindingUnavailable` and `Fatal` abort instance creation and must reach
/// process-level error reporting; `Native` is reportable-and-continue.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The native binding object failed to load. No further instance
    /// creation can succeed.
    #[error("Native binding is unavailable")]
    BindingUnavailable,

    /// Initialization failed before any instance existed.
    #[error("Fatal initialization error: {0}")]
    Fatal(RnError),

    /// A native call failed after initialization.
    #[error("Native call failed: {0}")]
    Native(RnError),
}

impl BridgeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BindingUnavailable | Self::Fatal(_))
    }

    /// Flatten into the structured error shape handed to error handlers.
    pub fn into_rn_error(self) -> RnError {
        match self {
            Self::BindingUnavailable => RnError::new("Native binding is unavailable")
                .with_suggestion("Check that the native library is packaged with the application"),
            Self::Fatal(error) | Self::Native(error) => error,
        }
    }
}
