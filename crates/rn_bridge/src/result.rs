//! Tagged call-result envelope used by every native-boundary call.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, RnError};

/// Result of one native call: a success payload or a structured error.
///
/// The raw tagged form never escapes the gateway; callers go through
/// [`unwrap_result`](BridgeResult::unwrap_result).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BridgeResult<T> {
    Ok { payload: T },
    Err { error: RnError },
}

impl<T> BridgeResult<T> {
    pub fn ok(payload: T) -> Self {
        Self::Ok { payload }
    }

    pub fn err(error: RnError) -> Self {
        Self::Err { error }
    }

    /// Convert the error branch into a thrown [`BridgeError::Native`].
    pub fn unwrap_result(self) -> Result<T, BridgeError> {
        match self {
            Self::Ok { payload } => Ok(payload),
            Self::Err { error } => Err(BridgeError::Native(error)),
        }
    }

    /// Like [`unwrap_result`](Self::unwrap_result), for initialization-class
    /// calls whose failure is fatal to the whole session.
    pub fn unwrap_fatal(self) -> Result<T, BridgeError> {
        match self {
            Self::Ok { payload } => Ok(payload),
            Self::Err { error } => Err(BridgeError::Fatal(error)),
        }
    }
}
