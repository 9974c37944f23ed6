//! Typed message envelopes exchanged with the worker execution context.
//!
//! The message set is closed and enumerable. Request/acknowledgment pairs
//! carry their correlation id (the instance id) inline, so callers filter
//! with a payload predicate in `wait_for_message`.

use serde::{Deserialize, Serialize};

use rn_bridge::{InstanceId, RnError};

/// Message type key used to match messages in `wait_for_message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Ready,
    ReadyAck,
    CreateInstance,
    InstanceCreated,
    DestroyInstance,
    InstanceDestroyed,
    Error,
    Custom,
}

/// One typed envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerMessage {
    /// Readiness probe, posted by the coordinator until acknowledged.
    Ready,
    /// Worker's acknowledgment of a readiness probe.
    ReadyAck,
    /// Provision worker-side state for a new instance.
    CreateInstance { instance_id: InstanceId },
    /// Acknowledgment of `CreateInstance`.
    InstanceCreated { instance_id: InstanceId },
    /// Tear down worker-side state for an instance.
    DestroyInstance { instance_id: InstanceId },
    /// Acknowledgment of `DestroyInstance`.
    InstanceDestroyed { instance_id: InstanceId },
    /// Reserved channel for worker-side uncaught errors.
    Error { error: RnError },
    /// Application-defined exchange, keyed by `kind`.
    Custom {
        kind: String,
        payload: serde_json::Value,
    },
}

impl WorkerMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Ready => MessageKind::Ready,
            Self::ReadyAck => MessageKind::ReadyAck,
            Self::CreateInstance { .. } => MessageKind::CreateInstance,
            Self::InstanceCreated { .. } => MessageKind::InstanceCreated,
            Self::DestroyInstance { .. } => MessageKind::DestroyInstance,
            Self::InstanceDestroyed { .. } => MessageKind::InstanceDestroyed,
            Self::Error { .. } => MessageKind::Error,
            Self::Custom { .. } => MessageKind::Custom,
        }
    }
}
