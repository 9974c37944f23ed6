//! Worker-side collaborator hosting the auxiliary execution context.

use rn_bridge::{InstanceId, RnError};

use crate::message::WorkerMessage;

/// The worker-side half of the coordinator protocol.
///
/// One environment lives inside the worker thread for the lifetime of the
/// process; every instance shares it. It runs entirely on the worker thread,
/// so implementations need no internal synchronization.
pub trait WorkerEnvironment: Send + 'static {
    /// Called for each readiness probe. Return `true` once the environment
    /// is ready to acknowledge; probes keep arriving every 100ms until then.
    fn on_ready_probe(&mut self) -> bool {
        true
    }

    /// Provision worker-side state for a new instance.
    fn create_instance(&mut self, instance_id: InstanceId) -> Result<(), RnError>;

    /// Tear down worker-side state for an instance.
    fn destroy_instance(&mut self, instance_id: InstanceId) -> Result<(), RnError>;

    /// Handle a custom message. A returned message is posted back to the
    /// coordinator.
    fn on_message(&mut self, kind: &str, payload: serde_json::Value) -> Option<WorkerMessage> {
        let _ = (kind, payload);
        None
    }
}

/// Environment with no worker-side state. Acknowledges readiness immediately
/// and accepts every instance.
#[derive(Debug, Default)]
pub struct NullWorkerEnvironment;

impl WorkerEnvironment for NullWorkerEnvironment {
    fn create_instance(&mut self, instance_id: InstanceId) -> Result<(), RnError> {
        tracing::debug!(instance_id, "Worker instance created (null environment)");
        Ok(())
    }

    fn destroy_instance(&mut self, instance_id: InstanceId) -> Result<(), RnError> {
        tracing::debug!(instance_id, "Worker instance destroyed (null environment)");
        Ok(())
    }
}
