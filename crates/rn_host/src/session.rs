//! Process-wide host session.

use std::sync::Arc;

use rn_bridge::{BridgeGateway, EnvId, NativeBinding};
use rn_worker::WorkerThread;

use crate::error::{ErrorHandler, InstanceError, LoggingErrorHandler};
use crate::registry::RnInstanceRegistry;

/// Options for bringing up a session.
pub struct HostSessionOptions {
    pub binding: Option<Arc<dyn NativeBinding>>,
    pub worker: Option<Arc<WorkerThread>>,
    pub error_handler: Arc<dyn ErrorHandler>,
    /// Ask the native side to clean up instances left over from a previous
    /// process incarnation.
    pub should_clean_up_prior_instances: bool,
}

impl Default for HostSessionOptions {
    fn default() -> Self {
        Self {
            binding: None,
            worker: None,
            error_handler: Arc::new(LoggingErrorHandler),
            should_clean_up_prior_instances: false,
        }
    }
}

/// One process-wide session over the native bridge: the gateway, the shared
/// worker (when configured), and the instance registry.
///
/// [`initialize`](Self::initialize) runs the one-time native setup; a failure
/// there is fatal and no session is produced.
pub struct HostSession {
    gateway: Arc<BridgeGateway>,
    instances: Arc<RnInstanceRegistry>,
    worker: Option<Arc<WorkerThread>>,
    env_id: EnvId,
    is_debug_mode_enabled: bool,
}

impl std::fmt::Debug for HostSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSession")
            .field("env_id", &self.env_id)
            .field("is_debug_mode_enabled", &self.is_debug_mode_enabled)
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

impl HostSession {
    pub fn initialize(options: HostSessionOptions) -> Result<Self, InstanceError> {
        let gateway = Arc::new(BridgeGateway::new(options.binding));
        let init = gateway.initialize(options.should_clean_up_prior_instances)?;
        tracing::info!(
            env_id = init.env_id,
            debug = init.is_debug_mode_enabled,
            "Host session initialized"
        );

        let instances = Arc::new(RnInstanceRegistry::new(
            Arc::clone(&gateway),
            init.env_id,
            options.worker.clone(),
            options.error_handler,
        ));
        Ok(Self {
            gateway,
            instances,
            worker: options.worker,
            env_id: init.env_id,
            is_debug_mode_enabled: init.is_debug_mode_enabled,
        })
    }

    pub fn gateway(&self) -> &Arc<BridgeGateway> {
        &self.gateway
    }

    pub fn instances(&self) -> &Arc<RnInstanceRegistry> {
        &self.instances
    }

    pub fn worker(&self) -> Option<&Arc<WorkerThread>> {
        self.worker.as_ref()
    }

    pub fn env_id(&self) -> EnvId {
        self.env_id
    }

    pub fn is_debug_mode_enabled(&self) -> bool {
        self.is_debug_mode_enabled
    }

    /// Delete every instance, then stop the worker. Deletion failures are
    /// logged and do not stop the remaining teardown.
    pub async fn shutdown(&self) {
        for id in self.instances.ids() {
            if let Err(error) = self.instances.delete_instance(id).await {
                tracing::warn!(instance_id = id, %error, "Failed to delete instance");
            }
        }
        if let Some(worker) = &self.worker {
            worker.terminate();
        }
        tracing::info!("Host session shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RnInstanceOptions;
    use rn_bridge::NoopBinding;

    #[test]
    fn initialize_without_a_binding_is_fatal() {
        let error = HostSession::initialize(HostSessionOptions::default()).unwrap_err();
        assert!(error.is_fatal());
    }

    #[tokio::test]
    async fn session_creates_and_shuts_down_instances() {
        let session = HostSession::initialize(HostSessionOptions {
            binding: Some(Arc::new(NoopBinding::new())),
            ..Default::default()
        })
        .unwrap();
        assert!(!session.is_debug_mode_enabled());

        let instance = session
            .instances()
            .create_instance(RnInstanceOptions::default(), Vec::new(), Default::default())
            .await
            .unwrap();
        instance.load_script(b"...".to_vec(), "bundle.js").await.unwrap();
        assert_eq!(session.instances().len(), 1);

        session.shutdown().await;
        assert!(session.instances().is_empty());
        assert!(instance.is_destroyed());
    }
}
