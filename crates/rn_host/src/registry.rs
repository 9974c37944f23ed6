//! Registry of live instances.

use std::sync::Arc;

use dashmap::DashMap;

use rn_bridge::{BridgeGateway, EnvId, InstanceId};
use rn_worker::{MessageKind, WorkerMessage, WorkerThread};

use crate::error::{ErrorHandler, InstanceError};
use crate::instance::{InstanceCollaborators, RnInstance};
use crate::options::RnInstanceOptions;
use crate::package::RnPackage;

/// Owns every live instance and runs their creation and deletion protocols.
///
/// Creation is sequenced worker-first: worker-side state for an id is
/// provisioned and acknowledged before the UI-side instance exists, so script
/// code never observes a half-provisioned pair.
pub struct RnInstanceRegistry {
    gateway: Arc<BridgeGateway>,
    env_id: EnvId,
    instances: DashMap<InstanceId, Arc<RnInstance>>,
    worker: Option<Arc<WorkerThread>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl RnInstanceRegistry {
    pub fn new(
        gateway: Arc<BridgeGateway>,
        env_id: EnvId,
        worker: Option<Arc<WorkerThread>>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            gateway,
            env_id,
            instances: DashMap::new(),
            worker,
            error_handler,
        }
    }

    /// Create, provision, and register one instance.
    ///
    /// The registry only holds instances that initialized successfully; a
    /// failure at any step leaves no entry behind.
    pub async fn create_instance(
        &self,
        options: RnInstanceOptions,
        packages: Vec<Arc<dyn RnPackage>>,
        collaborators: InstanceCollaborators,
    ) -> Result<Arc<RnInstance>, InstanceError> {
        let id = self.gateway.get_next_instance_id()?;

        let worker_provisioned = if options.uses_worker {
            if let Some(worker) = &self.worker {
                worker
                    .post_and_wait(
                        WorkerMessage::CreateInstance { instance_id: id },
                        MessageKind::InstanceCreated,
                        |m| {
                            matches!(m, WorkerMessage::InstanceCreated { instance_id }
                                if *instance_id == id)
                        },
                    )
                    .await?;
                true
            } else {
                tracing::warn!(
                    instance_id = id,
                    "Instance requested worker state but no worker is running"
                );
                false
            }
        } else {
            false
        };

        match self.provision(id, options, packages, collaborators).await {
            Ok(instance) => {
                self.instances.insert(id, Arc::clone(&instance));
                Ok(instance)
            }
            Err(error) => {
                // Worker-side state for this id must not outlive the failed
                // creation.
                if worker_provisioned {
                    if let Err(rollback) = self.worker_destroy_exchange(id).await {
                        tracing::warn!(
                            instance_id = id,
                            error = %rollback,
                            "Failed to roll back worker state after failed creation"
                        );
                    }
                }
                Err(error)
            }
        }
    }

    async fn provision(
        &self,
        id: InstanceId,
        options: RnInstanceOptions,
        packages: Vec<Arc<dyn RnPackage>>,
        collaborators: InstanceCollaborators,
    ) -> Result<Arc<RnInstance>, InstanceError> {
        for font in &options.fonts {
            self.gateway.register_font(&font.family, &font.path)?;
        }

        let instance = RnInstance::new(
            id,
            self.env_id,
            Arc::clone(&self.gateway),
            options,
            &packages,
            collaborators,
            Arc::clone(&self.error_handler),
        );
        instance.initialize().await?;
        Ok(instance)
    }

    async fn worker_destroy_exchange(&self, id: InstanceId) -> Result<(), InstanceError> {
        if let Some(worker) = &self.worker {
            worker
                .post_and_wait(
                    WorkerMessage::DestroyInstance { instance_id: id },
                    MessageKind::InstanceDestroyed,
                    |m| {
                        matches!(m, WorkerMessage::InstanceDestroyed { instance_id }
                            if *instance_id == id)
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Delete an instance. `Ok(false)` when the id is unknown, so double
    /// deletion is observable but harmless.
    ///
    /// The entry is removed before teardown begins; a concurrent second call
    /// for the same id finds no entry and does nothing.
    pub async fn delete_instance(&self, id: InstanceId) -> Result<bool, InstanceError> {
        let Some((_, instance)) = self.instances.remove(&id) else {
            tracing::warn!(instance_id = id, "delete_instance for an unknown id");
            return Ok(false);
        };

        instance.destroy().await?;

        if instance.uses_worker() {
            self.worker_destroy_exchange(id).await?;
        }

        tracing::info!(instance_id = id, "Instance deleted");
        Ok(true)
    }

    pub fn get(&self, id: InstanceId) -> Option<Arc<RnInstance>> {
        self.instances.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
