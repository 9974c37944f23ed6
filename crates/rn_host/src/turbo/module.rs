//! The turbo-module seam and constructor types.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rn_bridge::{BridgeGateway, InstanceId};

/// One native-capability module (device info, accessibility, networking).
///
/// At most one live instance exists per module name per execution context;
/// `on_destroy` runs when the owning context is destroyed.
pub trait TurboModule: Send + Sync {
    fn name(&self) -> &str;

    /// Explicit teardown hook, run once when the owning context dies.
    fn on_destroy(&self) {}
}

/// Context handed to turbo-module constructors.
#[derive(Clone)]
pub struct TurboModuleContext {
    pub instance_id: InstanceId,
    pub gateway: Arc<BridgeGateway>,
}

impl std::fmt::Debug for TurboModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurboModuleContext")
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

/// Constructor for a lazily built module, invoked on first reference.
pub type TurboModuleCtor =
    Arc<dyn Fn(&TurboModuleContext) -> Arc<dyn TurboModule> + Send + Sync>;

/// Constructor for an eagerly built module. Construction may suspend (reading
/// display metrics, querying the platform), which is why the eager set is
/// prepared in a dedicated async step before first use.
pub type AsyncTurboModuleCtor = Arc<
    dyn Fn(&TurboModuleContext) -> Pin<Box<dyn Future<Output = Arc<dyn TurboModule>> + Send>>
        + Send
        + Sync,
>;
