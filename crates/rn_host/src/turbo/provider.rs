//! Per-context turbo-module instance cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::factory::TurboModuleFactory;
use super::module::TurboModule;

/// Owns the live turbo-module instances of one execution context.
///
/// At most one instance per module name; all instances are torn down with the
/// owning context, through each module's explicit destroy hook.
pub struct TurboModuleProvider {
    factory: Arc<dyn TurboModuleFactory>,
    instances: Mutex<HashMap<String, Arc<dyn TurboModule>>>,
    destroyed: AtomicBool,
}

impl TurboModuleProvider {
    pub fn new(factory: Arc<dyn TurboModuleFactory>) -> Self {
        Self {
            factory,
            instances: Mutex::new(HashMap::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn has_turbo_module(&self, name: &str) -> bool {
        self.factory.has_turbo_module(name)
    }

    /// Return the live instance for `name`, building it on first reference.
    /// `None` for unknown names.
    pub fn get_or_create(&self, name: &str) -> Option<Arc<dyn TurboModule>> {
        if self.destroyed.load(Ordering::SeqCst) {
            tracing::warn!(module = %name, "Turbo module requested after context teardown");
            return None;
        }
        let mut instances = self.instances.lock();
        if let Some(module) = instances.get(name) {
            return Some(Arc::clone(module));
        }
        let module = self.factory.create_turbo_module(name)?;
        instances.insert(name.to_string(), Arc::clone(&module));
        Some(module)
    }

    /// Run every module's teardown hook. Called once, when the owning context
    /// is destroyed; later calls are no-ops.
    pub fn destroy_all(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let instances: Vec<(String, Arc<dyn TurboModule>)> =
            self.instances.lock().drain().collect();
        for (name, module) in instances {
            module.on_destroy();
            tracing::debug!(module = %name, "Turbo module destroyed");
        }
    }
}
