//! Per-execution-context turbo-module factories.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::module::{AsyncTurboModuleCtor, TurboModule, TurboModuleContext, TurboModuleCtor};

/// Native-rendering architecture the host runs under. Worker-context module
/// availability depends on it: a module can be advertised absent under one
/// architecture so callers fall back to the UI-context equivalent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderArchitecture {
    #[default]
    Standard,
    Accelerated,
}

/// Common factory surface shared by both execution contexts.
pub trait TurboModuleFactory: Send + Sync {
    fn has_turbo_module(&self, name: &str) -> bool;

    /// `None` for unknown names. Absence of a module is a normal, expected
    /// outcome, not a fault.
    fn create_turbo_module(&self, name: &str) -> Option<Arc<dyn TurboModule>>;
}

/// Factory for the UI execution context.
///
/// Lazy modules are built on first reference. The eager subset is built once,
/// via [`prepare_eager_turbo_modules`](Self::prepare_eager_turbo_modules),
/// because its constructors have side effects (display metrics, status bar
/// height) that must happen deterministically at startup rather than on
/// first access.
pub struct UiTurboModuleFactory {
    ctx: TurboModuleContext,
    lazy: HashMap<String, TurboModuleCtor>,
    eager_ctors: HashMap<String, AsyncTurboModuleCtor>,
    eager: Mutex<HashMap<String, Arc<dyn TurboModule>>>,
}

impl UiTurboModuleFactory {
    pub fn new(ctx: TurboModuleContext) -> Self {
        Self {
            ctx,
            lazy: HashMap::new(),
            eager_ctors: HashMap::new(),
            eager: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, ctor: TurboModuleCtor) {
        self.lazy.insert(name.into(), ctor);
    }

    pub fn register_eager(&mut self, name: impl Into<String>, ctor: AsyncTurboModuleCtor) {
        self.eager_ctors.insert(name.into(), ctor);
    }

    /// Build every eager module. Suspends on each constructor; must complete
    /// before the factory serves its first lookup.
    pub async fn prepare_eager_turbo_modules(&self) {
        for (name, ctor) in &self.eager_ctors {
            let module = ctor(&self.ctx).await;
            self.eager.lock().insert(name.clone(), module);
            tracing::debug!(module = %name, "Eager turbo module prepared");
        }
    }
}

impl TurboModuleFactory for UiTurboModuleFactory {
    fn has_turbo_module(&self, name: &str) -> bool {
        self.lazy.contains_key(name) || self.eager_ctors.contains_key(name)
    }

    fn create_turbo_module(&self, name: &str) -> Option<Arc<dyn TurboModule>> {
        if let Some(module) = self.eager.lock().get(name) {
            return Some(Arc::clone(module));
        }
        self.lazy.get(name).map(|ctor| ctor(&self.ctx))
    }
}

/// Factory for the worker execution context. Smaller module set; lookups are
/// architecture-sensitive.
pub struct WorkerTurboModuleFactory {
    ctx: TurboModuleContext,
    architecture: RenderArchitecture,
    ctors: HashMap<String, TurboModuleCtor>,
    /// Modules hidden under the accelerated architecture; callers fall back
    /// to the UI-context equivalent.
    hidden_when_accelerated: HashSet<String>,
}

impl WorkerTurboModuleFactory {
    pub fn new(ctx: TurboModuleContext, architecture: RenderArchitecture) -> Self {
        Self {
            ctx,
            architecture,
            ctors: HashMap::new(),
            hidden_when_accelerated: HashSet::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, ctor: TurboModuleCtor) {
        self.ctors.insert(name.into(), ctor);
    }

    /// Advertise `name` as absent under the accelerated architecture.
    pub fn hide_when_accelerated(&mut self, name: impl Into<String>) {
        self.hidden_when_accelerated.insert(name.into());
    }
}

impl TurboModuleFactory for WorkerTurboModuleFactory {
    fn has_turbo_module(&self, name: &str) -> bool {
        if self.architecture == RenderArchitecture::Accelerated
            && self.hidden_when_accelerated.contains(name)
        {
            return false;
        }
        self.ctors.contains_key(name)
    }

    fn create_turbo_module(&self, name: &str) -> Option<Arc<dyn TurboModule>> {
        if !self.has_turbo_module(name) {
            return None;
        }
        self.ctors.get(name).map(|ctor| ctor(&self.ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rn_bridge::{BridgeGateway, NoopBinding};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeModule {
        name: &'static str,
    }

    impl TurboModule for FakeModule {
        fn name(&self) -> &str {
            self.name
        }
    }

    fn test_ctx() -> TurboModuleContext {
        TurboModuleContext {
            instance_id: 1,
            gateway: Arc::new(BridgeGateway::with_binding(Arc::new(NoopBinding::new()))),
        }
    }

    fn fake_ctor(name: &'static str) -> TurboModuleCtor {
        Arc::new(move |_| Arc::new(FakeModule { name }) as Arc<dyn TurboModule>)
    }

    #[test]
    fn unknown_module_is_none_not_error() {
        let factory = UiTurboModuleFactory::new(test_ctx());
        assert!(!factory.has_turbo_module("Clipboard"));
        assert!(factory.create_turbo_module("Clipboard").is_none());
    }

    #[test]
    fn lazy_module_is_built_on_reference() {
        let mut factory = UiTurboModuleFactory::new(test_ctx());
        factory.register("DeviceInfo", fake_ctor("DeviceInfo"));

        let module = factory.create_turbo_module("DeviceInfo").unwrap();
        assert_eq!(module.name(), "DeviceInfo");
    }

    #[tokio::test]
    async fn eager_modules_are_built_once_up_front() {
        let builds = Arc::new(AtomicUsize::new(0));
        let builds_in_ctor = Arc::clone(&builds);
        let ctor: AsyncTurboModuleCtor = Arc::new(move |_| {
            let builds = Arc::clone(&builds_in_ctor);
            Box::pin(async move {
                builds.fetch_add(1, Ordering::SeqCst);
                Arc::new(FakeModule {
                    name: "DisplayMetrics",
                }) as Arc<dyn TurboModule>
            })
        });

        let mut factory = UiTurboModuleFactory::new(test_ctx());
        factory.register_eager("DisplayMetrics", ctor);
        factory.prepare_eager_turbo_modules().await;
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let first = factory.create_turbo_module("DisplayMetrics").unwrap();
        let second = factory.create_turbo_module("DisplayMetrics").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn worker_factory_hides_modules_under_accelerated_architecture() {
        let mut standard =
            WorkerTurboModuleFactory::new(test_ctx(), RenderArchitecture::Standard);
        standard.register("WebSocket", fake_ctor("WebSocket"));
        standard.hide_when_accelerated("WebSocket");
        assert!(standard.has_turbo_module("WebSocket"));

        let mut accelerated =
            WorkerTurboModuleFactory::new(test_ctx(), RenderArchitecture::Accelerated);
        accelerated.register("WebSocket", fake_ctor("WebSocket"));
        accelerated.hide_when_accelerated("WebSocket");
        assert!(!accelerated.has_turbo_module("WebSocket"));
        assert!(accelerated.create_turbo_module("WebSocket").is_none());
    }
}
