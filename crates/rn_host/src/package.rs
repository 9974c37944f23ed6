//! Host-supplied capability packages.

use std::sync::Arc;

use rn_bridge::Tag;

use crate::component::ComponentManager;
use crate::turbo::{AsyncTurboModuleCtor, TurboModuleCtor};

/// Factory for a component manager, keyed by component name. Receives the
/// component's tag and (when known) its parent tag.
pub type ComponentManagerCtor =
    Arc<dyn Fn(Tag, Option<Tag>) -> Arc<dyn ComponentManager> + Send + Sync>;

/// One host capability package: contributes turbo modules and component
/// manager factories to an instance. Concrete module bodies are pluggable
/// and live outside this crate.
pub trait RnPackage: Send + Sync {
    fn name(&self) -> &str;

    /// Lazily constructed UI-context turbo modules.
    fn ui_turbo_modules(&self) -> Vec<(String, TurboModuleCtor)> {
        Vec::new()
    }

    /// Eagerly constructed UI-context turbo modules.
    fn eager_turbo_modules(&self) -> Vec<(String, AsyncTurboModuleCtor)> {
        Vec::new()
    }

    /// Worker-context turbo modules.
    fn worker_turbo_modules(&self) -> Vec<(String, TurboModuleCtor)> {
        Vec::new()
    }

    /// Worker-context module names to advertise as absent under the
    /// accelerated architecture.
    fn worker_modules_hidden_when_accelerated(&self) -> Vec<String> {
        Vec::new()
    }

    /// Component manager factories keyed by component name.
    fn component_managers(&self) -> Vec<(String, ComponentManagerCtor)> {
        Vec::new()
    }
}
