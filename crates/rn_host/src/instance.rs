//! One running script instance and everything scoped to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use rn_bridge::{
    BridgeError, BridgeGateway, ComponentCommand, EnvId, InstanceBindingCallbacks, InstanceId,
    Mutation, Size, Tag, TextMeasurer,
};

use crate::component::{ComponentCommandHub, ComponentManagerRegistry};
use crate::error::{ErrorHandler, InstanceError};
use crate::options::RnInstanceOptions;
use crate::package::{ComponentManagerCtor, RnPackage};
use crate::surface::{SurfaceHandle, SurfaceState};
use crate::turbo::{
    TurboModuleContext, TurboModuleProvider, UiTurboModuleFactory, WorkerTurboModuleFactory,
};

/// Applies committed mutation batches to the host's view tree.
///
/// The host UI layer implements this; it owns the actual native views.
pub trait DescriptorRegistry: Send + Sync {
    fn apply_mutations(&self, mutations: &[Mutation]);
}

/// Registry that discards every batch. Used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct NullDescriptorRegistry;

impl DescriptorRegistry for NullDescriptorRegistry {
    fn apply_mutations(&self, _mutations: &[Mutation]) {}
}

/// Host collaborators an instance delegates to.
pub struct InstanceCollaborators {
    pub descriptor_registry: Arc<dyn DescriptorRegistry>,
    pub text_measurer: TextMeasurer,
}

impl Default for InstanceCollaborators {
    fn default() -> Self {
        Self {
            descriptor_registry: Arc::new(NullDescriptorRegistry),
            text_measurer: Arc::new(|_, _| Size {
                width: 0.0,
                height: 0.0,
            }),
        }
    }
}

/// Listener for messages arriving from the native C++ layer.
pub type CppMessageListener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// One script execution context plus everything scoped to it: surfaces,
/// component managers, turbo modules, command routing.
///
/// Construction only allocates; [`initialize`](Self::initialize) provisions
/// the native side and must complete before any other operation.
pub struct RnInstance {
    id: InstanceId,
    env_id: EnvId,
    options: RnInstanceOptions,
    gateway: Arc<BridgeGateway>,
    collaborators: InstanceCollaborators,
    component_managers: Arc<ComponentManagerRegistry>,
    command_hub: Arc<ComponentCommandHub>,
    ui_factory: Arc<UiTurboModuleFactory>,
    turbo_modules: Arc<TurboModuleProvider>,
    worker_turbo_modules: Option<Arc<TurboModuleProvider>>,
    manager_ctors: HashMap<String, ComponentManagerCtor>,
    surfaces: DashMap<Tag, Arc<SurfaceHandle>>,
    cpp_message_listeners: Mutex<Vec<(u32, CppMessageListener)>>,
    next_listener_id: AtomicU32,
    next_surface_tag: AtomicU32,
    destroyed: AtomicBool,
    error_handler: Arc<dyn ErrorHandler>,
}

impl RnInstance {
    pub fn new(
        id: InstanceId,
        env_id: EnvId,
        gateway: Arc<BridgeGateway>,
        options: RnInstanceOptions,
        packages: &[Arc<dyn RnPackage>],
        collaborators: InstanceCollaborators,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Arc<Self> {
        let ctx = TurboModuleContext {
            instance_id: id,
            gateway: Arc::clone(&gateway),
        };

        let mut ui_factory = UiTurboModuleFactory::new(ctx.clone());
        let mut worker_factory = WorkerTurboModuleFactory::new(ctx, options.architecture);
        let mut manager_ctors: HashMap<String, ComponentManagerCtor> = HashMap::new();
        for package in packages {
            for (name, ctor) in package.ui_turbo_modules() {
                ui_factory.register(name, ctor);
            }
            for (name, ctor) in package.eager_turbo_modules() {
                ui_factory.register_eager(name, ctor);
            }
            for (name, ctor) in package.worker_turbo_modules() {
                worker_factory.register(name, ctor);
            }
            for name in package.worker_modules_hidden_when_accelerated() {
                worker_factory.hide_when_accelerated(name);
            }
            for (name, ctor) in package.component_managers() {
                manager_ctors.insert(name, ctor);
            }
        }
        let ui_factory = Arc::new(ui_factory);
        let worker_turbo_modules = options
            .uses_worker
            .then(|| Arc::new(TurboModuleProvider::new(Arc::new(worker_factory))));

        Arc::new(Self {
            id,
            env_id,
            options,
            gateway,
            collaborators,
            component_managers: Arc::new(ComponentManagerRegistry::new()),
            command_hub: Arc::new(ComponentCommandHub::new()),
            turbo_modules: Arc::new(TurboModuleProvider::new(
                Arc::clone(&ui_factory) as Arc<dyn crate::turbo::TurboModuleFactory>
            )),
            worker_turbo_modules,
            ui_factory,
            manager_ctors,
            surfaces: DashMap::new(),
            cpp_message_listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU32::new(0),
            next_surface_tag: AtomicU32::new(1),
            destroyed: AtomicBool::new(false),
            error_handler,
        })
    }

    /// Provision the native side of the instance and build the eager turbo
    /// modules. Must complete before any surface or script operation.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), InstanceError> {
        let callbacks = self.binding_callbacks();
        self.gateway
            .create_instance(self.env_id, self.id, callbacks, self.options.enable_debugger)?;
        self.ui_factory.prepare_eager_turbo_modules().await;
        tracing::info!(
            instance_id = self.id,
            name = %self.options.name,
            "Instance initialized"
        );
        Ok(())
    }

    /// Callbacks hold weak references; the native side must not keep the
    /// instance alive past its destruction.
    fn binding_callbacks(self: &Arc<Self>) -> InstanceBindingCallbacks {
        let on_mutations = {
            let weak = Arc::downgrade(self);
            Arc::new(move |mutations: Vec<Mutation>| {
                if let Some(instance) = weak.upgrade() {
                    instance.apply_mutations(mutations);
                }
            }) as Arc<dyn Fn(Vec<Mutation>) + Send + Sync>
        };
        let on_command = {
            let weak = Arc::downgrade(self);
            Arc::new(move |command: ComponentCommand| {
                if let Some(instance) = weak.upgrade() {
                    instance.command_hub.dispatch(&command);
                }
            }) as Arc<dyn Fn(ComponentCommand) + Send + Sync>
        };
        let on_cpp_message = {
            let weak = Arc::downgrade(self);
            Arc::new(move |name: String, payload: Value| {
                if let Some(instance) = weak.upgrade() {
                    instance.handle_cpp_message(&name, &payload);
                }
            }) as Arc<dyn Fn(String, Value) + Send + Sync>
        };
        InstanceBindingCallbacks {
            on_mutations,
            on_command,
            on_cpp_message,
            measure_text: Arc::clone(&self.collaborators.text_measurer),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn uses_worker(&self) -> bool {
        self.options.uses_worker
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn component_managers(&self) -> &Arc<ComponentManagerRegistry> {
        &self.component_managers
    }

    pub fn command_hub(&self) -> &Arc<ComponentCommandHub> {
        &self.command_hub
    }

    /// UI-context turbo modules.
    pub fn turbo_modules(&self) -> &Arc<TurboModuleProvider> {
        &self.turbo_modules
    }

    /// Worker-context turbo modules; `None` for instances without worker
    /// state.
    pub fn worker_turbo_modules(&self) -> Option<&Arc<TurboModuleProvider>> {
        self.worker_turbo_modules.as_ref()
    }

    /// Apply one committed mutation batch: view tree first, then the
    /// manager registry bookkeeping that hangs off it.
    pub fn apply_mutations(&self, mutations: Vec<Mutation>) {
        if self.is_destroyed() {
            tracing::warn!(instance_id = self.id, "Mutation batch after destroy; dropped");
            return;
        }
        self.collaborators.descriptor_registry.apply_mutations(&mutations);

        for mutation in &mutations {
            match mutation {
                Mutation::CreateView {
                    tag,
                    component_name,
                    ..
                } => {
                    if let Some(ctor) = self.manager_ctors.get(component_name) {
                        let (tag, ctor) = (*tag, Arc::clone(ctor));
                        self.component_managers
                            .find_or_create(tag, move || ctor(tag, None));
                    }
                }
                Mutation::InsertView {
                    parent_tag,
                    child_tag,
                    ..
                } => {
                    if let Some(manager) = self.component_managers.get(*child_tag) {
                        manager.set_parent_tag(Some(*parent_tag));
                    }
                }
                Mutation::RemoveView { child_tag, .. } => {
                    if let Some(manager) = self.component_managers.get(*child_tag) {
                        manager.set_parent_tag(None);
                    }
                }
                Mutation::UpdateView { .. } => {}
                Mutation::DeleteView { tag } => {
                    self.command_hub.unsubscribe(*tag);
                    self.component_managers.release(*tag);
                }
            }
        }
    }

    /// Subscribe to messages from the native C++ layer. Returns an id for
    /// [`remove_cpp_message_listener`](Self::remove_cpp_message_listener).
    pub fn add_cpp_message_listener(&self, listener: CppMessageListener) -> u32 {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.cpp_message_listeners.lock().push((id, listener));
        id
    }

    pub fn remove_cpp_message_listener(&self, id: u32) {
        self.cpp_message_listeners
            .lock()
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn handle_cpp_message(&self, name: &str, payload: &Value) {
        // Copy-on-call so a listener may (un)subscribe from its callback.
        let listeners: Vec<CppMessageListener> = self
            .cpp_message_listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(name, payload);
        }
    }

    /// Evaluate a script bundle in this instance's execution context.
    pub async fn load_script(
        &self,
        bundle: Vec<u8>,
        source_url: impl Into<String>,
    ) -> Result<(), InstanceError> {
        self.ensure_alive()?;
        self.gateway
            .load_script(self.id, bundle, source_url.into())
            .await?;
        Ok(())
    }

    /// Create a surface for `app_key`. Tags are allocated from a per-instance
    /// monotonic counter with a stride of 10; they are never reused, so a
    /// stale tag can always be distinguished from a live one.
    pub fn create_surface(
        &self,
        app_key: impl Into<String>,
    ) -> Result<Arc<SurfaceHandle>, InstanceError> {
        self.ensure_alive()?;
        // Surfaces destroyed through their own handle stay in the map until
        // swept; the sweep keeps the map bounded under mount/unmount churn.
        self.surfaces
            .retain(|_, surface| surface.state() != SurfaceState::Destroyed);
        let tag = self.next_surface_tag.fetch_add(10, Ordering::SeqCst);
        let surface = SurfaceHandle::new(
            self.id,
            tag,
            app_key.into(),
            self.options.default_props.clone(),
            Arc::clone(&self.gateway),
        )?;
        self.surfaces.insert(tag, Arc::clone(&surface));
        Ok(surface)
    }

    /// Live surface for `tag`; a handle that has reached `Destroyed` is
    /// dropped from the map and no longer returned.
    pub fn get_surface(&self, tag: Tag) -> Option<Arc<SurfaceHandle>> {
        let surface = self.surfaces.get(&tag).map(|entry| Arc::clone(&entry))?;
        if surface.state() == SurfaceState::Destroyed {
            self.surfaces.remove(&tag);
            return None;
        }
        Some(surface)
    }

    pub fn surfaces(&self) -> Vec<Arc<SurfaceHandle>> {
        self.surfaces
            .iter()
            .filter(|entry| entry.value().state() != SurfaceState::Destroyed)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Fire-and-forget event delivery to script code. Failures are routed to
    /// the error handler; there is no caller to return them to.
    pub fn emit_component_event(&self, tag: Tag, handler_name: &str, payload: Value) {
        if let Err(error) = self
            .gateway
            .emit_component_event(self.id, tag, handler_name, payload)
        {
            self.report(error);
        }
    }

    /// Fire-and-forget call into a script module.
    pub fn call_rn_function(&self, module_name: &str, function_name: &str, args: Value) {
        if let Err(error) = self
            .gateway
            .call_rn_function(self.id, module_name, function_name, args)
        {
            self.report(error);
        }
    }

    pub fn update_component_state(&self, component_name: &str, tag: Tag, state: Value) {
        if let Err(error) = self
            .gateway
            .update_component_state(self.id, component_name, tag, state)
        {
            self.report(error);
        }
    }

    fn report(&self, error: BridgeError) {
        self.error_handler.handle(error.into_rn_error());
    }

    fn ensure_alive(&self) -> Result<(), InstanceError> {
        if self.is_destroyed() {
            return Err(InstanceError::Destroyed(self.id));
        }
        Ok(())
    }

    /// Tear the instance down: surfaces first (stopping any still running),
    /// then turbo modules, then the native execution context. Idempotent;
    /// the flag flips before any teardown so re-entrant calls return
    /// immediately.
    pub async fn destroy(&self) -> Result<(), InstanceError> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(instance_id = self.id, name = %self.options.name, "Destroying instance");

        let surfaces: Vec<Arc<SurfaceHandle>> = {
            let tags: Vec<Tag> = self.surfaces.iter().map(|entry| *entry.key()).collect();
            tags.iter()
                .filter_map(|tag| self.surfaces.remove(tag).map(|(_, surface)| surface))
                .collect()
        };
        for surface in surfaces {
            if surface.is_running() {
                if let Err(error) = surface.stop().await {
                    tracing::warn!(tag = surface.tag(), %error, "Failed to stop surface");
                }
            }
            if let Err(error) = surface.destroy().await {
                tracing::warn!(tag = surface.tag(), %error, "Failed to destroy surface");
            }
        }

        self.turbo_modules.destroy_all();
        if let Some(worker_modules) = &self.worker_turbo_modules {
            worker_modules.destroy_all();
        }

        self.gateway.destroy_instance(self.id)?;
        Ok(())
    }
}
