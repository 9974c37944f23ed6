//! The native-binding seam.
//!
//! `NativeBinding` is the raw call surface the platform library exposes.
//! Every method returns the tagged envelope; suspending operations block on
//! native work, the rest return once the call has been issued. Hosts link a
//! real implementation; tests (and hosts booting before the library is
//! linked) use [`NoopBinding`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mutation::{ComponentCommand, Mutation};
use crate::result::BridgeResult;
use crate::types::{DisplayMode, EnvId, InstanceId, Size, SurfaceConstraints, Tag};

/// Measures a run of text for the native layout pass.
pub type TextMeasurer = Arc<dyn Fn(&str, SurfaceConstraints) -> Size + Send + Sync>;

/// Callbacks the native side invokes against one instance.
#[derive(Clone)]
pub struct InstanceBindingCallbacks {
    /// Receives committed mutation batches, in commit order.
    pub on_mutations: Arc<dyn Fn(Vec<Mutation>) + Send + Sync>,
    /// Receives imperative component commands.
    pub on_command: Arc<dyn Fn(ComponentCommand) + Send + Sync>,
    /// Receives messages from the native C++ layer, keyed by message name.
    pub on_cpp_message: Arc<dyn Fn(String, Value) + Send + Sync>,
    /// Answers text-measurement requests during layout.
    pub measure_text: TextMeasurer,
}

impl std::fmt::Debug for InstanceBindingCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceBindingCallbacks").finish_non_exhaustive()
    }
}

/// Result of process-wide initialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub is_debug_mode_enabled: bool,
    pub env_id: EnvId,
}

/// The native call surface.
#[async_trait]
pub trait NativeBinding: Send + Sync {
    /// One-time process-wide setup.
    fn initialize(&self, should_clean_up_prior_instances: bool) -> BridgeResult<InitializeResult>;

    fn get_next_instance_id(&self) -> BridgeResult<InstanceId>;

    fn create_instance(
        &self,
        env_id: EnvId,
        instance_id: InstanceId,
        callbacks: InstanceBindingCallbacks,
        enable_debugger: bool,
    ) -> BridgeResult<()>;

    fn destroy_instance(&self, instance_id: InstanceId) -> BridgeResult<()>;

    /// Load a script bundle into the instance's execution context.
    async fn load_script(
        &self,
        instance_id: InstanceId,
        bundle: Vec<u8>,
        source_url: String,
    ) -> BridgeResult<()>;

    fn create_surface(&self, instance_id: InstanceId, tag: Tag, app_key: String)
    -> BridgeResult<()>;

    fn start_surface(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        constraints: SurfaceConstraints,
        props: Value,
    ) -> BridgeResult<()>;

    fn update_surface_constraints(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        constraints: SurfaceConstraints,
    ) -> BridgeResult<()>;

    fn set_surface_rtl(&self, instance_id: InstanceId, tag: Tag, is_rtl: bool) -> BridgeResult<()>;

    async fn stop_surface(&self, instance_id: InstanceId, tag: Tag) -> BridgeResult<()>;

    async fn destroy_surface(&self, instance_id: InstanceId, tag: Tag) -> BridgeResult<()>;

    fn set_surface_props(&self, instance_id: InstanceId, tag: Tag, props: Value)
    -> BridgeResult<()>;

    fn set_surface_display_mode(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        mode: DisplayMode,
    ) -> BridgeResult<()>;

    /// Measure the surface against the given constraints without rendering.
    async fn measure_surface(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        constraints: SurfaceConstraints,
    ) -> BridgeResult<Size>;

    /// Fire-and-forget: deliver a component event to script code.
    fn emit_component_event(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        handler_name: &str,
        payload: Value,
    ) -> BridgeResult<()>;

    /// Fire-and-forget: call a function on a script module.
    fn call_rn_function(
        &self,
        instance_id: InstanceId,
        module_name: &str,
        function_name: &str,
        args: Value,
    ) -> BridgeResult<()>;

    fn update_component_state(
        &self,
        instance_id: InstanceId,
        component_name: &str,
        tag: Tag,
        state: Value,
    ) -> BridgeResult<()>;

    fn register_font(&self, family: &str, path: &str) -> BridgeResult<()>;
}

/// Loopback binding that acknowledges every call.
///
/// Instance ids come from a local counter; measurement echoes the given
/// constraints. Used by tests and by hosts running without the platform
/// library.
#[derive(Debug, Default)]
pub struct NoopBinding {
    next_instance_id: AtomicU32,
}

impl NoopBinding {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NativeBinding for NoopBinding {
    fn initialize(&self, _should_clean_up_prior_instances: bool) -> BridgeResult<InitializeResult> {
        BridgeResult::ok(InitializeResult {
            is_debug_mode_enabled: false,
            env_id: 0,
        })
    }

    fn get_next_instance_id(&self) -> BridgeResult<InstanceId> {
        BridgeResult::ok(self.next_instance_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn create_instance(
        &self,
        _env_id: EnvId,
        _instance_id: InstanceId,
        _callbacks: InstanceBindingCallbacks,
        _enable_debugger: bool,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn destroy_instance(&self, _instance_id: InstanceId) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    async fn load_script(
        &self,
        _instance_id: InstanceId,
        _bundle: Vec<u8>,
        _source_url: String,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn create_surface(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        _app_key: String,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn start_surface(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        _constraints: SurfaceConstraints,
        _props: Value,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn update_surface_constraints(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        _constraints: SurfaceConstraints,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn set_surface_rtl(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        _is_rtl: bool,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    async fn stop_surface(&self, _instance_id: InstanceId, _tag: Tag) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    async fn destroy_surface(&self, _instance_id: InstanceId, _tag: Tag) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn set_surface_props(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        _props: Value,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn set_surface_display_mode(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        _mode: DisplayMode,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    async fn measure_surface(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        constraints: SurfaceConstraints,
    ) -> BridgeResult<Size> {
        BridgeResult::ok(Size {
            width: constraints.width,
            height: constraints.height,
        })
    }

    fn emit_component_event(
        &self,
        _instance_id: InstanceId,
        _tag: Tag,
        _handler_name: &str,
        _payload: Value,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn call_rn_function(
        &self,
        _instance_id: InstanceId,
        _module_name: &str,
        _function_name: &str,
        _args: Value,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn update_component_state(
        &self,
        _instance_id: InstanceId,
        _component_name: &str,
        _tag: Tag,
        _state: Value,
    ) -> BridgeResult<()> {
        BridgeResult::ok(())
    }

    fn register_font(&self, _family: &str, _path: &str) -> BridgeResult<()> {
        BridgeResult::ok(())
    }
}
