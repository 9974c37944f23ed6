//! Marshalling layer over the native binding.
//!
//! The gateway owns the (possibly absent) binding object, wraps every call in
//! the success/error envelope, and unwraps it for callers. It never retries;
//! retry policy belongs to callers.

use std::sync::Arc;

use serde_json::Value;

use crate::binding::{InitializeResult, InstanceBindingCallbacks, NativeBinding};
use crate::error::BridgeError;
use crate::types::{DisplayMode, EnvId, InstanceId, Size, SurfaceConstraints, Tag};

pub struct BridgeGateway {
    binding: Option<Arc<dyn NativeBinding>>,
}

impl BridgeGateway {
    /// Wrap a binding that may have failed to load. An absent binding makes
    /// every call fail with the fatal `BindingUnavailable` error.
    pub fn new(binding: Option<Arc<dyn NativeBinding>>) -> Self {
        if binding.is_none() {
            tracing::error!("Native binding failed to load; all bridge calls will fail");
        }
        Self { binding }
    }

    pub fn with_binding(binding: Arc<dyn NativeBinding>) -> Self {
        Self::new(Some(binding))
    }

    pub fn is_binding_available(&self) -> bool {
        self.binding.is_some()
    }

    fn binding(&self) -> Result<&Arc<dyn NativeBinding>, BridgeError> {
        self.binding.as_ref().ok_or(BridgeError::BindingUnavailable)
    }

    /// One-time process-wide setup. Failures here are fatal: no instance
    /// operations can proceed after one.
    pub fn initialize(
        &self,
        should_clean_up_prior_instances: bool,
    ) -> Result<InitializeResult, BridgeError> {
        self.binding()?
            .initialize(should_clean_up_prior_instances)
            .unwrap_fatal()
    }

    pub fn get_next_instance_id(&self) -> Result<InstanceId, BridgeError> {
        self.binding()?.get_next_instance_id().unwrap_result()
    }

    pub fn create_instance(
        &self,
        env_id: EnvId,
        instance_id: InstanceId,
        callbacks: InstanceBindingCallbacks,
        enable_debugger: bool,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .create_instance(env_id, instance_id, callbacks, enable_debugger)
            .unwrap_result()
    }

    pub fn destroy_instance(&self, instance_id: InstanceId) -> Result<(), BridgeError> {
        self.binding()?.destroy_instance(instance_id).unwrap_result()
    }

    /// Suspends until the bundle has been evaluated.
    pub async fn load_script(
        &self,
        instance_id: InstanceId,
        bundle: Vec<u8>,
        source_url: String,
    ) -> Result<(), BridgeError> {
        tracing::debug!(instance_id, source_url = %source_url, "load_script");
        self.binding()?
            .load_script(instance_id, bundle, source_url)
            .await
            .unwrap_result()
    }

    pub fn create_surface(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        app_key: String,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .create_surface(instance_id, tag, app_key)
            .unwrap_result()
    }

    pub fn start_surface(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        constraints: SurfaceConstraints,
        props: Value,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .start_surface(instance_id, tag, constraints, props)
            .unwrap_result()
    }

    pub fn update_surface_constraints(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        constraints: SurfaceConstraints,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .update_surface_constraints(instance_id, tag, constraints)
            .unwrap_result()
    }

    pub fn set_surface_rtl(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        is_rtl: bool,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .set_surface_rtl(instance_id, tag, is_rtl)
            .unwrap_result()
    }

    /// Suspends until the native surface has stopped rendering.
    pub async fn stop_surface(&self, instance_id: InstanceId, tag: Tag) -> Result<(), BridgeError> {
        tracing::debug!(instance_id, tag, "stop_surface");
        self.binding()?
            .stop_surface(instance_id, tag)
            .await
            .unwrap_result()
    }

    /// Suspends until the native surface has released its render target.
    pub async fn destroy_surface(
        &self,
        instance_id: InstanceId,
        tag: Tag,
    ) -> Result<(), BridgeError> {
        tracing::debug!(instance_id, tag, "destroy_surface");
        self.binding()?
            .destroy_surface(instance_id, tag)
            .await
            .unwrap_result()
    }

    pub fn set_surface_props(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        props: Value,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .set_surface_props(instance_id, tag, props)
            .unwrap_result()
    }

    pub fn set_surface_display_mode(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        mode: DisplayMode,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .set_surface_display_mode(instance_id, tag, mode)
            .unwrap_result()
    }

    pub async fn measure_surface(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        constraints: SurfaceConstraints,
    ) -> Result<Size, BridgeError> {
        self.binding()?
            .measure_surface(instance_id, tag, constraints)
            .await
            .unwrap_result()
    }

    /// Fire-and-forget; returns once the call has been issued.
    pub fn emit_component_event(
        &self,
        instance_id: InstanceId,
        tag: Tag,
        handler_name: &str,
        payload: Value,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .emit_component_event(instance_id, tag, handler_name, payload)
            .unwrap_result()
    }

    /// Fire-and-forget; returns once the call has been issued.
    pub fn call_rn_function(
        &self,
        instance_id: InstanceId,
        module_name: &str,
        function_name: &str,
        args: Value,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .call_rn_function(instance_id, module_name, function_name, args)
            .unwrap_result()
    }

    pub fn update_component_state(
        &self,
        instance_id: InstanceId,
        component_name: &str,
        tag: Tag,
        state: Value,
    ) -> Result<(), BridgeError> {
        self.binding()?
            .update_component_state(instance_id, component_name, tag, state)
            .unwrap_result()
    }

    pub fn register_font(&self, family: &str, path: &str) -> Result<(), BridgeError> {
        tracing::debug!(family, path, "register_font");
        self.binding()?.register_font(family, path).unwrap_result()
    }
}
