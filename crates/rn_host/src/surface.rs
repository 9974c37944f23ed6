//! Surface handle: one root-level render surface of an instance.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use rn_bridge::{BridgeGateway, DisplayMode, InstanceId, Size, SurfaceConstraints, Tag};

use crate::error::SurfaceError;

/// Lifecycle state of a surface.
///
/// `Running` and `Stopped` are the only cyclable pair; `Destroyed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Created,
    Running,
    Stopped,
    Destroyed,
}

/// One root-level renderable tree (one mounted application screen).
///
/// Created when a host UI container mounts; destroyed when it unmounts,
/// always after `stop` has completed.
pub struct SurfaceHandle {
    instance_id: InstanceId,
    tag: Tag,
    app_key: String,
    default_props: Value,
    props: Mutex<Value>,
    state: Mutex<SurfaceState>,
    gateway: Arc<BridgeGateway>,
}

impl SurfaceHandle {
    pub(crate) fn new(
        instance_id: InstanceId,
        tag: Tag,
        app_key: String,
        default_props: Value,
        gateway: Arc<BridgeGateway>,
    ) -> Result<Arc<Self>, SurfaceError> {
        gateway.create_surface(instance_id, tag, app_key.clone())?;
        tracing::debug!(instance_id, tag, app_key = %app_key, "Surface created");
        Ok(Arc::new(Self {
            instance_id,
            tag,
            app_key,
            default_props,
            props: Mutex::new(Value::Null),
            state: Mutex::new(SurfaceState::Created),
            gateway,
        }))
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    pub fn state(&self) -> SurfaceState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SurfaceState::Running
    }

    /// Props the surface was last started or updated with.
    pub fn props(&self) -> Value {
        self.props.lock().clone()
    }

    /// Start rendering. Instance default props are merged with the supplied
    /// props; supplied keys win.
    pub fn start(
        &self,
        constraints: SurfaceConstraints,
        props: Value,
    ) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        match *state {
            SurfaceState::Destroyed => return Err(SurfaceError::Destroyed { tag: self.tag }),
            SurfaceState::Running => return Err(SurfaceError::AlreadyRunning { tag: self.tag }),
            SurfaceState::Created | SurfaceState::Stopped => {}
        }

        let merged = merge_props(&self.default_props, props);
        self.gateway
            .start_surface(self.instance_id, self.tag, constraints, merged.clone())?;
        *self.props.lock() = merged;
        *state = SurfaceState::Running;
        tracing::debug!(tag = self.tag, "Surface started");
        Ok(())
    }

    /// Stop rendering. Suspends until the native surface has stopped.
    pub async fn stop(&self) -> Result<(), SurfaceError> {
        {
            let state = self.state.lock();
            match *state {
                SurfaceState::Destroyed => {
                    return Err(SurfaceError::Destroyed { tag: self.tag });
                }
                SurfaceState::Created | SurfaceState::Stopped => {
                    tracing::warn!(tag = self.tag, "stop() on a surface that is not running");
                    return Ok(());
                }
                SurfaceState::Running => {}
            }
        }
        self.gateway.stop_surface(self.instance_id, self.tag).await?;
        *self.state.lock() = SurfaceState::Stopped;
        tracing::debug!(tag = self.tag, "Surface stopped");
        Ok(())
    }

    /// Destroy the surface. The native render target must be released before
    /// the logical handle disappears, so destroying a running surface is
    /// rejected; `stop()` it first.
    pub async fn destroy(&self) -> Result<(), SurfaceError> {
        {
            let mut state = self.state.lock();
            match *state {
                SurfaceState::Running => return Err(SurfaceError::DestroyWhileRunning),
                SurfaceState::Destroyed => {
                    return Err(SurfaceError::Destroyed { tag: self.tag });
                }
                SurfaceState::Created | SurfaceState::Stopped => {}
            }
            // The state flips before the suspending native call; a start()
            // arriving mid-destroy must not see Created/Stopped and run the
            // surface against a render target that is being released.
            *state = SurfaceState::Destroyed;
        }
        self.gateway
            .destroy_surface(self.instance_id, self.tag)
            .await?;
        tracing::debug!(tag = self.tag, "Surface destroyed");
        Ok(())
    }

    /// Forwarded immediately to the bridge; no buffering.
    pub fn update_constraints(
        &self,
        constraints: SurfaceConstraints,
    ) -> Result<(), SurfaceError> {
        self.ensure_not_destroyed()?;
        self.gateway
            .update_surface_constraints(self.instance_id, self.tag, constraints)?;
        Ok(())
    }

    pub fn update_rtl(&self, is_rtl: bool) -> Result<(), SurfaceError> {
        self.ensure_not_destroyed()?;
        self.gateway
            .set_surface_rtl(self.instance_id, self.tag, is_rtl)?;
        Ok(())
    }

    pub fn set_props(&self, props: Value) -> Result<(), SurfaceError> {
        self.ensure_not_destroyed()?;
        self.gateway
            .set_surface_props(self.instance_id, self.tag, props.clone())?;
        *self.props.lock() = props;
        Ok(())
    }

    pub fn set_display_mode(&self, mode: DisplayMode) -> Result<(), SurfaceError> {
        self.ensure_not_destroyed()?;
        self.gateway
            .set_surface_display_mode(self.instance_id, self.tag, mode)?;
        Ok(())
    }

    /// Read-only layout negotiation with the host container; valid in any
    /// state.
    pub async fn measure(&self, constraints: SurfaceConstraints) -> Result<Size, SurfaceError> {
        Ok(self
            .gateway
            .measure_surface(self.instance_id, self.tag, constraints)
            .await?)
    }

    fn ensure_not_destroyed(&self) -> Result<(), SurfaceError> {
        if self.state() == SurfaceState::Destroyed {
            return Err(SurfaceError::Destroyed { tag: self.tag });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("instance_id", &self.instance_id)
            .field("tag", &self.tag)
            .field("app_key", &self.app_key)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Key-by-key merge; supplied keys win over defaults.
fn merge_props(defaults: &Value, supplied: Value) -> Value {
    match (defaults, supplied) {
        (Value::Object(defaults), Value::Object(supplied)) => {
            let mut merged = defaults.clone();
            for (key, value) in supplied {
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (defaults, Value::Null) => defaults.clone(),
        (_, supplied) => supplied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rn_bridge::{
        BridgeResult, InitializeResult, InstanceBindingCallbacks, NativeBinding, NoopBinding,
    };
    use serde_json::json;
    use tokio::sync::Notify;

    fn test_surface(default_props: Value) -> Arc<SurfaceHandle> {
        let gateway = Arc::new(BridgeGateway::with_binding(Arc::new(NoopBinding::new())));
        SurfaceHandle::new(1, 1, "app".into(), default_props, gateway).unwrap()
    }

    /// Binding whose surface destruction blocks until the test releases it.
    struct GatedDestroyBinding {
        inner: NoopBinding,
        gate: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl NativeBinding for GatedDestroyBinding {
        fn initialize(&self, clean: bool) -> BridgeResult<InitializeResult> {
            self.inner.initialize(clean)
        }
        fn get_next_instance_id(&self) -> BridgeResult<InstanceId> {
            self.inner.get_next_instance_id()
        }
        fn create_instance(
            &self,
            env_id: rn_bridge::EnvId,
            instance_id: InstanceId,
            callbacks: InstanceBindingCallbacks,
            enable_debugger: bool,
        ) -> BridgeResult<()> {
            self.inner
                .create_instance(env_id, instance_id, callbacks, enable_debugger)
        }
        fn destroy_instance(&self, id: InstanceId) -> BridgeResult<()> {
            self.inner.destroy_instance(id)
        }
        async fn load_script(
            &self,
            id: InstanceId,
            bundle: Vec<u8>,
            url: String,
        ) -> BridgeResult<()> {
            self.inner.load_script(id, bundle, url).await
        }
        fn create_surface(&self, id: InstanceId, tag: Tag, key: String) -> BridgeResult<()> {
            self.inner.create_surface(id, tag, key)
        }
        fn start_surface(
            &self,
            id: InstanceId,
            tag: Tag,
            constraints: SurfaceConstraints,
            props: Value,
        ) -> BridgeResult<()> {
            self.inner.start_surface(id, tag, constraints, props)
        }
        fn update_surface_constraints(
            &self,
            id: InstanceId,
            tag: Tag,
            constraints: SurfaceConstraints,
        ) -> BridgeResult<()> {
            self.inner.update_surface_constraints(id, tag, constraints)
        }
        fn set_surface_rtl(&self, id: InstanceId, tag: Tag, rtl: bool) -> BridgeResult<()> {
            self.inner.set_surface_rtl(id, tag, rtl)
        }
        async fn stop_surface(&self, id: InstanceId, tag: Tag) -> BridgeResult<()> {
            self.inner.stop_surface(id, tag).await
        }
        async fn destroy_surface(&self, _id: InstanceId, _tag: Tag) -> BridgeResult<()> {
            self.gate.notified().await;
            BridgeResult::ok(())
        }
        fn set_surface_props(&self, id: InstanceId, tag: Tag, props: Value) -> BridgeResult<()> {
            self.inner.set_surface_props(id, tag, props)
        }
        fn set_surface_display_mode(
            &self,
            id: InstanceId,
            tag: Tag,
            mode: DisplayMode,
        ) -> BridgeResult<()> {
            self.inner.set_surface_display_mode(id, tag, mode)
        }
        async fn measure_surface(
            &self,
            id: InstanceId,
            tag: Tag,
            constraints: SurfaceConstraints,
        ) -> BridgeResult<Size> {
            self.inner.measure_surface(id, tag, constraints).await
        }
        fn emit_component_event(
            &self,
            id: InstanceId,
            tag: Tag,
            handler: &str,
            payload: Value,
        ) -> BridgeResult<()> {
            self.inner.emit_component_event(id, tag, handler, payload)
        }
        fn call_rn_function(
            &self,
            id: InstanceId,
            module: &str,
            function: &str,
            args: Value,
        ) -> BridgeResult<()> {
            self.inner.call_rn_function(id, module, function, args)
        }
        fn update_component_state(
            &self,
            id: InstanceId,
            component: &str,
            tag: Tag,
            state: Value,
        ) -> BridgeResult<()> {
            self.inner.update_component_state(id, component, tag, state)
        }
        fn register_font(&self, family: &str, path: &str) -> BridgeResult<()> {
            self.inner.register_font(family, path)
        }
    }

    #[tokio::test]
    async fn created_surface_can_be_destroyed_without_start() {
        let surface = test_surface(Value::Null);
        assert_eq!(surface.state(), SurfaceState::Created);

        surface.destroy().await.unwrap();
        assert_eq!(surface.state(), SurfaceState::Destroyed);
    }

    #[tokio::test]
    async fn destroying_a_running_surface_fails_without_state_change() {
        let surface = test_surface(Value::Null);
        surface.start(SurfaceConstraints::default(), Value::Null).unwrap();

        let error = surface.destroy().await.unwrap_err();
        assert!(matches!(error, SurfaceError::DestroyWhileRunning));
        assert_eq!(
            error.to_string(),
            "Surface must be stopped before can be destroyed"
        );
        assert_eq!(surface.state(), SurfaceState::Running);
    }

    #[tokio::test]
    async fn starting_a_destroyed_surface_fails_without_state_change() {
        let surface = test_surface(Value::Null);
        surface.destroy().await.unwrap();

        let error = surface
            .start(SurfaceConstraints::default(), Value::Null)
            .unwrap_err();
        assert!(matches!(error, SurfaceError::Destroyed { tag: 1 }));
        assert_eq!(surface.state(), SurfaceState::Destroyed);
    }

    #[tokio::test]
    async fn start_stop_cycle_and_final_destroy() {
        let surface = test_surface(Value::Null);
        surface.start(SurfaceConstraints::default(), Value::Null).unwrap();
        surface.stop().await.unwrap();
        surface.start(SurfaceConstraints::default(), Value::Null).unwrap();
        surface.stop().await.unwrap();
        surface.destroy().await.unwrap();
        assert_eq!(surface.state(), SurfaceState::Destroyed);
    }

    #[tokio::test]
    async fn operations_are_rejected_after_destroy() {
        let surface = test_surface(Value::Null);
        surface.destroy().await.unwrap();

        assert!(surface.set_props(json!({ "a": 1 })).is_err());
        assert!(surface.set_display_mode(DisplayMode::Hidden).is_err());
        assert!(surface.update_constraints(SurfaceConstraints::default()).is_err());
        assert!(surface.update_rtl(true).is_err());
        assert!(surface.stop().await.is_err());
    }

    #[tokio::test]
    async fn start_is_rejected_while_destroy_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let binding = Arc::new(GatedDestroyBinding {
            inner: NoopBinding::new(),
            gate: Arc::clone(&gate),
        });
        let gateway = Arc::new(BridgeGateway::with_binding(binding));
        let surface = SurfaceHandle::new(1, 1, "app".into(), Value::Null, gateway).unwrap();

        let destroying = tokio::spawn({
            let surface = Arc::clone(&surface);
            async move { surface.destroy().await }
        });
        // Let destroy() reach the suspended native call.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let error = surface
            .start(SurfaceConstraints::default(), Value::Null)
            .unwrap_err();
        assert!(matches!(error, SurfaceError::Destroyed { tag: 1 }));

        gate.notify_one();
        destroying.await.unwrap().unwrap();
        assert_eq!(surface.state(), SurfaceState::Destroyed);
    }

    #[tokio::test]
    async fn measure_is_valid_in_any_state() {
        let surface = test_surface(Value::Null);
        surface.destroy().await.unwrap();

        let size = surface
            .measure(SurfaceConstraints {
                width: 100.0,
                height: 50.0,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(size.width, 100.0);
    }

    #[test]
    fn start_merges_default_and_supplied_props() {
        let surface = test_surface(json!({ "theme": "dark", "locale": "en" }));
        surface
            .start(
                SurfaceConstraints::default(),
                json!({ "locale": "fr", "initialRoute": "/home" }),
            )
            .unwrap();

        let props = surface.props();
        assert_eq!(props["theme"], "dark");
        assert_eq!(props["locale"], "fr");
        assert_eq!(props["initialRoute"], "/home");
    }
}
