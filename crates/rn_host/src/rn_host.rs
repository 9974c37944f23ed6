//! Instance and surface lifecycle for the native host.
//!
//! This crate ties one script execution context to its rendering state: the
//! [`HostSession`] is the explicit dependency-injection root, the
//! [`RnInstanceRegistry`] creates and destroys instances, each [`RnInstance`]
//! owns its component managers, turbo modules and surfaces, and each
//! [`SurfaceHandle`] drives one root-level render surface through the bridge.

pub mod component;
pub mod error;
pub mod instance;
pub mod options;
pub mod package;
pub mod registry;
pub mod session;
pub mod surface;
pub mod turbo;

pub use component::{CommandCallback, ComponentCommandHub, ComponentManager, ComponentManagerRegistry};
pub use error::{ErrorHandler, InstanceError, LoggingErrorHandler, SurfaceError};
pub use instance::{
    CppMessageListener, DescriptorRegistry, InstanceCollaborators, NullDescriptorRegistry,
    RnInstance,
};
pub use options::{FontOptions, RnInstanceOptions};
pub use package::{ComponentManagerCtor, RnPackage};
pub use registry::RnInstanceRegistry;
pub use session::{HostSession, HostSessionOptions};
pub use surface::{SurfaceHandle, SurfaceState};
pub use turbo::{
    AsyncTurboModuleCtor, RenderArchitecture, TurboModule, TurboModuleContext, TurboModuleCtor,
    TurboModuleFactory, TurboModuleProvider, UiTurboModuleFactory, WorkerTurboModuleFactory,
};
