//! Turbo modules: named native-capability modules exposed to script code.

mod factory;
mod module;
mod provider;

pub use factory::{RenderArchitecture, TurboModuleFactory, UiTurboModuleFactory, WorkerTurboModuleFactory};
pub use module::{AsyncTurboModuleCtor, TurboModule, TurboModuleContext, TurboModuleCtor};
pub use provider::TurboModuleProvider;
