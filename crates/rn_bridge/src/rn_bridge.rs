//! Bridge Gateway
//!
//! The call/result marshalling boundary between script-driven rendering code
//! and the native UI toolkit. Every native call returns a tagged envelope
//! (success payload or structured error); the gateway unwraps envelopes so
//! callers only ever see `Result` with a structured error type.

pub mod binding;
pub mod error;
pub mod gateway;
pub mod mutation;
pub mod result;
pub mod types;

pub use binding::{
    InitializeResult, InstanceBindingCallbacks, NativeBinding, NoopBinding, TextMeasurer,
};
pub use error::{BridgeError, RnError};
pub use gateway::BridgeGateway;
pub use mutation::{ComponentCommand, Mutation};
pub use result::BridgeResult;
pub use types::{DisplayMode, EnvId, InstanceId, Size, SurfaceConstraints, Tag};
