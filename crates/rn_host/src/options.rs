//! Host-facing configuration.

use serde::{Deserialize, Serialize};

use crate::turbo::RenderArchitecture;

/// Custom font registered with the native side before an instance becomes
/// usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontOptions {
    pub family: String,
    pub path: String,
}

/// Options for creating one instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RnInstanceOptions {
    /// Human-readable name, used in logs only.
    pub name: String,

    pub architecture: RenderArchitecture,

    pub enable_debugger: bool,

    /// Fonts registered synchronously during creation.
    pub fonts: Vec<FontOptions>,

    /// Props merged into every surface's start props (surface props win).
    pub default_props: serde_json::Value,

    /// Whether this instance provisions state on the shared worker thread.
    pub uses_worker: bool,
}
