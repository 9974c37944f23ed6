//! Identifier and geometry types shared across the bridge boundary.

use serde::{Deserialize, Serialize};

/// Process-unique integer naming one rendered component instance.
///
/// A tag is registered before any mutation references it and deregistered
/// only after every referencing structure has released it.
pub type Tag = u32;

/// Numeric id of one instance. Allocated by the native side and never reused
/// while an instance with that id is registered.
pub type InstanceId = u32;

/// Id of the script execution environment hosting the instances.
pub type EnvId = u32;

/// Display mode of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    Visible,
    Suspended,
    Hidden,
}

/// Measured size in density-independent pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Layout constraints under which a surface renders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceConstraints {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub pixel_ratio: f64,
    pub is_rtl: bool,
}

impl Default for SurfaceConstraints {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            pixel_ratio: 1.0,
            is_rtl: false,
        }
    }
}
