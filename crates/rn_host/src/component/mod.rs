//! Component managers and their reference-counted registry.

mod command_hub;
mod manager;
mod registry;

pub use command_hub::{CommandCallback, ComponentCommandHub};
pub use manager::ComponentManager;
pub use registry::ComponentManagerRegistry;
