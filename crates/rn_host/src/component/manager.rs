//! The per-component native manager seam.

use rn_bridge::Tag;

/// Native-side object owning the native resources (view handles, file
/// descriptors, subscriptions) for one tag.
///
/// Managers are acquired and released through the
/// [`ComponentManagerRegistry`](super::ComponentManagerRegistry); `on_destroy`
/// runs exactly once, when the last reference is released.
pub trait ComponentManager: Send + Sync {
    fn tag(&self) -> Tag;

    fn component_name(&self) -> &str;

    /// Tag of the parent component, if known. Drives lineage lookups.
    fn parent_tag(&self) -> Option<Tag>;

    /// Called when the mutation stream attaches or detaches this component
    /// from a parent.
    fn set_parent_tag(&self, parent: Option<Tag>) {
        let _ = parent;
    }

    /// Teardown hook releasing non-memory native resources.
    fn on_destroy(&self) {}
}
