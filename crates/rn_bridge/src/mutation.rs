//! UI mutation and imperative-command payloads produced by the native
//! renderer from JS-computed layout trees.

use serde::{Deserialize, Serialize};

use crate::types::Tag;

/// One native view operation from a committed layout tree.
///
/// Batches arrive in the order the renderer committed them and are applied
/// without reordering or coalescing; ordering is the upstream producer's
/// guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Mutation {
    CreateView {
        tag: Tag,
        component_name: String,
        props: serde_json::Value,
    },
    InsertView {
        parent_tag: Tag,
        child_tag: Tag,
        index: usize,
    },
    UpdateView {
        tag: Tag,
        props: serde_json::Value,
    },
    RemoveView {
        parent_tag: Tag,
        child_tag: Tag,
    },
    DeleteView {
        tag: Tag,
    },
}

impl Mutation {
    /// Tag of the component this mutation primarily targets.
    pub fn tag(&self) -> Tag {
        match self {
            Self::CreateView { tag, .. }
            | Self::UpdateView { tag, .. }
            | Self::DeleteView { tag } => *tag,
            Self::InsertView { child_tag, .. } | Self::RemoveView { child_tag, .. } => *child_tag,
        }
    }
}

/// Imperative command ("scrollTo", "focus") targeted at one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCommand {
    pub tag: Tag,
    pub name: String,
    pub args: serde_json::Value,
}
