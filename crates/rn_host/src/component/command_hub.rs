//! Routes imperative component commands to their receivers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use rn_bridge::{ComponentCommand, Tag};

/// Callback receiving commands for one tag.
pub type CommandCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Dispatches imperative commands ("scrollTo", "focus") to the receivers
/// registered for the target tag.
#[derive(Default)]
pub struct ComponentCommandHub {
    receivers: Mutex<HashMap<Tag, Vec<CommandCallback>>>,
}

impl ComponentCommandHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, tag: Tag, callback: CommandCallback) {
        self.receivers.lock().entry(tag).or_default().push(callback);
    }

    /// Remove every receiver for `tag`. Called when the component is deleted.
    pub fn unsubscribe(&self, tag: Tag) {
        self.receivers.lock().remove(&tag);
    }

    /// Deliver one command. Receivers are copied out before invocation, so a
    /// callback may (un)subscribe without deadlocking.
    pub fn dispatch(&self, command: &ComponentCommand) {
        let receivers: Vec<CommandCallback> = self
            .receivers
            .lock()
            .get(&command.tag)
            .cloned()
            .unwrap_or_default();

        if receivers.is_empty() {
            tracing::warn!(
                tag = command.tag,
                name = %command.name,
                "Command for a tag with no registered receiver"
            );
            return;
        }
        for receiver in receivers {
            receiver(&command.name, &command.args);
        }
    }
}
