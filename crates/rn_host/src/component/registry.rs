//! Reference-counted registry mapping tags to component managers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use rn_bridge::Tag;

use super::ComponentManager;

struct Entry {
    manager: Arc<dyn ComponentManager>,
    ref_count: usize,
}

/// Ref-counted tag → manager registry.
///
/// Acquire and release must be paired 1:1 by the caller; the registry only
/// counts. The map is guarded by a mutex so safety does not rest on
/// single-threaded scheduling.
#[derive(Default)]
pub struct ComponentManagerRegistry {
    entries: Mutex<HashMap<Tag, Entry>>,
}

impl ComponentManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the manager for `tag`, creating it if absent.
    ///
    /// An existing entry has its count incremented and `factory` is not run;
    /// constructing a second manager for a live tag would duplicate native
    /// resource ownership.
    pub fn find_or_create<F>(&self, tag: Tag, factory: F) -> Arc<dyn ComponentManager>
    where
        F: FnOnce() -> Arc<dyn ComponentManager>,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&tag) {
            entry.ref_count += 1;
            return Arc::clone(&entry.manager);
        }
        let manager = factory();
        entries.insert(
            tag,
            Entry {
                manager: Arc::clone(&manager),
                ref_count: 1,
            },
        );
        manager
    }

    /// Release one reference.
    ///
    /// Teardown runs exactly once, on the release that drops the count to
    /// zero, and the entry is removed on that same call. Releasing an unknown
    /// tag is a logged no-op: teardown ordering races are expected under
    /// rapid mount/unmount churn.
    pub fn release(&self, tag: Tag) {
        let removed = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&tag) else {
                tracing::warn!(tag, "release() for a tag with no registered manager");
                return;
            };
            entry.ref_count -= 1;
            if entry.ref_count > 0 {
                return;
            }
            entries.remove(&tag)
        };
        // The destroy hook runs outside the lock so a manager may touch the
        // registry from its teardown.
        if let Some(entry) = removed {
            entry.manager.on_destroy();
            tracing::debug!(tag, "Component manager destroyed");
        }
    }

    pub fn get(&self, tag: Tag) -> Option<Arc<dyn ComponentManager>> {
        self.entries
            .lock()
            .get(&tag)
            .map(|entry| Arc::clone(&entry.manager))
    }

    /// Managers from `tag` up through its parent chain, root-most last.
    ///
    /// Stops at the first missing link instead of failing; a parent may have
    /// been torn down out of order during rapid unmounts.
    pub fn lineage(&self, tag: Tag) -> Vec<Arc<dyn ComponentManager>> {
        let mut chain = Vec::new();
        let mut next = Some(tag);
        while let Some(tag) = next {
            let Some(manager) = self.get(tag) else { break };
            next = manager.parent_tag();
            chain.push(manager);
        }
        chain
    }

    /// Current reference count for a tag; 0 when unregistered.
    pub fn ref_count(&self, tag: Tag) -> usize {
        self.entries
            .lock()
            .get(&tag)
            .map(|entry| entry.ref_count)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestManager {
        tag: Tag,
        parent: PlMutex<Option<Tag>>,
        destroyed: Arc<AtomicUsize>,
    }

    impl TestManager {
        fn new(tag: Tag, parent: Option<Tag>, destroyed: &Arc<AtomicUsize>) -> Arc<Self> {
            Arc::new(Self {
                tag,
                parent: PlMutex::new(parent),
                destroyed: Arc::clone(destroyed),
            })
        }
    }

    impl ComponentManager for TestManager {
        fn tag(&self) -> Tag {
            self.tag
        }
        fn component_name(&self) -> &str {
            "TestView"
        }
        fn parent_tag(&self) -> Option<Tag> {
            *self.parent.lock()
        }
        fn set_parent_tag(&self, parent: Option<Tag>) {
            *self.parent.lock() = parent;
        }
        fn on_destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn ref_counting_runs_destroy_exactly_once() {
        let registry = ComponentManagerRegistry::new();
        let destroyed = Arc::new(AtomicUsize::new(0));
        let factory_calls = Arc::new(AtomicUsize::new(0));

        let factory = |calls: &Arc<AtomicUsize>, destroyed: &Arc<AtomicUsize>| {
            let calls = Arc::clone(calls);
            let destroyed = Arc::clone(destroyed);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                TestManager::new(5, None, &destroyed) as Arc<dyn ComponentManager>
            }
        };

        let first = registry.find_or_create(5, factory(&factory_calls, &destroyed));
        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.ref_count(5), 1);

        // Second acquisition must not invoke the factory and must return the
        // same manager.
        let second = registry.find_or_create(5, factory(&factory_calls, &destroyed));
        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.ref_count(5), 2);
        assert!(Arc::ptr_eq(&first, &second));

        registry.release(5);
        assert_eq!(registry.ref_count(5), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        registry.release(5);
        assert_eq!(registry.ref_count(5), 0);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(registry.get(5).is_none());
    }

    #[test]
    fn release_of_unknown_tag_is_a_noop() {
        let registry = ComponentManagerRegistry::new();
        let destroyed = Arc::new(AtomicUsize::new(0));
        registry.find_or_create(1, {
            let destroyed = Arc::clone(&destroyed);
            move || TestManager::new(1, None, &destroyed) as Arc<dyn ComponentManager>
        });

        // Tag 99 was never registered; nothing may be destroyed anywhere.
        registry.release(99);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        assert_eq!(registry.ref_count(1), 1);
    }

    #[test]
    fn lineage_walks_parent_chain() {
        let registry = ComponentManagerRegistry::new();
        let destroyed = Arc::new(AtomicUsize::new(0));
        for (tag, parent) in [(1, None), (2, Some(1)), (3, Some(2))] {
            let destroyed = Arc::clone(&destroyed);
            registry.find_or_create(tag, move || {
                TestManager::new(tag, parent, &destroyed) as Arc<dyn ComponentManager>
            });
        }

        let lineage = registry.lineage(3);
        let tags: Vec<Tag> = lineage.iter().map(|m| m.tag()).collect();
        assert_eq!(tags, vec![3, 2, 1]);
    }

    #[test]
    fn lineage_truncates_at_missing_link() {
        let registry = ComponentManagerRegistry::new();
        let destroyed = Arc::new(AtomicUsize::new(0));
        for (tag, parent) in [(1, None), (2, Some(1)), (3, Some(2))] {
            let destroyed = Arc::clone(&destroyed);
            registry.find_or_create(tag, move || {
                TestManager::new(tag, parent, &destroyed) as Arc<dyn ComponentManager>
            });
        }

        // Tear down the middle of the chain, as a rapid unmount would.
        registry.release(2);

        let lineage = registry.lineage(3);
        let tags: Vec<Tag> = lineage.iter().map(|m| m.tag()).collect();
        assert_eq!(tags, vec![3]);
    }
}
