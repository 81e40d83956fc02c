//! Instance Store - Identity-indexed table of live instances.
//!
//! Holds:
//! - id → instance (the only long-lived strong reference)
//! - component name → ordered ids (index only)
//! - id → component name (reverse lookup, used by [`IndexStrategy::Reverse`])
//! - parent id → ids of components built into the parent's display sub-tree
//!
//! Every method takes and releases its borrows before returning, so the
//! runtime can call back into the store from inside a notification.

use std::collections::HashMap;
use std::rc::Rc;

use super::instance::Instance;
use crate::config::IndexStrategy;
use crate::types::InstanceId;

pub struct InstanceStore {
    instances: HashMap<InstanceId, Rc<Instance>>,
    name_ids: HashMap<String, Vec<InstanceId>>,
    id_names: HashMap<InstanceId, String>,
    children: HashMap<InstanceId, Vec<InstanceId>>,
    parents: HashMap<InstanceId, InstanceId>,
    strategy: IndexStrategy,
}

impl InstanceStore {
    pub fn new(strategy: IndexStrategy) -> Self {
        Self {
            instances: HashMap::new(),
            name_ids: HashMap::new(),
            id_names: HashMap::new(),
            children: HashMap::new(),
            parents: HashMap::new(),
            strategy,
        }
    }

    // =========================================================================
    // Name index
    // =========================================================================

    /// Ensure an (empty) bucket exists for `name`.
    pub fn init_index(&mut self, name: &str) {
        self.name_ids.entry(name.to_string()).or_default();
    }

    /// Drop the bucket for `name`. Instances stay in the store.
    pub fn drop_index(&mut self, name: &str) {
        if let Some(ids) = self.name_ids.remove(name) {
            for id in ids {
                if self.id_names.get(&id).is_some_and(|n| n == name) {
                    self.id_names.remove(&id);
                }
            }
        }
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.name_ids.contains_key(name)
    }

    /// Ids indexed under `name`, in insertion order.
    pub fn ids_of(&self, name: &str) -> Vec<InstanceId> {
        self.name_ids.get(name).cloned().unwrap_or_default()
    }

    /// Number of buckets that list `id`.
    pub fn buckets_containing(&self, id: InstanceId) -> usize {
        self.name_ids.values().filter(|ids| ids.contains(&id)).count()
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Store `instance` under its id and index it under `name`.
    ///
    /// Returns the instance previously stored under the same id, if any.
    pub fn insert(&mut self, name: &str, instance: Rc<Instance>) -> Option<Rc<Instance>> {
        let id = instance.id();
        let previous = self.instances.insert(id, instance);
        if let Some(old_name) = self.id_names.get(&id).cloned() {
            if old_name != name {
                self.remove_from_index(id, &old_name);
            }
        }
        let ids = self.name_ids.entry(name.to_string()).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
        self.id_names.insert(id, name.to_string());
        previous
    }

    pub fn get(&self, id: InstanceId) -> Option<Rc<Instance>> {
        self.instances.get(&id).cloned()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Remove `id` from the store, the name index and its parent's children.
    ///
    /// Its own children stay recorded; take them with
    /// [`take_children`](Self::take_children).
    pub fn remove(&mut self, id: InstanceId) -> Option<Rc<Instance>> {
        let removed = self.instances.remove(&id);
        if let Some(parent) = self.parents.remove(&id) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|&i| i != id);
            }
        }
        match self.strategy {
            IndexStrategy::Scan => {
                for ids in self.name_ids.values_mut() {
                    ids.retain(|&i| i != id);
                }
                self.id_names.remove(&id);
            }
            IndexStrategy::Reverse => {
                if let Some(name) = self.id_names.remove(&id) {
                    self.remove_from_index(id, &name);
                }
            }
        }
        removed
    }

    // =========================================================================
    // Display children
    // =========================================================================

    /// Record `child` as built into the display sub-tree of `parent`.
    pub fn attach_child(&mut self, parent: InstanceId, child: InstanceId) {
        if let Some(previous) = self.parents.insert(child, parent) {
            if let Some(siblings) = self.children.get_mut(&previous) {
                siblings.retain(|&i| i != child);
            }
        }
        self.children.entry(parent).or_default().push(child);
    }

    /// Forget and return the children recorded under `parent`.
    pub fn take_children(&mut self, parent: InstanceId) -> Vec<InstanceId> {
        let children = self.children.remove(&parent).unwrap_or_default();
        for child in &children {
            self.parents.remove(child);
        }
        children
    }

    pub fn children_of(&self, parent: InstanceId) -> Vec<InstanceId> {
        self.children.get(&parent).cloned().unwrap_or_default()
    }

    fn remove_from_index(&mut self, id: InstanceId, name: &str) {
        if let Some(ids) = self.name_ids.get_mut(name) {
            ids.retain(|&i| i != id);
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Stored ids, ascending.
    pub fn ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<InstanceId> = self.instances.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::ComponentClass;

    fn instance(id: InstanceId, name: &str) -> Rc<Instance> {
        Rc::new(Instance::new(id, &ComponentClass::new(name), 16))
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = InstanceStore::new(IndexStrategy::Reverse);
        store.init_index("Spin");
        store.insert("Spin", instance(1, "Spin"));
        store.insert("Spin", instance(2, "Spin"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).map(|i| i.id()), Some(1));
        assert_eq!(store.ids_of("Spin"), vec![1, 2]);
        assert_eq!(store.buckets_containing(1), 1);
    }

    #[test]
    fn test_reinsert_same_id_keeps_single_index_entry() {
        let mut store = InstanceStore::new(IndexStrategy::Reverse);
        let first = instance(7, "Card");
        store.insert("Card", first.clone());
        let previous = store.insert("Card", instance(7, "Card"));

        assert!(previous.is_some_and(|p| Rc::ptr_eq(&p, &first)));
        assert_eq!(store.ids_of("Card"), vec![7]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_with_each_strategy() {
        for strategy in [IndexStrategy::Scan, IndexStrategy::Reverse] {
            let mut store = InstanceStore::new(strategy);
            store.insert("Spin", instance(1, "Spin"));
            store.insert("Card", instance(2, "Card"));

            assert!(store.remove(1).is_some());
            assert!(!store.contains(1));
            assert_eq!(store.buckets_containing(1), 0);
            assert!(store.ids_of("Spin").is_empty());
            assert_eq!(store.ids_of("Card"), vec![2]);
            assert!(store.remove(1).is_none());
        }
    }

    #[test]
    fn test_children_follow_removal() {
        let mut store = InstanceStore::new(IndexStrategy::Reverse);
        for id in 1..=3 {
            store.insert("Card", instance(id, "Card"));
        }
        store.attach_child(1, 2);
        store.attach_child(1, 3);
        assert_eq!(store.children_of(1), vec![2, 3]);

        store.remove(2);
        assert_eq!(store.children_of(1), vec![3]);

        assert_eq!(store.take_children(1), vec![3]);
        assert!(store.children_of(1).is_empty());

        // Detached children no longer point at their old parent.
        store.attach_child(2, 3);
        assert_eq!(store.children_of(2), vec![3]);
    }

    #[test]
    fn test_drop_index_keeps_instances() {
        let mut store = InstanceStore::new(IndexStrategy::Reverse);
        store.insert("Spin", instance(1, "Spin"));
        store.drop_index("Spin");

        assert!(!store.has_index("Spin"));
        assert!(store.contains(1));
        assert!(store.remove(1).is_some());
    }

    #[test]
    fn test_ids_track_store() {
        let mut store = InstanceStore::new(IndexStrategy::Reverse);
        store.insert("Spin", instance(5, "Spin"));
        store.insert("Spin", instance(3, "Spin"));
        assert_eq!(store.ids(), vec![3, 5]);

        store.remove(3);
        assert_eq!(store.ids(), vec![5]);
    }
}
