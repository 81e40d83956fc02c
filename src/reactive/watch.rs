//! Watch Registry - Declared `(property, method)` pairs per component type.
//!
//! Entries are keyed by component name and may be added before the
//! component is registered. The instantiator resolves each method against
//! the component class and subscribes it to the property of the specific
//! instance once the instance is in the store.

use std::collections::HashMap;

/// A declared watch: call `method` when `property` changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub property: String,
    pub method: String,
}

/// Watch declarations for every component name.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    watches: HashMap<String, Vec<WatchEntry>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a watch. Declaring the same pair twice is a no-op.
    pub fn add_watch(&mut self, component: &str, property: &str, method: &str) {
        let entry = WatchEntry {
            property: property.to_string(),
            method: method.to_string(),
        };
        let entries = self.watches.entry(component.to_string()).or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    /// Watches declared for `component`, in declaration order.
    pub fn get_watches(&self, component: &str) -> &[WatchEntry] {
        self.watches.get(component).map(Vec::as_slice).unwrap_or(&[])
    }
}
