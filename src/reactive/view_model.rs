//! View Model - Reactive field table for one context.
//!
//! Every instance and every scene owns one `ViewModel`. It stores field
//! values, knows which of them are active (data, prop, getter), and notifies
//! subscribed listeners when an active field changes.
//!
//! # Notification Queue
//!
//! Writes do not call listeners recursively. A write:
//! 1. Stores the value (unchanged values stop here)
//! 2. Recomputes every getter reachable from the field, dependencies first
//! 3. Enqueues each listener of every changed field, once per write
//! 4. Drains the queue unless a drain is already running
//!
//! A listener that writes again only enqueues; the running drain delivers
//! those notifications after the current ones.
//!
//! # Example
//!
//! ```ignore
//! let vm = ViewModel::new("Card", DEFAULT_MAX_NOTIFICATIONS);
//! vm.install_field("title", PropertyKind::Data, Value::from("A"));
//!
//! let id = vm.subscribe("title", Rc::new(|value, previous| {
//!     println!("{previous} -> {value}");
//! }));
//! vm.set("title", Value::from("B")); // prints "A -> B"
//! vm.unsubscribe("title", id);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use log::{error, trace, warn};

use super::active_property::{ActiveProperties, ComputeFn, PropertyKind};
use crate::types::Value;

/// Callback run when a field changes. Receives `(value, previous)`.
pub type Listener = Rc<dyn Fn(&Value, &Value)>;

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    listener: Listener,
}

struct Notification {
    field: String,
    listener: Listener,
    value: Value,
    previous: Value,
}

/// Resets the draining flag even when a listener unwinds.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// =============================================================================
// ViewModel
// =============================================================================

/// Reactive field table with an explicit notification queue.
pub struct ViewModel {
    label: String,
    values: RefCell<HashMap<String, Value>>,
    kinds: RefCell<HashMap<String, PropertyKind>>,
    getters: RefCell<HashMap<String, ComputeFn>>,
    /// Field → getters that read it.
    readers: RefCell<HashMap<String, Vec<String>>>,
    /// Getter names, dependencies first.
    order: RefCell<Vec<String>>,
    listeners: RefCell<HashMap<String, Vec<Subscription>>>,
    queue: RefCell<VecDeque<Notification>>,
    draining: Cell<bool>,
    next_listener: Cell<u64>,
    limit: usize,
}

impl ViewModel {
    /// Create an empty view model.
    ///
    /// `label` names the owning context in log output. `limit` caps the
    /// callbacks a single drain may deliver.
    pub fn new(label: impl Into<String>, limit: usize) -> Self {
        Self {
            label: label.into(),
            values: RefCell::new(HashMap::new()),
            kinds: RefCell::new(HashMap::new()),
            getters: RefCell::new(HashMap::new()),
            readers: RefCell::new(HashMap::new()),
            order: RefCell::new(Vec::new()),
            listeners: RefCell::new(HashMap::new()),
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            next_listener: Cell::new(0),
            limit,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Callbacks a single drain may deliver before the rest are dropped.
    pub fn limit(&self) -> usize {
        self.limit
    }

    // =========================================================================
    // Installation
    // =========================================================================

    /// Store a value without classification or notification.
    ///
    /// Used for class defaults and for data restored during a rebuild, before
    /// [`install`](Self::install) runs.
    pub fn seed(&self, field: &str, value: Value) {
        self.values.borrow_mut().insert(field.to_string(), value);
    }

    /// Make every field of `record` active and compute its getters.
    ///
    /// Data and prop fields keep any seeded value; unseeded ones start
    /// `Undefined`.
    pub fn install(&self, record: &ActiveProperties) {
        {
            let mut kinds = self.kinds.borrow_mut();
            let mut values = self.values.borrow_mut();
            for field in record.data() {
                kinds.insert(field.clone(), PropertyKind::Data);
                values.entry(field.clone()).or_default();
            }
            for field in record.prop() {
                kinds.insert(field.clone(), PropertyKind::Prop);
                values.entry(field.clone()).or_default();
            }
        }
        {
            let mut kinds = self.kinds.borrow_mut();
            let mut getters = self.getters.borrow_mut();
            let mut readers = self.readers.borrow_mut();
            for spec in record.getters() {
                kinds.insert(spec.name.clone(), PropertyKind::Getter);
                getters.insert(spec.name.clone(), Rc::clone(&spec.compute));
                for dep in &spec.dependencies {
                    readers.entry(dep.clone()).or_default().push(spec.name.clone());
                }
            }
            *self.order.borrow_mut() = record.getter_order().to_vec();
        }
        let order = self.order.borrow().clone();
        for name in &order {
            let value = self.compute(name);
            self.values.borrow_mut().insert(name.clone(), value);
        }
    }

    /// Make a single data or prop field active with an initial value.
    ///
    /// Getters go through [`install`](Self::install) instead, which knows
    /// their dependencies.
    pub fn install_field(&self, field: &str, kind: PropertyKind, value: Value) {
        if kind == PropertyKind::Getter {
            warn!("{}: `{}` cannot be installed as a bare getter", self.label, field);
            return;
        }
        self.kinds.borrow_mut().insert(field.to_string(), kind);
        self.values.borrow_mut().insert(field.to_string(), value);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current value of `field`, `Undefined` if absent.
    pub fn get(&self, field: &str) -> Value {
        self.values.borrow().get(field).cloned().unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.values.borrow().contains_key(field)
    }

    pub fn kind(&self, field: &str) -> Option<PropertyKind> {
        self.kinds.borrow().get(field).copied()
    }

    pub fn is_active(&self, field: &str) -> bool {
        self.kind(field).is_some()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `field` and notify dependents.
    ///
    /// Getters are read-only: the write is logged and dropped. Undeclared
    /// fields are stored without notification.
    pub fn set(&self, field: &str, value: Value) {
        match self.kind(field) {
            Some(PropertyKind::Getter) => {
                warn!("{}: `{}` is a getter and cannot be assigned", self.label, field);
                return;
            }
            None => {
                self.seed(field, value);
                return;
            }
            Some(PropertyKind::Data | PropertyKind::Prop) => {}
        }

        let previous = self
            .values
            .borrow_mut()
            .insert(field.to_string(), value.clone())
            .unwrap_or_default();
        if previous == value {
            return;
        }

        let mut changed = vec![(field.to_string(), value, previous)];
        self.recompute_readers(field, &mut changed);
        self.enqueue(changed);
        self.drain();
    }

    fn compute(&self, getter: &str) -> Value {
        let compute = self.getters.borrow().get(getter).cloned();
        compute.map_or(Value::Undefined, |f| f(self))
    }

    /// Recompute every getter reachable from `field`, in dependency order.
    fn recompute_readers(&self, field: &str, changed: &mut Vec<(String, Value, Value)>) {
        let affected: HashSet<String> = {
            let readers = self.readers.borrow();
            let mut affected = HashSet::new();
            let mut pending = vec![field.to_string()];
            while let Some(next) = pending.pop() {
                if let Some(getters) = readers.get(&next) {
                    for getter in getters {
                        if affected.insert(getter.clone()) {
                            pending.push(getter.clone());
                        }
                    }
                }
            }
            affected
        };
        if affected.is_empty() {
            return;
        }

        let order = self.order.borrow().clone();
        for getter in order.iter().filter(|g| affected.contains(*g)) {
            let value = self.compute(getter);
            let previous = self
                .values
                .borrow_mut()
                .insert(getter.clone(), value.clone())
                .unwrap_or_default();
            if previous != value {
                changed.push((getter.clone(), value, previous));
            }
        }
    }

    fn enqueue(&self, changed: Vec<(String, Value, Value)>) {
        let listeners = self.listeners.borrow();
        let mut queue = self.queue.borrow_mut();
        let mut seen: HashSet<*const ()> = HashSet::new();
        for (field, value, previous) in changed {
            let Some(subscriptions) = listeners.get(&field) else {
                continue;
            };
            for subscription in subscriptions {
                let key = Rc::as_ptr(&subscription.listener) as *const ();
                if seen.insert(key) {
                    queue.push_back(Notification {
                        field: field.clone(),
                        listener: Rc::clone(&subscription.listener),
                        value: value.clone(),
                        previous: previous.clone(),
                    });
                }
            }
        }
    }

    fn drain(&self) {
        if self.draining.replace(true) {
            return;
        }
        let _guard = DrainGuard(&self.draining);
        let mut delivered = 0usize;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(notification) = next else { break };
            delivered += 1;
            if delivered > self.limit {
                let dropped = self.queue.borrow().len() + 1;
                self.queue.borrow_mut().clear();
                error!(
                    "{}: more than {} notifications in one update, dropping {} (last field `{}`)",
                    self.label, self.limit, dropped, notification.field
                );
                break;
            }
            trace!("{}: notify `{}`", self.label, notification.field);
            (notification.listener)(&notification.value, &notification.previous);
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Run `listener` whenever `field` changes.
    pub fn subscribe(&self, field: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(field.to_string())
            .or_default()
            .push(Subscription { id, listener });
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, field: &str, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(subscriptions) = listeners.get_mut(field) {
            subscriptions.retain(|s| s.id != id);
            if subscriptions.is_empty() {
                listeners.remove(field);
            }
        }
    }

    pub fn listener_count(&self, field: &str) -> usize {
        self.listeners.borrow().get(field).map_or(0, Vec::len)
    }
}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("label", &self.label)
            .field("values", &self.values.borrow())
            .field("kinds", &self.kinds.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_NOTIFICATIONS;
    use crate::reactive::{Declaration, GetterSpec, PropertyGraph};

    fn counter() -> (Rc<Cell<usize>>, Listener) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let listener: Listener = Rc::new(move |_, _| count_clone.set(count_clone.get() + 1));
        (count, listener)
    }

    fn int(vm: &ViewModel, field: &str) -> i64 {
        vm.get(field).as_int().unwrap_or(0)
    }

    /// first, last → full; first → initial; full, initial → badge
    fn name_model() -> Rc<ViewModel> {
        let mut graph = PropertyGraph::new();
        graph.init_active_property("Name", ActiveProperties::default());
        for declaration in [
            Declaration::Data("first".into()),
            Declaration::Data("last".into()),
            Declaration::Getter(GetterSpec::new("full", ["first", "last"], |vm| {
                Value::from(format!("{} {}", vm.get("first"), vm.get("last")))
            })),
            Declaration::Getter(GetterSpec::new("initial", ["first"], |vm| {
                Value::from(vm.get("first").to_string().chars().take(1).collect::<String>())
            })),
            Declaration::Getter(GetterSpec::new("badge", ["full", "initial"], |vm| {
                Value::from(format!("{}:{}", vm.get("initial"), vm.get("full")))
            })),
        ] {
            graph.declare("Name", declaration).unwrap();
        }
        let record = graph.get_active_properties("Name").unwrap();

        let vm = Rc::new(ViewModel::new("Name", DEFAULT_MAX_NOTIFICATIONS));
        vm.seed("first", Value::from("Ada"));
        vm.seed("last", Value::from("Lovelace"));
        vm.install(&record);
        vm
    }

    #[test]
    fn test_install_computes_getters() {
        let vm = name_model();
        assert_eq!(vm.get("full"), Value::from("Ada Lovelace"));
        assert_eq!(vm.get("badge"), Value::from("A:Ada Lovelace"));
        assert_eq!(vm.kind("first"), Some(PropertyKind::Data));
        assert_eq!(vm.kind("badge"), Some(PropertyKind::Getter));
    }

    #[test]
    fn test_write_recomputes_getters() {
        let vm = name_model();
        vm.set("first", Value::from("Grace"));
        assert_eq!(vm.get("full"), Value::from("Grace Lovelace"));
        assert_eq!(vm.get("initial"), Value::from("G"));
        assert_eq!(vm.get("badge"), Value::from("G:Grace Lovelace"));
    }

    #[test]
    fn test_getter_watcher_notified_once_per_write() {
        let vm = name_model();
        let (badge_count, badge_listener) = counter();
        let (full_count, full_listener) = counter();
        vm.subscribe("badge", badge_listener);
        vm.subscribe("full", full_listener);
        // Other dependents reacting to the same write.
        let (first_count, first_listener) = counter();
        vm.subscribe("first", first_listener);

        vm.set("first", Value::from("Grace"));

        assert_eq!(badge_count.get(), 1);
        assert_eq!(full_count.get(), 1);
        assert_eq!(first_count.get(), 1);
    }

    #[test]
    fn test_shared_listener_deduplicated() {
        let vm = name_model();
        let (count, listener) = counter();
        vm.subscribe("first", listener.clone());
        vm.subscribe("full", listener.clone());
        vm.subscribe("badge", listener);

        vm.set("first", Value::from("Grace"));
        assert_eq!(count.get(), 1);

        vm.set("last", Value::from("Hopper"));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_unchanged_value_does_not_notify() {
        let vm = name_model();
        let (count, listener) = counter();
        vm.subscribe("first", listener);

        vm.set("first", Value::from("Ada"));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_getters_are_read_only() {
        let vm = name_model();
        vm.set("full", Value::from("Nobody"));
        assert_eq!(vm.get("full"), Value::from("Ada Lovelace"));
    }

    #[test]
    fn test_plain_fields_do_not_notify() {
        let vm = ViewModel::new("plain", DEFAULT_MAX_NOTIFICATIONS);
        let (count, listener) = counter();
        vm.subscribe("loose", listener);
        vm.set("loose", Value::Int(1));
        assert_eq!(vm.get("loose"), Value::Int(1));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_reentrant_writes_are_queued() {
        let vm = Rc::new(ViewModel::new("chain", DEFAULT_MAX_NOTIFICATIONS));
        vm.install_field("a", PropertyKind::Data, Value::Int(0));
        vm.install_field("b", PropertyKind::Data, Value::Int(0));

        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let weak = Rc::downgrade(&vm);
        let log_a = log.clone();
        vm.subscribe(
            "a",
            Rc::new(move |value, _| {
                log_a.borrow_mut().push(format!("a={value} start"));
                if let Some(vm) = weak.upgrade() {
                    vm.set("b", Value::Int(int(&vm, "a") * 10));
                }
                log_a.borrow_mut().push(format!("a={value} end"));
            }),
        );
        let log_b = log.clone();
        vm.subscribe(
            "b",
            Rc::new(move |value, _| log_b.borrow_mut().push(format!("b={value}"))),
        );

        vm.set("a", Value::Int(2));

        assert_eq!(int(&vm, "b"), 20);
        // b's listener runs after a's listener returns, not inside it.
        assert_eq!(
            *log.borrow(),
            vec!["a=2 start".to_string(), "a=2 end".to_string(), "b=20".to_string()]
        );
    }

    #[test]
    fn test_runaway_drain_is_cut_off() {
        let vm = Rc::new(ViewModel::new("loop", 50));
        vm.install_field("n", PropertyKind::Data, Value::Int(0));

        let weak = Rc::downgrade(&vm);
        let (count, _) = counter();
        let count_clone = count.clone();
        vm.subscribe(
            "n",
            Rc::new(move |value, _| {
                count_clone.set(count_clone.get() + 1);
                if let Some(vm) = weak.upgrade() {
                    vm.set("n", Value::Int(value.as_int().unwrap_or(0) + 1));
                }
            }),
        );

        vm.set("n", Value::Int(1));
        assert_eq!(count.get(), 50);

        // The queue is usable again afterwards.
        let (after, listener) = counter();
        vm.install_field("m", PropertyKind::Data, Value::Int(0));
        vm.subscribe("m", listener);
        vm.set("m", Value::Int(1));
        assert_eq!(after.get(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let vm = name_model();
        let (count, listener) = counter();
        let id = vm.subscribe("first", listener);
        assert_eq!(vm.listener_count("first"), 1);

        vm.unsubscribe("first", id);
        assert_eq!(vm.listener_count("first"), 0);

        vm.set("first", Value::from("Grace"));
        assert_eq!(count.get(), 0);
    }
}
