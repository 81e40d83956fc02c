//! Instances and contexts.
//!
//! An [`Instance`] is a live component: a stable id, a view model holding its
//! fields, an optional root display object and a repeat index for list
//! directives. A [`Scene`] is the top-level context instances are built
//! under. Both implement [`Context`], the thing template expressions are
//! evaluated against.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::component::{ComponentClass, Lifecycle};
use super::display::DisplayObject;
use crate::config::DEFAULT_MAX_NOTIFICATIONS;
use crate::reactive::{PropertyKind, ViewModel};
use crate::types::{InstanceId, Value};

/// Cleanup callback run when an instance is deleted.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Context
// =============================================================================

/// An owner that template expressions can be evaluated against.
pub trait Context {
    fn view_model(&self) -> &Rc<ViewModel>;

    /// Name used in diagnostics.
    fn context_name(&self) -> &str;

    fn get(&self, field: &str) -> Value {
        self.view_model().get(field)
    }
}

// =============================================================================
// Instance
// =============================================================================

/// A live component object.
pub struct Instance {
    id: InstanceId,
    component: String,
    vm: Rc<ViewModel>,
    root: RefCell<Option<Rc<dyn DisplayObject>>>,
    repeat_index: Cell<usize>,
    lifecycle: Cell<Lifecycle>,
    destroy_callbacks: RefCell<Vec<Cleanup>>,
}

impl Instance {
    /// Construct an instance with the class's field defaults seeded.
    ///
    /// The view model is not active yet; the instantiator installs it.
    pub fn new(id: InstanceId, class: &ComponentClass, limit: usize) -> Self {
        let vm = ViewModel::new(class.name(), limit);
        for (field, default) in class.fields() {
            vm.seed(field, default.clone());
        }
        Self {
            id,
            component: class.name().to_string(),
            vm: Rc::new(vm),
            root: RefCell::new(None),
            repeat_index: Cell::new(0),
            lifecycle: Cell::new(Lifecycle::NONE),
            destroy_callbacks: RefCell::new(Vec::new()),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Registered component name.
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn get(&self, field: &str) -> Value {
        self.vm.get(field)
    }

    /// Write a field, notifying dependents if it is active.
    pub fn set(&self, field: &str, value: impl Into<Value>) {
        self.vm.set(field, value.into());
    }

    // =========================================================================
    // Root display
    // =========================================================================

    pub fn root_container(&self) -> Option<Rc<dyn DisplayObject>> {
        self.root.borrow().clone()
    }

    pub fn set_root_container(&self, display: Option<Rc<dyn DisplayObject>>) {
        *self.root.borrow_mut() = display;
    }

    pub(crate) fn take_root_container(&self) -> Option<Rc<dyn DisplayObject>> {
        self.root.borrow_mut().take()
    }

    // =========================================================================
    // Repeat index
    // =========================================================================

    /// Current position of a list directive iterating inside this instance.
    pub fn repeat_index(&self) -> usize {
        self.repeat_index.get()
    }

    /// Return the current repeat index and advance it.
    pub fn next_repeat_index(&self) -> usize {
        let index = self.repeat_index.get();
        self.repeat_index.set(index + 1);
        index
    }

    pub fn reset_repeat_index(&self) {
        self.repeat_index.set(0);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    pub(crate) fn mark(&self, stage: Lifecycle) {
        self.lifecycle.set(self.lifecycle.get() | stage);
    }

    pub(crate) fn unmark(&self, stage: Lifecycle) {
        self.lifecycle.set(self.lifecycle.get() - stage);
    }

    /// Register a callback to run when this instance is deleted.
    pub fn on_destroy(&self, callback: impl FnOnce() + 'static) {
        self.destroy_callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Run and clear destroy callbacks.
    pub(crate) fn destroy(&self) {
        let callbacks = std::mem::take(&mut *self.destroy_callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }
        self.mark(Lifecycle::DESTROYED);
    }
}

impl Context for Instance {
    fn view_model(&self) -> &Rc<ViewModel> {
        &self.vm
    }

    fn context_name(&self) -> &str {
        &self.component
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("component", &self.component)
            .field("root", &self.root.borrow().as_ref().map(|d| d.display_id()))
            .field("lifecycle", &self.lifecycle.get())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Scene
// =============================================================================

/// Top-level owner for root components.
///
/// Every field declared with [`data`](Scene::data) is reactive, so directive
/// triggers on a scene work the same as on an instance.
pub struct Scene {
    name: String,
    vm: Rc<ViewModel>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_limit(name, DEFAULT_MAX_NOTIFICATIONS)
    }

    /// Scene whose drains deliver at most `limit` callbacks.
    /// [`SceneRuntime::scene`](super::SceneRuntime::scene) passes the
    /// configured limit.
    pub fn with_limit(name: impl Into<String>, limit: usize) -> Self {
        let name = name.into();
        let vm = Rc::new(ViewModel::new(name.clone(), limit));
        Self { name, vm }
    }

    /// Declare a reactive field.
    pub fn data(self, field: &str, value: impl Into<Value>) -> Self {
        self.vm.install_field(field, PropertyKind::Data, value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Value {
        self.vm.get(field)
    }

    pub fn set(&self, field: &str, value: impl Into<Value>) {
        self.vm.set(field, value.into());
    }
}

impl Context for Scene {
    fn view_model(&self) -> &Rc<ViewModel> {
        &self.vm
    }

    fn context_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("vm", &self.vm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_instance_seeds_defaults() {
        let class = ComponentClass::new("Spin").field("speed", 1);
        let instance = Instance::new(4, &class, DEFAULT_MAX_NOTIFICATIONS);

        assert_eq!(instance.id(), 4);
        assert_eq!(instance.component(), "Spin");
        assert_eq!(instance.get("speed"), Value::Int(1));
        assert!(instance.root_container().is_none());
        assert_eq!(instance.lifecycle(), Lifecycle::NONE);
    }

    #[test]
    fn test_repeat_index() {
        let instance = Instance::new(1, &ComponentClass::new("List"), 16);
        assert_eq!(instance.next_repeat_index(), 0);
        assert_eq!(instance.next_repeat_index(), 1);
        assert_eq!(instance.repeat_index(), 2);
        instance.reset_repeat_index();
        assert_eq!(instance.repeat_index(), 0);
    }

    #[test]
    fn test_destroy_callbacks_run_once() {
        let instance = Instance::new(1, &ComponentClass::new("Card"), 16);
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        instance.on_destroy(move || count_clone.set(count_clone.get() + 1));

        instance.destroy();
        instance.destroy();
        assert_eq!(count.get(), 1);
        assert!(instance.lifecycle().contains(Lifecycle::DESTROYED));
    }

    #[test]
    fn test_scene_fields_are_reactive() {
        let scene = Scene::new("Main").data("score", 0);
        let seen = Rc::new(Cell::new(0i64));
        let seen_clone = seen.clone();
        scene.view_model().subscribe(
            "score",
            Rc::new(move |value, _| seen_clone.set(value.as_int().unwrap_or(-1))),
        );

        scene.set("score", 7);
        assert_eq!(seen.get(), 7);
        assert_eq!(scene.context_name(), "Main");
    }

    #[test]
    fn test_scene_limit() {
        assert_eq!(Scene::new("Main").view_model().limit(), DEFAULT_MAX_NOTIFICATIONS);
        assert_eq!(Scene::with_limit("Main", 3).view_model().limit(), 3);
    }
}
