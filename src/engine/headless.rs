//! Headless backend - In-memory display objects for tools and tests.
//!
//! Every definition node becomes a [`HeadlessDisplay`]. Children naming a
//! registered component are built through the runtime with the current
//! instance as owner; any other child becomes a plain labelled display.
//! A plain child carrying a `repeat` directive becomes one display per item
//! of its source, labelled `name[index]` from the instance's repeat index.
//! The backend keeps every live display and a log of deletions.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{error, trace};

use super::display::{Container, DisplayBackend, DisplayObject};
use super::instance::{Context, Instance};
use super::runtime::SceneRuntime;
use crate::directives::repeat_items;
use crate::template::ComponentNode;
use crate::types::DisplayId;

// =============================================================================
// Display objects
// =============================================================================

pub struct HeadlessDisplay {
    id: DisplayId,
    label: String,
    children: RefCell<Vec<Rc<dyn DisplayObject>>>,
}

impl HeadlessDisplay {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn child_ids(&self) -> Vec<DisplayId> {
        self.children.borrow().iter().map(|c| c.display_id()).collect()
    }
}

impl DisplayObject for HeadlessDisplay {
    fn display_id(&self) -> DisplayId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Container for HeadlessDisplay {
    fn add(&self, display: Rc<dyn DisplayObject>) {
        self.children.borrow_mut().push(display);
    }
}

impl fmt::Debug for HeadlessDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessDisplay")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("children", &self.child_ids())
            .finish()
    }
}

/// Root container that records what was added to it.
#[derive(Default)]
pub struct HeadlessContainer {
    added: RefCell<Vec<DisplayId>>,
}

impl HeadlessContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids added so far, in order.
    pub fn added(&self) -> Vec<DisplayId> {
        self.added.borrow().clone()
    }
}

impl Container for HeadlessContainer {
    fn add(&self, display: Rc<dyn DisplayObject>) {
        self.added.borrow_mut().push(display.display_id());
    }
}

impl fmt::Debug for HeadlessContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessContainer")
            .field("added", &self.added.borrow())
            .finish()
    }
}

// =============================================================================
// Backend
// =============================================================================

#[derive(Default)]
pub struct HeadlessBackend {
    next_id: Cell<DisplayId>,
    displays: RefCell<HashMap<DisplayId, Rc<HeadlessDisplay>>>,
    deleted: RefCell<Vec<DisplayId>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, label: String) -> Rc<HeadlessDisplay> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let display = Rc::new(HeadlessDisplay {
            id,
            label,
            children: RefCell::new(Vec::new()),
        });
        self.displays.borrow_mut().insert(id, Rc::clone(&display));
        display
    }

    fn build_children(
        &self,
        runtime: &Rc<SceneRuntime<Self>>,
        instance: &Rc<Instance>,
        parent: &Rc<HeadlessDisplay>,
        children: &[ComponentNode],
    ) {
        for child in children {
            if runtime.has_component(&child.name) {
                let target: Rc<dyn Container> = parent.clone();
                let built = runtime.build_component(instance.as_ref(), child, &target, &(), None);
                if let Err(e) = built {
                    error!(
                        "{} {}: child {} failed: {}",
                        instance.component(),
                        instance.id(),
                        child.name,
                        e
                    );
                }
                continue;
            }

            let Some(source) = child.directives.iter().find(|d| d.name == "repeat") else {
                let display = self.create(child.name.clone());
                parent.add(display.clone());
                self.build_children(runtime, instance, &display, &child.children);
                continue;
            };
            let items = repeat_items((source.value)(instance.view_model()));
            for _ in items {
                let index = instance.next_repeat_index();
                let display = self.create(format!("{}[{}]", child.name, index));
                parent.add(display.clone());
                self.build_children(runtime, instance, &display, &child.children);
            }
        }
    }

    pub fn display(&self, id: DisplayId) -> Option<Rc<HeadlessDisplay>> {
        self.displays.borrow().get(&id).cloned()
    }

    pub fn is_live(&self, id: DisplayId) -> bool {
        self.displays.borrow().contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.displays.borrow().len()
    }

    /// Every deleted id, in deletion order.
    pub fn deleted(&self) -> Vec<DisplayId> {
        self.deleted.borrow().clone()
    }
}

impl DisplayBackend for HeadlessBackend {
    type Engine = ();

    fn build_display_object(
        &self,
        runtime: &Rc<SceneRuntime<Self>>,
        instance: &Rc<Instance>,
        node: &ComponentNode,
        _engine: &(),
        _container: &Rc<dyn Container>,
    ) -> Option<Rc<dyn DisplayObject>> {
        let root = self.create(format!("{}#{}", node.name, instance.id()));
        self.build_children(runtime, instance, &root, &node.children);
        trace!("built display {} for {}", root.id, root.label);
        Some(root as Rc<dyn DisplayObject>)
    }

    fn delete_display(&self, display_id: DisplayId) {
        let Some(display) = self.displays.borrow_mut().remove(&display_id) else {
            return;
        };
        self.deleted.borrow_mut().push(display_id);
        let children = std::mem::take(&mut *display.children.borrow_mut());
        for child in children {
            self.delete_display(child.display_id());
        }
    }
}

impl fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessBackend")
            .field("live", &self.displays.borrow().len())
            .field("deleted", &self.deleted.borrow().len())
            .finish()
    }
}
