//! Display adapter contract.
//!
//! The runtime never draws anything. It hands a component's definition node
//! to a [`DisplayBackend`], which turns the node's children into
//! renderer-native display objects, and it asks the backend to delete those
//! objects again on teardown.

use std::any::Any;
use std::rc::Rc;

use super::instance::Instance;
use super::runtime::SceneRuntime;
use crate::template::ComponentNode;
use crate::types::DisplayId;

/// A renderer-side object owned by the backend.
pub trait DisplayObject {
    fn display_id(&self) -> DisplayId;

    /// Downcast hook for backends that need their concrete type back.
    fn as_any(&self) -> &dyn Any;
}

/// Something display objects can be added to.
pub trait Container {
    fn add(&self, display: Rc<dyn DisplayObject>);
}

/// Engine-specific materialization of component sub-trees.
pub trait DisplayBackend: Sized + 'static {
    /// Render/engine handle passed through every build.
    type Engine: Clone + 'static;

    /// Materialize `node`'s children for `instance`.
    ///
    /// Children that are themselves components are expected to be built
    /// through `runtime` with `instance` as owner. Returning `None` leaves
    /// the instance without a root display.
    fn build_display_object(
        &self,
        runtime: &Rc<SceneRuntime<Self>>,
        instance: &Rc<Instance>,
        node: &ComponentNode,
        engine: &Self::Engine,
        container: &Rc<dyn Container>,
    ) -> Option<Rc<dyn DisplayObject>>;

    /// Delete a display object and everything below it.
    fn delete_display(&self, display_id: DisplayId);
}
