//! Scene Runtime - Component registry and instantiator.
//!
//! One [`SceneRuntime`] owns every table the framework needs: component
//! definitions, the active-property graph, directives, watches and the
//! instance store. Construct it once and pass it to whatever builds
//! components.
//!
//! # Example
//!
//! ```ignore
//! use spark_scene::{ComponentClass, ComponentNode, HeadlessBackend, Scene, SceneRuntime};
//! use spark_scene::template::literal;
//!
//! let runtime = SceneRuntime::new(HeadlessBackend::new());
//! runtime.register(ComponentClass::new("Spin"), ComponentNode::new("Spin"));
//! runtime.declare_prop("Spin", "speed")?;
//!
//! let scene = Scene::new("Main");
//! let node = ComponentNode::new("Spin").normal("speed", literal(5));
//! let spin = runtime.build_component(&scene, &node, &container, &(), None)?;
//! ```
//!
//! All interior borrows are released before any hook, directive, listener or
//! backend call, so those callbacks may call back into the runtime.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, error, warn};
use spark_signals::{Signal, signal};

use super::component::{ComponentClass, Lifecycle, Method};
use super::display::{Container, DisplayBackend};
use super::instance::{Context, Instance, Scene};
use super::store::InstanceStore;
use crate::config::SceneConfig;
use crate::directives::{ConditionSet, Directive, DirectiveRegistry};
use crate::error::{Result, SceneError};
use crate::reactive::{
    ActiveProperties, Declaration, GetterSpec, PropertyGraph, WatchEntry, WatchRegistry,
};
use crate::template::ComponentNode;
use crate::types::{InstanceId, Value, camel_case};

// =============================================================================
// Component Definition
// =============================================================================

/// A registered component: its template node and its class.
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    node: Rc<ComponentNode>,
    class: Rc<ComponentClass>,
}

impl ComponentDefinition {
    pub fn node(&self) -> &Rc<ComponentNode> {
        &self.node
    }

    pub fn class(&self) -> &Rc<ComponentClass> {
        &self.class
    }
}

// =============================================================================
// Runtime
// =============================================================================

pub struct SceneRuntime<B: DisplayBackend> {
    config: SceneConfig,
    backend: B,
    definitions: RefCell<HashMap<String, ComponentDefinition>>,
    properties: RefCell<PropertyGraph>,
    directives: RefCell<DirectiveRegistry>,
    watches: RefCell<WatchRegistry>,
    store: RefCell<InstanceStore>,
    /// Bumped after every store insert or remove, once the store borrow is
    /// released. Readers of `live_ids` depend on it.
    live_version: Signal<u64>,
    live_seq: Cell<u64>,
    /// Instances whose display sub-tree is being built, innermost last.
    materializing: RefCell<Vec<InstanceId>>,
    next_id: Cell<InstanceId>,
}

impl<B: DisplayBackend> SceneRuntime<B> {
    pub fn new(backend: B) -> Rc<Self> {
        Self::with_config(backend, SceneConfig::default())
    }

    pub fn with_config(backend: B, config: SceneConfig) -> Rc<Self> {
        Rc::new(Self {
            store: RefCell::new(InstanceStore::new(config.index_strategy)),
            live_version: signal(0),
            live_seq: Cell::new(0),
            materializing: RefCell::new(Vec::new()),
            next_id: Cell::new(config.first_instance_id),
            definitions: RefCell::new(HashMap::new()),
            properties: RefCell::new(PropertyGraph::new()),
            directives: RefCell::new(DirectiveRegistry::with_builtins()),
            watches: RefCell::new(WatchRegistry::new()),
            config,
            backend,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// A top-level scene using this runtime's notification limit.
    pub fn scene(&self, name: impl Into<String>) -> Scene {
        Scene::with_limit(name, self.config.max_notifications)
    }

    // =========================================================================
    // Component registry
    // =========================================================================

    /// Register a component under its class name.
    ///
    /// Installs a fresh property record and replays every declaration made
    /// for the name so far. Registering a name twice replaces the definition.
    pub fn register(&self, class: ComponentClass, node: ComponentNode) {
        let name = class.name().to_string();
        let definition = ComponentDefinition {
            node: Rc::new(node),
            class: Rc::new(class),
        };
        if self
            .definitions
            .borrow_mut()
            .insert(name.clone(), definition)
            .is_some()
        {
            warn!("component {} registered twice, replacing definition", name);
        }
        self.store.borrow_mut().init_index(&name);
        self.properties
            .borrow_mut()
            .init_active_property(&name, ActiveProperties::default());
        debug!("registered component {}", name);
    }

    /// Forget a component. Live instances are left alone.
    pub fn cancel(&self, name: &str) {
        self.definitions.borrow_mut().remove(name);
        self.store.borrow_mut().drop_index(name);
        self.properties.borrow_mut().remove(name);
        debug!("cancelled component {}", name);
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.definitions.borrow().contains_key(name)
    }

    /// Every registered class, sorted by name.
    pub fn get_all_registers(&self) -> Vec<Rc<ComponentClass>> {
        let mut classes: Vec<Rc<ComponentClass>> = self
            .definitions
            .borrow()
            .values()
            .map(|d| Rc::clone(&d.class))
            .collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));
        classes
    }

    pub fn definition(&self, name: &str) -> Result<ComponentDefinition> {
        self.definitions
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| SceneError::UnknownComponent(name.to_string()))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Declare an active property. Allowed before or after registration.
    pub fn declare(&self, component: &str, declaration: Declaration) -> Result<()> {
        self.properties.borrow_mut().declare(component, declaration)
    }

    pub fn declare_data(&self, component: &str, field: &str) -> Result<()> {
        self.declare(component, Declaration::Data(field.to_string()))
    }

    pub fn declare_prop(&self, component: &str, field: &str) -> Result<()> {
        self.declare(component, Declaration::Prop(field.to_string()))
    }

    pub fn declare_getter(&self, component: &str, getter: GetterSpec) -> Result<()> {
        self.declare(component, Declaration::Getter(getter))
    }

    /// The frozen property record for `name`. Freezes it if needed.
    pub fn active_properties(&self, name: &str) -> Result<Rc<ActiveProperties>> {
        self.properties.borrow_mut().get_active_properties(name)
    }

    /// Call `method` on each instance of `component` when `property` changes.
    ///
    /// Applies to instances built afterwards.
    pub fn add_watch(&self, component: &str, property: &str, method: &str) {
        self.watches.borrow_mut().add_watch(component, property, method);
    }

    pub fn watches_of(&self, component: &str) -> Vec<WatchEntry> {
        self.watches.borrow().get_watches(component).to_vec()
    }

    pub fn add_directive(&self, directive: impl Directive + 'static) {
        self.directives.borrow_mut().add_directive(directive);
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.borrow().has_directive(name)
    }

    // =========================================================================
    // Instantiation
    // =========================================================================

    /// Build an instance of `node.name` under `owner`.
    ///
    /// `id` of `None` allocates a fresh identity. `Some(id)` reuses it; a
    /// positive id is a rebuild and restores the component's data fields
    /// from `owner`. Returns `Ok(None)` when a `check` guard rejects the
    /// node. Every lookup that can fail runs before anything is allocated or
    /// registered.
    pub fn build_component(
        self: &Rc<Self>,
        owner: &dyn Context,
        node: &ComponentNode,
        container: &Rc<dyn Container>,
        engine: &B::Engine,
        id: Option<InstanceId>,
    ) -> Result<Option<Rc<Instance>>> {
        let owner_vm = owner.view_model();

        if !node.check.iter().all(|check| check(owner_vm)) {
            debug!("{} guarded out under {}", node.name, owner.context_name());
            return Ok(None);
        }

        let definition = self.definition(&node.name)?;
        let record = self.active_properties(&node.name)?;
        let binders = {
            let directives = self.directives.borrow();
            node.directives
                .iter()
                .map(|d| directives.get_directive(&d.name))
                .collect::<Result<Vec<_>>>()?
        };
        let watches = self.resolve_watches(&node.name, &definition.class)?;
        if let Some(existing) = id.filter(|&id| id > 0).and_then(|id| self.get_instance(id)) {
            if existing.component() != node.name {
                return Err(SceneError::IdInUse {
                    id: existing.id(),
                    component: existing.component().to_string(),
                });
            }
        }

        let rebuild = id.is_some_and(|id| id > 0);
        let id = self.allocate_id(id);
        self.retire(id);
        let instance = Rc::new(Instance::new(
            id,
            &definition.class,
            self.config.max_notifications,
        ));

        if rebuild {
            for field in record.data() {
                if owner_vm.has(field) {
                    instance.view_model().seed(field, owner_vm.get(field));
                }
            }
        }

        instance.view_model().install(&record);
        instance.mark(Lifecycle::REACTIVE);

        for normal in &node.normals {
            let field = camel_case(&normal.name);
            let value = (normal.value)(owner_vm);
            self.warn_if_undefined(&node.name, &field, &value);
            instance.set(&field, value);
        }

        for (directive, binder) in node.directives.iter().zip(&binders) {
            let value = (directive.value)(owner_vm);
            self.warn_if_undefined(&node.name, &directive.argument, &value);
            binder.bind(
                owner_vm,
                &instance,
                &directive.argument,
                &directive.value,
                &directive.triggers,
            );
        }

        if let Some(init) = &definition.class.hooks().init {
            init(&instance);
        }
        instance.mark(Lifecycle::INITIALIZED);

        let conditions =
            ConditionSet::bind(self, &instance, &definition.node.condition, engine, container);

        let parent = self.materializing.borrow().last().copied();
        {
            let mut store = self.store.borrow_mut();
            store.insert(&node.name, Rc::clone(&instance));
            if let Some(parent) = parent {
                store.attach_child(parent, id);
            }
        }
        self.bump_live();
        instance.mark(Lifecycle::REGISTERED);

        let mut subscriptions = Vec::with_capacity(watches.len());
        for (property, method) in watches {
            let weak = Rc::downgrade(&instance);
            let listener = instance.view_model().subscribe(
                &property,
                Rc::new(move |value, previous| {
                    if let Some(instance) = weak.upgrade() {
                        method(&instance, value, previous);
                    }
                }),
            );
            subscriptions.push((property, listener));
        }
        if !subscriptions.is_empty() {
            let vm = Rc::downgrade(instance.view_model());
            instance.on_destroy(move || {
                if let Some(vm) = vm.upgrade() {
                    for (property, listener) in subscriptions {
                        vm.unsubscribe(&property, listener);
                    }
                }
            });
        }

        if conditions.is_satisfied() {
            self.materialize(&instance, &definition.node, engine, container);
        } else {
            instance.mark(Lifecycle::DETACHED);
            debug!("{} {} built detached", node.name, id);
        }

        if let Some(create) = &definition.class.hooks().create {
            create(&instance);
        }
        instance.mark(Lifecycle::CREATED);

        instance.reset_repeat_index();
        debug!("built {} {} under {}", node.name, id, owner.context_name());
        Ok(Some(instance))
    }

    /// Re-materialize the display sub-tree of a live instance.
    ///
    /// Construction is not repeated: no attributes, directives, hooks or
    /// watches run.
    pub fn build_root_container(
        self: &Rc<Self>,
        id: InstanceId,
        engine: &B::Engine,
        container: &Rc<dyn Container>,
    ) -> Result<()> {
        let instance = self
            .get_instance(id)
            .ok_or(SceneError::MissingInstance(id))?;
        let definition = self.definition(instance.component())?;

        self.tear_down_display(&instance);
        self.materialize(&instance, &definition.node, engine, container);
        instance.reset_repeat_index();
        instance.unmark(Lifecycle::DETACHED);
        debug!("rebuilt display of {} {}", instance.component(), id);
        Ok(())
    }

    fn materialize(
        self: &Rc<Self>,
        instance: &Rc<Instance>,
        node: &ComponentNode,
        engine: &B::Engine,
        container: &Rc<dyn Container>,
    ) {
        self.materializing.borrow_mut().push(instance.id());
        let display = self
            .backend
            .build_display_object(self, instance, node, engine, container);
        self.materializing.borrow_mut().pop();
        instance.set_root_container(display.clone());
        if let Some(display) = display {
            container.add(display);
            instance.mark(Lifecycle::MATERIALIZED);
        }
    }

    fn resolve_watches(
        &self,
        component: &str,
        class: &ComponentClass,
    ) -> Result<Vec<(String, Method)>> {
        self.watches
            .borrow()
            .get_watches(component)
            .iter()
            .map(|watch| {
                class
                    .get_method(&watch.method)
                    .map(|method| (watch.property.clone(), Rc::clone(method)))
                    .ok_or_else(|| SceneError::UnknownMethod {
                        component: component.to_string(),
                        method: watch.method.clone(),
                    })
            })
            .collect()
    }

    fn allocate_id(&self, requested: Option<InstanceId>) -> InstanceId {
        match requested {
            Some(id) if id > 0 => {
                if id >= self.next_id.get() {
                    self.next_id.set(id.saturating_add(1));
                }
                id
            }
            _ => {
                let id = self.next_id.get();
                self.next_id.set(id.saturating_add(1));
                id
            }
        }
    }

    /// Tear down a live instance whose id is being built again.
    fn retire(&self, id: InstanceId) {
        let Some(old) = self.store.borrow_mut().remove(id) else {
            return;
        };
        self.bump_live();
        self.tear_down_display(&old);
        old.destroy();
        debug!("replaced {} {}", old.component(), id);
    }

    /// Delete the components built into `instance`'s display sub-tree, then
    /// the sub-tree itself.
    fn tear_down_display(&self, instance: &Instance) {
        let children = self.store.borrow_mut().take_children(instance.id());
        for child in children {
            if let Err(e) = self.delete_component(child) {
                error!(
                    "{} {}: child {} teardown failed: {}",
                    instance.component(),
                    instance.id(),
                    child,
                    e
                );
            }
        }
        if let Some(root) = instance.take_root_container() {
            self.backend.delete_display(root.display_id());
        }
    }

    fn bump_live(&self) {
        let version = self.live_seq.get() + 1;
        self.live_seq.set(version);
        self.live_version.set(version);
    }

    fn warn_if_undefined(&self, component: &str, attribute: &str, value: &Value) {
        if self.config.warn_on_undefined && value.is_undefined() {
            warn!(
                "{} component: `{}` evaluated to undefined",
                component, attribute
            );
        }
    }

    // =========================================================================
    // Instance store
    // =========================================================================

    pub fn get_instance(&self, id: InstanceId) -> Option<Rc<Instance>> {
        self.store.borrow().get(id)
    }

    /// Delete an instance, its display sub-tree and the components built
    /// into that sub-tree.
    pub fn delete_component(&self, id: InstanceId) -> Result<()> {
        let instance = self
            .get_instance(id)
            .ok_or(SceneError::MissingInstance(id))?;
        self.tear_down_display(&instance);
        self.store.borrow_mut().remove(id);
        self.bump_live();
        instance.destroy();
        debug!("deleted {} {}", instance.component(), id);
        Ok(())
    }

    /// Delete an instance's display sub-tree and the components built into
    /// it, keeping the instance.
    pub fn delete_component_root_container(&self, id: InstanceId) -> Result<()> {
        let instance = self
            .get_instance(id)
            .ok_or(SceneError::MissingInstance(id))?;
        self.tear_down_display(&instance);
        instance.unmark(Lifecycle::MATERIALIZED);
        instance.mark(Lifecycle::DETACHED);
        debug!("detached display of {} {}", instance.component(), id);
        Ok(())
    }

    /// Ids indexed under `name`, in build order.
    pub fn instance_ids(&self, name: &str) -> Vec<InstanceId> {
        self.store.borrow().ids_of(name)
    }

    /// Number of name buckets listing `id`.
    pub fn index_buckets_containing(&self, id: InstanceId) -> usize {
        self.store.borrow().buckets_containing(id)
    }

    /// Components built into `id`'s current display sub-tree.
    pub fn children_of(&self, id: InstanceId) -> Vec<InstanceId> {
        self.store.borrow().children_of(id)
    }

    pub fn instance_count(&self) -> usize {
        self.store.borrow().len()
    }

    /// Live ids.
    ///
    /// Note: This creates a reactive dependency when called from a derived/effect.
    pub fn live_ids(&self) -> Vec<InstanceId> {
        let _ = self.live_version.get();
        self.store.borrow().ids()
    }
}

impl<B: DisplayBackend> fmt::Debug for SceneRuntime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut components: Vec<String> = self.definitions.borrow().keys().cloned().collect();
        components.sort();
        f.debug_struct("SceneRuntime")
            .field("config", &self.config)
            .field("components", &components)
            .field("directives", &self.directives.borrow().names())
            .field("instances", &self.store.borrow().len())
            .field("next_id", &self.next_id.get())
            .finish_non_exhaustive()
    }
}
