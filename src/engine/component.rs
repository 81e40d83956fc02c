//! Component classes - What a registered component is built from.
//!
//! A [`ComponentClass`] replaces duck-typed constructors: field defaults are
//! listed once, hooks are optional slots, and watch targets are named
//! methods looked up when an instance is built.
//!
//! # Example
//!
//! ```ignore
//! let spin = ComponentClass::new("Spin")
//!     .field("speed", 0)
//!     .on_create(|instance| log::info!("spin {} ready", instance.id()))
//!     .method("on_speed", |instance, value, _previous| {
//!         instance.set("label", Value::from(format!("speed {value}")));
//!     });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::instance::Instance;
use crate::types::Value;

// =============================================================================
// Hooks and Methods
// =============================================================================

/// Lifecycle hook. Called with the instance being built.
pub type Hook = Rc<dyn Fn(&Instance)>;

/// Watch target. Called with `(instance, value, previous)`.
pub type Method = Rc<dyn Fn(&Instance, &Value, &Value)>;

/// Optional lifecycle hooks.
#[derive(Clone, Default)]
pub struct Hooks {
    /// After the view model and attributes are set, before conditions bind.
    pub init: Option<Hook>,
    /// After the display sub-tree exists.
    pub create: Option<Hook>,
}

// =============================================================================
// Lifecycle Flags
// =============================================================================

bitflags::bitflags! {
    /// Build stages an instance has passed through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lifecycle: u8 {
        const NONE = 0;
        /// View model installed.
        const REACTIVE = 1 << 0;
        /// Init hook has run (or there was none).
        const INITIALIZED = 1 << 1;
        /// Present in the instance store.
        const REGISTERED = 1 << 2;
        /// Root display object attached.
        const MATERIALIZED = 1 << 3;
        /// Create hook has run (or there was none).
        const CREATED = 1 << 4;
        /// Root display torn down, instance kept.
        const DETACHED = 1 << 5;
        /// Removed from the store.
        const DESTROYED = 1 << 6;
    }
}

// =============================================================================
// ComponentClass
// =============================================================================

/// Constructor descriptor for a component type.
#[derive(Clone)]
pub struct ComponentClass {
    name: String,
    fields: Vec<(String, Value)>,
    hooks: Hooks,
    methods: HashMap<String, Method>,
}

impl ComponentClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            hooks: Hooks::default(),
            methods: HashMap::new(),
        }
    }

    /// Declare a field with its default value. Redeclaring replaces the default.
    pub fn field(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        let name = name.into();
        let default = default.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, value)) => *value = default,
            None => self.fields.push((name, default)),
        }
        self
    }

    pub fn on_init(mut self, hook: impl Fn(&Instance) + 'static) -> Self {
        self.hooks.init = Some(Rc::new(hook));
        self
    }

    pub fn on_create(mut self, hook: impl Fn(&Instance) + 'static) -> Self {
        self.hooks.create = Some(Rc::new(hook));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Instance, &Value, &Value) + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field defaults, in declaration order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn get_method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("ComponentClass")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("init", &self.hooks.init.is_some())
            .field("create", &self.hooks.create.is_some())
            .field("methods", &methods)
            .finish()
    }
}
