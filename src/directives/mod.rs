//! Directives - Pluggable binders that wire template expressions to instances.
//!
//! A directive receives the owner's view model, the instance being built, the
//! directive argument, the expression and the trigger properties. It may read
//! the expression once, and/or subscribe to the triggers on the owner so it
//! re-runs when they change.
//!
//! Built-ins:
//! - [`Bind`] - `bind:field="expr"`, keeps an instance field in sync
//! - [`Ref`] - `ref:name`, stores the instance id on the owner
//! - [`Repeat`] - `repeat:field="expr"`, keeps a list field for repeated displays
//!
//! [`ConditionSet`] is not a registered directive: the instantiator binds it
//! directly, against the instance itself.

mod bind;
mod condition;
mod reference;
mod repeat;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::engine::Instance;
use crate::error::{Result, SceneError};
use crate::reactive::ViewModel;
use crate::template::Expression;

pub use bind::Bind;
pub use condition::ConditionSet;
pub use reference::Ref;
pub use repeat::{Repeat, repeat_items};

// =============================================================================
// Directive Contract
// =============================================================================

/// A named binder.
pub trait Directive {
    /// Name templates use to refer to this directive.
    fn name(&self) -> &str;

    fn bind(
        &self,
        owner: &Rc<ViewModel>,
        instance: &Rc<Instance>,
        argument: &str,
        expression: &Expression,
        triggers: &[String],
    );
}

// =============================================================================
// Registry
// =============================================================================

/// Directive name → binder.
#[derive(Default)]
pub struct DirectiveRegistry {
    directives: HashMap<String, Rc<dyn Directive>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`Bind`], [`Ref`] and [`Repeat`] already added.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.add_directive(Bind);
        registry.add_directive(Ref);
        registry.add_directive(Repeat);
        registry
    }

    /// Add a directive, replacing any directive with the same name.
    pub fn add_directive(&mut self, directive: impl Directive + 'static) {
        let directive: Rc<dyn Directive> = Rc::new(directive);
        self.directives.insert(directive.name().to_string(), directive);
    }

    pub fn get_directive(&self, name: &str) -> Result<Rc<dyn Directive>> {
        self.directives
            .get(name)
            .cloned()
            .ok_or_else(|| SceneError::UnknownDirective(name.to_string()))
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.directives.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveRegistry")
            .field("directives", &self.names())
            .finish()
    }
}
