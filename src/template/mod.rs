//! Template nodes - The parser's output, consumed by the instantiator.
//!
//! A [`ComponentNode`] is immutable once parsed. Its attribute, directive,
//! guard and condition entries are already-analyzed expression closures over
//! a calling context's [`ViewModel`]. This crate never parses template text.
//!
//! # Example
//!
//! ```ignore
//! use spark_scene::template::{ComponentNode, field, literal};
//!
//! // <spin speed="5" :angle="heading" />
//! let node = ComponentNode::new("Spin")
//!     .normal("speed", literal(5))
//!     .directive("bind", "angle", field("heading"), ["heading"]);
//! ```

use std::fmt;
use std::rc::Rc;

use crate::reactive::ViewModel;
use crate::types::Value;

// =============================================================================
// Expression Types
// =============================================================================

/// Expression evaluated against a calling context.
pub type Expression = Rc<dyn Fn(&ViewModel) -> Value>;

/// Guard predicate evaluated against the owning context.
pub type Guard = Rc<dyn Fn(&ViewModel) -> bool>;

/// Wrap a closure as an [`Expression`].
pub fn expression(f: impl Fn(&ViewModel) -> Value + 'static) -> Expression {
    Rc::new(f)
}

/// Expression that always yields `value`.
pub fn literal(value: impl Into<Value>) -> Expression {
    let value = value.into();
    Rc::new(move |_| value.clone())
}

/// Expression that reads `name` from the context.
pub fn field(name: impl Into<String>) -> Expression {
    let name = name.into();
    Rc::new(move |vm| vm.get(&name))
}

/// Wrap a closure as a [`Guard`].
pub fn guard(f: impl Fn(&ViewModel) -> bool + 'static) -> Guard {
    Rc::new(f)
}

// =============================================================================
// Node Entries
// =============================================================================

/// Plain attribute: `speed="5"`.
#[derive(Clone)]
pub struct Normal {
    /// Attribute name as written (dashed form).
    pub name: String,
    pub value: Expression,
}

/// Directive attribute: `name:argument="value"`.
#[derive(Clone)]
pub struct ParsedDirective {
    /// Directive name, looked up in the directive registry.
    pub name: String,
    pub argument: String,
    pub value: Expression,
    /// Context properties whose changes re-run the directive.
    pub triggers: Vec<String>,
}

// =============================================================================
// ComponentNode
// =============================================================================

/// A parsed template node.
#[derive(Clone, Default)]
pub struct ComponentNode {
    pub name: String,
    /// Attributes, in template order.
    pub normals: Vec<Normal>,
    /// Directives, in template order.
    pub directives: Vec<ParsedDirective>,
    /// Internal display structure.
    pub children: Vec<ComponentNode>,
    /// All must hold against the owner for the node to instantiate.
    pub check: Vec<Guard>,
    /// Bound against the built instance itself, not its owner.
    pub condition: Vec<ParsedDirective>,
}

impl ComponentNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn normal(mut self, name: impl Into<String>, value: Expression) -> Self {
        self.normals.push(Normal {
            name: name.into(),
            value,
        });
        self
    }

    pub fn directive<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        argument: impl Into<String>,
        value: Expression,
        triggers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.directives.push(ParsedDirective {
            name: name.into(),
            argument: argument.into(),
            value,
            triggers: triggers.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn child(mut self, child: ComponentNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn check(mut self, guard: Guard) -> Self {
        self.check.push(guard);
        self
    }

    pub fn condition<S: Into<String>>(
        mut self,
        argument: impl Into<String>,
        value: Expression,
        triggers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.condition.push(ParsedDirective {
            name: "if".to_string(),
            argument: argument.into(),
            value,
            triggers: triggers.into_iter().map(Into::into).collect(),
        });
        self
    }
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode")
            .field("name", &self.name)
            .field(
                "normals",
                &self.normals.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            )
            .field(
                "directives",
                &self
                    .directives
                    .iter()
                    .map(|d| format!("{}:{}", d.name, d.argument))
                    .collect::<Vec<_>>(),
            )
            .field("children", &self.children)
            .field("check", &self.check.len())
            .field("condition", &self.condition.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_order() {
        let node = ComponentNode::new("Spin")
            .normal("speed", literal(5))
            .normal("move-speed", literal(2))
            .directive("bind", "angle", field("heading"), ["heading"])
            .child(ComponentNode::new("Sprite"))
            .check(guard(|_| true))
            .condition("visible", field("visible"), ["visible"]);

        assert_eq!(node.name, "Spin");
        let names: Vec<&str> = node.normals.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["speed", "move-speed"]);
        assert_eq!(node.directives[0].triggers, vec!["heading".to_string()]);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.check.len(), 1);
        assert_eq!(node.condition[0].name, "if");
    }

    #[test]
    fn test_expressions_read_context() {
        let vm = ViewModel::new("scene", 16);
        vm.seed("heading", Value::Int(90));

        assert_eq!(field("heading")(&vm), Value::Int(90));
        assert_eq!(field("missing")(&vm), Value::Undefined);
        assert_eq!(literal("x")(&vm), Value::from("x"));
        assert!(guard(|vm| vm.get("heading").is_truthy())(&vm));
    }
}
