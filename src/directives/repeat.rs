//! `repeat` - Feed a list to a component that renders one display per item.
//!
//! The directive only keeps the list field current. The display backend reads
//! the component's repeat sources when it materializes, and labels each copy
//! with the instance's running repeat index.

use std::rc::Rc;

use super::Directive;
use super::bind::sync_field;
use crate::engine::Instance;
use crate::reactive::ViewModel;
use crate::template::Expression;
use crate::types::{Value, camel_case};

/// Writes `expression(owner)`, coerced to a list, to the instance field named
/// by the argument, and again whenever one of the triggers changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Repeat;

impl Directive for Repeat {
    fn name(&self) -> &str {
        "repeat"
    }

    fn bind(
        &self,
        owner: &Rc<ViewModel>,
        instance: &Rc<Instance>,
        argument: &str,
        expression: &Expression,
        triggers: &[String],
    ) {
        let source = Rc::clone(expression);
        let compute: Expression = Rc::new(move |vm| Value::List(repeat_items(source(vm))));
        sync_field(owner, instance, &camel_case(argument), compute, triggers);
    }
}

/// Items a repeat source produces. Missing values repeat nothing, a list
/// repeats per element and anything else repeats once.
pub fn repeat_items(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Undefined | Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ComponentClass, Context, Scene};
    use crate::reactive::PropertyKind;
    use crate::template::field;

    fn target() -> Rc<Instance> {
        let instance = Rc::new(Instance::new(1, &ComponentClass::new("List"), 16));
        instance
            .view_model()
            .install_field("items", PropertyKind::Prop, Value::Undefined);
        instance
    }

    #[test]
    fn test_repeat_items_coercion() {
        assert!(repeat_items(Value::Undefined).is_empty());
        assert!(repeat_items(Value::Null).is_empty());
        assert_eq!(repeat_items(Value::Int(4)), vec![Value::Int(4)]);
        assert_eq!(
            repeat_items(Value::List(vec![Value::Int(1), Value::Int(2)])),
            vec![Value::Int(1), Value::Int(2)]
        );
    }

    #[test]
    fn test_repeat_tracks_source_list() {
        let scene = Scene::new("Main").data("todos", Value::List(vec!["a".into(), "b".into()]));
        let instance = target();

        let triggers = ["todos".to_string()];
        Repeat.bind(scene.view_model(), &instance, "items", &field("todos"), &triggers);
        assert_eq!(instance.get("items"), Value::List(vec!["a".into(), "b".into()]));

        scene.set("todos", "c");
        assert_eq!(instance.get("items"), Value::List(vec!["c".into()]));

        instance.destroy();
        assert_eq!(scene.view_model().listener_count("todos"), 0);
    }
}
