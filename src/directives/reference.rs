//! `ref` - Expose the built instance on its owner.

use std::rc::Rc;

use super::Directive;
use crate::engine::Instance;
use crate::reactive::ViewModel;
use crate::template::Expression;
use crate::types::{Value, camel_case};

/// Stores `Value::Instance(id)` in the owner field named by the argument.
/// The field is reset to `Null` when the instance is deleted, unless it has
/// been pointed elsewhere in the meantime.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ref;

impl Directive for Ref {
    fn name(&self) -> &str {
        "ref"
    }

    fn bind(
        &self,
        owner: &Rc<ViewModel>,
        instance: &Rc<Instance>,
        argument: &str,
        _expression: &Expression,
        _triggers: &[String],
    ) {
        let field = camel_case(argument);
        let id = instance.id();
        owner.set(&field, Value::Instance(id));

        let weak_owner = Rc::downgrade(owner);
        instance.on_destroy(move || {
            if let Some(owner) = weak_owner.upgrade() {
                if owner.get(&field) == Value::Instance(id) {
                    owner.set(&field, Value::Null);
                }
            }
        });
    }
}
