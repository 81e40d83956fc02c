//! `bind` - Keep an instance field equal to an owner expression.

use std::rc::Rc;

use super::Directive;
use crate::engine::Instance;
use crate::reactive::{Listener, ViewModel};
use crate::template::Expression;
use crate::types::camel_case;

/// Writes `expression(owner)` to the instance field named by the argument,
/// and again whenever one of the triggers changes on the owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bind;

impl Directive for Bind {
    fn name(&self) -> &str {
        "bind"
    }

    fn bind(
        &self,
        owner: &Rc<ViewModel>,
        instance: &Rc<Instance>,
        argument: &str,
        expression: &Expression,
        triggers: &[String],
    ) {
        sync_field(owner, instance, &camel_case(argument), Rc::clone(expression), triggers);
    }
}

/// Write `compute(owner)` to `field` now and whenever a trigger changes on
/// the owner. Subscriptions are released when the instance is destroyed.
pub(super) fn sync_field(
    owner: &Rc<ViewModel>,
    instance: &Rc<Instance>,
    field: &str,
    compute: Expression,
    triggers: &[String],
) {
    instance.set(field, compute(owner));

    if triggers.is_empty() {
        return;
    }

    let weak_owner = Rc::downgrade(owner);
    let weak_instance = Rc::downgrade(instance);
    let target = field.to_string();
    let listener: Listener = Rc::new(move |_, _| {
        let (Some(owner), Some(instance)) = (weak_owner.upgrade(), weak_instance.upgrade()) else {
            return;
        };
        instance.set(&target, compute(&owner));
    });

    let ids: Vec<_> = triggers
        .iter()
        .map(|trigger| (trigger.clone(), owner.subscribe(trigger, Rc::clone(&listener))))
        .collect();

    let weak_owner = Rc::downgrade(owner);
    instance.on_destroy(move || {
        if let Some(owner) = weak_owner.upgrade() {
            for (trigger, id) in ids {
                owner.unsubscribe(&trigger, id);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ComponentClass, Context, Scene};
    use crate::reactive::PropertyKind;
    use crate::template::field;
    use crate::types::Value;

    fn target() -> Rc<Instance> {
        let instance = Rc::new(Instance::new(1, &ComponentClass::new("Spin"), 16));
        instance
            .view_model()
            .install_field("moveSpeed", PropertyKind::Prop, Value::Undefined);
        instance
    }

    #[test]
    fn test_bind_writes_initial_value() {
        let scene = Scene::new("Main").data("speed", 3);
        let instance = target();

        Bind.bind(scene.view_model(), &instance, "move-speed", &field("speed"), &[]);
        assert_eq!(instance.get("moveSpeed"), Value::Int(3));
    }

    #[test]
    fn test_bind_follows_triggers() {
        let scene = Scene::new("Main").data("speed", 3);
        let instance = target();

        Bind.bind(
            scene.view_model(),
            &instance,
            "move-speed",
            &field("speed"),
            &["speed".to_string()],
        );
        scene.set("speed", 9);
        assert_eq!(instance.get("moveSpeed"), Value::Int(9));
    }

    #[test]
    fn test_bind_releases_subscriptions_on_destroy() {
        let scene = Scene::new("Main").data("speed", 3);
        let instance = target();

        Bind.bind(
            scene.view_model(),
            &instance,
            "move-speed",
            &field("speed"),
            &["speed".to_string()],
        );
        assert_eq!(scene.view_model().listener_count("speed"), 1);

        instance.destroy();
        assert_eq!(scene.view_model().listener_count("speed"), 0);
    }
}
