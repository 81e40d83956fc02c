//! Condition entries - Stateful show/hide of an instance's display sub-tree.
//!
//! Unlike directives, condition entries are evaluated against the instance
//! itself. While every entry is truthy the instance keeps its root display.
//! When one turns falsy the root display is torn down but the instance stays
//! in the store, still reactive; when all are truthy again the display is
//! rebuilt from the live instance.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, error};

use crate::engine::{Container, Context, DisplayBackend, Instance, SceneRuntime};
use crate::reactive::Listener;
use crate::template::ParsedDirective;

/// The bound condition entries of one instance.
#[derive(Debug, Clone)]
pub struct ConditionSet {
    states: Rc<RefCell<Vec<bool>>>,
}

impl ConditionSet {
    /// Evaluate `entries` against `instance` and subscribe to their triggers.
    ///
    /// Trigger changes flip the instance between
    /// [`delete_component_root_container`](SceneRuntime::delete_component_root_container)
    /// and [`build_root_container`](SceneRuntime::build_root_container).
    pub fn bind<B: DisplayBackend>(
        runtime: &Rc<SceneRuntime<B>>,
        instance: &Rc<Instance>,
        entries: &[ParsedDirective],
        engine: &B::Engine,
        container: &Rc<dyn Container>,
    ) -> Self {
        let vm = instance.view_model();
        let states: Vec<bool> = entries.iter().map(|e| (e.value)(vm).is_truthy()).collect();
        let set = Self {
            states: Rc::new(RefCell::new(states)),
        };

        let mut subscriptions = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            if entry.triggers.is_empty() {
                continue;
            }
            let states = Rc::clone(&set.states);
            let weak_runtime = Rc::downgrade(runtime);
            let weak_instance = Rc::downgrade(instance);
            let expression = Rc::clone(&entry.value);
            let engine = engine.clone();
            let container = Rc::clone(container);
            let listener: Listener = Rc::new(move |_, _| {
                let (Some(runtime), Some(instance)) =
                    (weak_runtime.upgrade(), weak_instance.upgrade())
                else {
                    return;
                };
                let state = expression(instance.view_model()).is_truthy();
                let (was, now) = {
                    let mut states = states.borrow_mut();
                    let was = states.iter().all(|s| *s);
                    states[index] = state;
                    (was, states.iter().all(|s| *s))
                };
                if was == now {
                    return;
                }

                let id = instance.id();
                let result = if now {
                    debug!("{} {}: condition met, rebuilding display", instance.component(), id);
                    runtime.build_root_container(id, &engine, &container)
                } else {
                    debug!("{} {}: condition failed, detaching display", instance.component(), id);
                    runtime.delete_component_root_container(id)
                };
                if let Err(e) = result {
                    error!("{} {}: condition update failed: {}", instance.component(), id, e);
                }
            });

            for trigger in &entry.triggers {
                subscriptions.push((trigger.clone(), vm.subscribe(trigger, Rc::clone(&listener))));
            }
        }

        if !subscriptions.is_empty() {
            let weak_vm = Rc::downgrade(vm);
            instance.on_destroy(move || {
                if let Some(vm) = weak_vm.upgrade() {
                    for (trigger, id) in subscriptions {
                        vm.unsubscribe(&trigger, id);
                    }
                }
            });
        }

        set
    }

    /// True when every entry is truthy. An empty set is satisfied.
    pub fn is_satisfied(&self) -> bool {
        self.states.borrow().iter().all(|s| *s)
    }

    pub fn len(&self) -> usize {
        self.states.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.borrow().is_empty()
    }
}
