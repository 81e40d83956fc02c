//! Counter Example - Bindings, getters, watches and a condition
//!
//! This example drives a small scene through the headless backend:
//! - A `Counter` component bound to a scene field
//! - A getter derived from the bound value, with a watch on it
//! - A condition that detaches the display while the count is odd
//!
//! Run with: RUST_LOG=debug cargo run --example counter

use std::rc::Rc;

use spark_scene::template::field;
use spark_scene::{
    ComponentClass, ComponentNode, Container, GetterSpec, HeadlessBackend, HeadlessContainer,
    Scene, SceneRuntime, Value,
};

fn main() -> spark_scene::Result<()> {
    env_logger::init();

    println!("=== spark-scene Counter Example ===\n");

    let runtime = SceneRuntime::new(HeadlessBackend::new());

    // Declarations may come before registration.
    runtime.declare_prop("Counter", "count")?;
    runtime.declare_getter(
        "Counter",
        GetterSpec::new("even", ["count"], |vm| {
            Value::Bool(vm.get("count").as_int().unwrap_or(0) % 2 == 0)
        }),
    )?;
    runtime.add_watch("Counter", "even", "on_even");

    let class = ComponentClass::new("Counter")
        .field("count", 0)
        .on_create(|counter| println!("created counter {}", counter.id()))
        .method("on_even", |counter, value, _| {
            println!("  counter {}: even = {}", counter.id(), value);
        });
    let template = ComponentNode::new("Counter")
        .child(ComponentNode::new("label"))
        .condition("even", field("even"), ["even"]);
    runtime.register(class, template);

    let scene = Scene::new("Main").data("clicks", 0);
    let container = Rc::new(HeadlessContainer::new());
    let target: Rc<dyn Container> = container.clone();

    let node =
        ComponentNode::new("Counter").directive("bind", "count", field("clicks"), ["clicks"]);
    let Some(counter) = runtime.build_component(&scene, &node, &target, &(), None)? else {
        return Ok(());
    };

    for clicks in 1..=4 {
        scene.set("clicks", clicks);
        println!(
            "clicks = {}, count = {}, display = {:?}",
            clicks,
            counter.get("count"),
            counter.root_container().map(|d| d.display_id())
        );
    }

    println!("\ncontainer received displays {:?}", container.added());
    println!("live displays: {}", runtime.backend().live_count());

    runtime.delete_component(counter.id())?;
    println!("after delete: {} instances", runtime.instance_count());

    Ok(())
}
