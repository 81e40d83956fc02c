//! # spark-scene
//!
//! Reactive component framework for embedding in a host renderer's scene graph.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! reactive enumeration of live instances.
//!
//! ## Architecture
//!
//! Parsed template nodes are compiled into live component instances. Each
//! instance owns a view model whose data, prop and getter fields notify
//! dependents through an explicit queue. Directives wire owner expressions
//! to instance fields, condition entries detach and rebuild display
//! sub-trees, and watches call class methods when fields change.
//!
//! ```text
//! ComponentNode → SceneRuntime::build_component → Instance → DisplayBackend
//! ```
//!
//! The runtime never draws: a [`DisplayBackend`] owns every display object.
//!
//! ## Modules
//!
//! - [`types`] - Core types (Value, InstanceId, DisplayId)
//! - [`template`] - Parsed component nodes and expression closures
//! - [`reactive`] - Active-property graph, view models, watches
//! - [`directives`] - Directive contract, registry and built-ins
//! - [`engine`] - Component classes, instances, store, runtime, headless backend
//! - [`config`] - Runtime configuration
//! - [`error`] - Error types

pub mod config;
pub mod directives;
pub mod engine;
pub mod error;
pub mod reactive;
pub mod template;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{ConfigError, IndexStrategy, SceneConfig};
pub use error::{Result, SceneError};

pub use template::{ComponentNode, Expression, Guard, Normal, ParsedDirective};

pub use reactive::{
    ActiveProperties, Declaration, GetterSpec, Listener, ListenerId, PropertyGraph, PropertyKind,
    ViewModel, WatchEntry, WatchRegistry,
};

pub use directives::{
    Bind, ConditionSet, Directive, DirectiveRegistry, Ref, Repeat, repeat_items,
};

pub use engine::{
    // Classes
    ComponentClass, Hook, Hooks, Lifecycle, Method,
    // Instances
    Cleanup, Context, Instance, Scene,
    // Display contract
    Container, DisplayBackend, DisplayObject,
    // Runtime
    ComponentDefinition, InstanceStore, SceneRuntime,
    // Headless backend
    HeadlessBackend, HeadlessContainer, HeadlessDisplay,
};
