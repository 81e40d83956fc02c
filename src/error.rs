//! Error types.
//!
//! Every failure is surfaced synchronously to the immediate caller. Nothing in
//! the crate retries.

use thiserror::Error;

use crate::reactive::PropertyKind;
use crate::types::InstanceId;

/// Errors raised by the component registry, the property graph and the
/// instantiator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A build, rebuild or property lookup referenced an unregistered name.
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// A template referenced a directive that was never added.
    #[error("Unknown directive: {0}")]
    UnknownDirective(String),

    /// Delete or rebuild referenced an id that is not in the store.
    #[error("No instance with id {0}")]
    MissingInstance(InstanceId),

    /// An explicit build id belongs to a live instance of another component.
    #[error("Id {id} is held by a live {component}")]
    IdInUse { id: InstanceId, component: String },

    /// A watch names a method the component class does not define.
    #[error("Component {component} has no method `{method}`")]
    UnknownMethod { component: String, method: String },

    /// A field was declared under two different kinds.
    #[error("Field `{field}` of {component} is already declared as {existing}")]
    ConflictingProperty {
        component: String,
        field: String,
        existing: PropertyKind,
    },

    /// A declaration arrived after the component's first build.
    #[error("Active properties of {0} are frozen")]
    FrozenProperties(String),

    /// Getter dependencies loop back on themselves.
    #[error("Getter cycle in {component} through `{getter}`")]
    GetterCycle { component: String, getter: String },
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, SceneError>;
