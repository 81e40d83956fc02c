//! Reactive layer - Active properties, view models and watches.
//!
//! - [`active_property`] - Per-component classification of fields into data,
//!   prop and getter, with the declare-before-or-after-registration protocol
//! - [`view_model`] - Per-context field table that notifies dependents on
//!   writes through an explicit queue
//! - [`watch`] - Declared (property, method) pairs attached once an instance
//!   exists
//!
//! # Update Flow
//!
//! ```text
//! set(field) → recompute dependent getters (topological) → enqueue listeners
//!            → drain queue (listeners may write again; they only enqueue)
//! ```

pub mod active_property;
pub mod view_model;
pub mod watch;

pub use active_property::*;
pub use view_model::*;
pub use watch::*;
