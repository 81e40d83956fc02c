//! Scene engine - Component classes, instances and the runtime that builds them.
//!
//! - Component: class descriptors, hooks, lifecycle flags
//! - Instance: live components and the top-level scene context
//! - Display: the contract a renderer implements
//! - Store: id-indexed instance table with a per-name index
//! - Runtime: registry + instantiator service object
//! - Headless: in-memory display backend
//!
//! # Architecture
//!
//! ```text
//! ComponentNode ──build──► Instance ──backend──► display sub-tree
//!                              │
//!                              └── ViewModel (data / prop / getter)
//! ```
//!
//! The store holds the only long-lived strong reference to an instance. It
//! also records which instances were built into another's display sub-tree,
//! so tearing that sub-tree down deletes them too.
//! Listeners, directives and conditions capture weak references.

mod component;
mod display;
mod headless;
mod instance;
mod runtime;
mod store;

pub use component::*;
pub use display::*;
pub use headless::*;
pub use instance::*;
pub use runtime::*;
pub use store::*;
