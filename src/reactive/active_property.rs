//! Active-Property Graph - Which fields of a component type are reactive.
//!
//! Every registered component name owns an [`ActiveProperties`] record with
//! three disjoint sets: `data`, `prop` and `getter`. Declarations may arrive
//! before or after the component is registered:
//!
//! - Before: they are appended to the name's declaration log and replayed,
//!   in order, when [`PropertyGraph::init_active_property`] runs.
//! - After: they apply to the open record immediately.
//!
//! The record freezes the first time a build asks for it. From then on it is
//! shared as `Rc<ActiveProperties>` and never changes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use log::debug;

use super::view_model::ViewModel;
use crate::error::{Result, SceneError};
use crate::types::Value;

// =============================================================================
// Property Kinds
// =============================================================================

/// Classification of an active property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Plain reactive field owned by the instance.
    Data,
    /// Field supplied from outside, usually through template attributes.
    Prop,
    /// Computed field, re-evaluated when its dependencies change.
    Getter,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Data => "data",
            PropertyKind::Prop => "prop",
            PropertyKind::Getter => "getter",
        };
        f.write_str(name)
    }
}

/// Computes a getter from the current state of a view model.
pub type ComputeFn = Rc<dyn Fn(&ViewModel) -> Value>;

/// A computed field and the fields it reads.
#[derive(Clone)]
pub struct GetterSpec {
    pub name: String,
    /// Data, prop or getter fields the computation reads.
    pub dependencies: Vec<String>,
    pub compute: ComputeFn,
}

impl GetterSpec {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        dependencies: impl IntoIterator<Item = S>,
        compute: impl Fn(&ViewModel) -> Value + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            compute: Rc::new(compute),
        }
    }
}

impl fmt::Debug for GetterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterSpec")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// One declaration against a component name.
#[derive(Clone, Debug)]
pub enum Declaration {
    Data(String),
    Prop(String),
    Getter(GetterSpec),
}

impl Declaration {
    pub fn field(&self) -> &str {
        match self {
            Declaration::Data(name) | Declaration::Prop(name) => name,
            Declaration::Getter(spec) => &spec.name,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            Declaration::Data(_) => PropertyKind::Data,
            Declaration::Prop(_) => PropertyKind::Prop,
            Declaration::Getter(_) => PropertyKind::Getter,
        }
    }
}

// =============================================================================
// ActiveProperties
// =============================================================================

/// The data/prop/getter sets of one component type.
#[derive(Clone, Debug, Default)]
pub struct ActiveProperties {
    data: Vec<String>,
    prop: Vec<String>,
    getters: Vec<GetterSpec>,
    /// Getter names, dependencies first. Filled when the record freezes.
    order: Vec<String>,
}

impl ActiveProperties {
    pub fn data(&self) -> &[String] {
        &self.data
    }

    pub fn prop(&self) -> &[String] {
        &self.prop
    }

    pub fn getters(&self) -> &[GetterSpec] {
        &self.getters
    }

    /// Getter names in evaluation order.
    pub fn getter_order(&self) -> &[String] {
        &self.order
    }

    pub fn getter(&self, name: &str) -> Option<&GetterSpec> {
        self.getters.iter().find(|g| g.name == name)
    }

    /// Which set `field` belongs to, if any.
    pub fn kind_of(&self, field: &str) -> Option<PropertyKind> {
        if self.data.iter().any(|f| f == field) {
            Some(PropertyKind::Data)
        } else if self.prop.iter().any(|f| f == field) {
            Some(PropertyKind::Prop)
        } else if self.getter(field).is_some() {
            Some(PropertyKind::Getter)
        } else {
            None
        }
    }

    /// Total number of active fields.
    pub fn len(&self) -> usize {
        self.data.len() + self.prop.len() + self.getters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a declaration. Same field, same kind is a no-op.
    fn declare(&mut self, component: &str, declaration: Declaration) -> Result<()> {
        if let Some(existing) = self.kind_of(declaration.field()) {
            return if existing == declaration.kind() {
                Ok(())
            } else {
                Err(SceneError::ConflictingProperty {
                    component: component.to_string(),
                    field: declaration.field().to_string(),
                    existing,
                })
            };
        }
        match declaration {
            Declaration::Data(name) => self.data.push(name),
            Declaration::Prop(name) => self.prop.push(name),
            Declaration::Getter(spec) => self.getters.push(spec),
        }
        Ok(())
    }

    /// Order getters so every getter follows the getters it reads.
    fn resolve_order(&mut self, component: &str) -> Result<()> {
        self.order = self.topological_getters(component)?;
        Ok(())
    }

    fn topological_getters(&self, component: &str) -> Result<Vec<String>> {
        let mut order = Vec::with_capacity(self.getters.len());
        let mut done: HashSet<&str> = HashSet::new();
        let mut visiting: HashSet<&str> = HashSet::new();

        fn visit<'a>(
            record: &'a ActiveProperties,
            name: &'a str,
            component: &str,
            done: &mut HashSet<&'a str>,
            visiting: &mut HashSet<&'a str>,
            order: &mut Vec<String>,
        ) -> Result<()> {
            if done.contains(name) {
                return Ok(());
            }
            if !visiting.insert(name) {
                return Err(SceneError::GetterCycle {
                    component: component.to_string(),
                    getter: name.to_string(),
                });
            }
            if let Some(spec) = record.getter(name) {
                for dep in &spec.dependencies {
                    if record.getter(dep).is_some() {
                        visit(record, dep, component, done, visiting, order)?;
                    }
                }
            }
            visiting.remove(name);
            done.insert(name);
            order.push(name.to_string());
            Ok(())
        }

        for spec in &self.getters {
            visit(self, &spec.name, component, &mut done, &mut visiting, &mut order)?;
        }
        Ok(order)
    }
}

// =============================================================================
// PropertyGraph
// =============================================================================

enum Entry {
    Open(ActiveProperties),
    Frozen(Rc<ActiveProperties>),
}

/// All component names' active-property records.
#[derive(Default)]
pub struct PropertyGraph {
    entries: HashMap<String, Entry>,
    /// Every accepted declaration, per name, in arrival order.
    log: HashMap<String, Vec<Declaration>>,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `record` for `name` and replay the name's declaration log.
    ///
    /// Replaces any earlier record, frozen or not.
    pub fn init_active_property(&mut self, name: &str, mut record: ActiveProperties) {
        if let Some(declarations) = self.log.get(name) {
            for declaration in declarations {
                // The log never holds conflicting entries.
                let _ = record.declare(name, declaration.clone());
            }
            debug!("replayed {} declarations for {}", declarations.len(), name);
        }
        self.entries.insert(name.to_string(), Entry::Open(record));
    }

    /// Declare a field for `name`, queuing it if `name` is not registered.
    pub fn declare(&mut self, name: &str, declaration: Declaration) -> Result<()> {
        match self.entries.get_mut(name) {
            Some(Entry::Frozen(_)) => return Err(SceneError::FrozenProperties(name.to_string())),
            Some(Entry::Open(record)) => record.declare(name, declaration.clone())?,
            None => {
                let queued = self.log.get(name).map(Vec::as_slice).unwrap_or(&[]);
                if let Some(existing) = queued.iter().find(|d| d.field() == declaration.field()) {
                    if existing.kind() == declaration.kind() {
                        return Ok(());
                    }
                    return Err(SceneError::ConflictingProperty {
                        component: name.to_string(),
                        field: declaration.field().to_string(),
                        existing: existing.kind(),
                    });
                }
            }
        }
        let log = self.log.entry(name.to_string()).or_default();
        if !log.iter().any(|d| d.field() == declaration.field()) {
            log.push(declaration);
        }
        Ok(())
    }

    /// The frozen record for `name`, freezing it on first use.
    pub fn get_active_properties(&mut self, name: &str) -> Result<Rc<ActiveProperties>> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| SceneError::UnknownComponent(name.to_string()))?;
        let record = match entry {
            Entry::Frozen(record) => return Ok(Rc::clone(record)),
            Entry::Open(record) => {
                record.resolve_order(name)?;
                Rc::new(std::mem::take(record))
            }
        };
        debug!("froze {} active properties for {}", record.len(), name);
        *entry = Entry::Frozen(Rc::clone(&record));
        Ok(record)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_frozen(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Entry::Frozen(_)))
    }

    /// Declarations waiting for `name` to be registered.
    pub fn pending_count(&self, name: &str) -> usize {
        if self.entries.contains_key(name) {
            0
        } else {
            self.log.get(name).map_or(0, Vec::len)
        }
    }

    /// Drop the record for `name`. Its declaration log is kept for a later
    /// re-registration.
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(name);
    }
}
