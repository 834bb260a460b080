//! Factory templates
//!
//! A template is a named set of value definitions plus the information needed
//! to construct the base object they are applied to. Templates declared inside
//! another template's definition are sub-factories: they keep a handle to their
//! parent and inherit every definition they do not replace.

use crate::buildable::{Buildable, Instance};
use crate::session::BuildStyle;
use crate::value::ValueDefinition;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces the base object for plain object builds
pub type ObjectBuilder = Arc<dyn Fn() -> Instance + Send + Sync>;

pub(crate) type SubfactoryDefinition = Box<dyn FnOnce(&mut FactoryTemplate) + Send + Sync>;

/// Handle to a template owned by a [`FactoryRegistry`](crate::FactoryRegistry)
///
/// Handles never keep anything alive; the registry owns every template.
/// [`FactoryRegistry::undefine_all`](crate::FactoryRegistry::undefine_all)
/// invalidates every handle issued before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// How the base object of a build is created
#[derive(Clone)]
pub enum BaseConstructor {
    /// Call a zero-argument builder (object style)
    Builder(ObjectBuilder),
    /// Insert a new entity of this type into a persistence context (entity style)
    Entity(String),
}

impl BaseConstructor {
    /// Build base objects with a closure
    pub fn builder<T, F>(builder: F) -> Self
    where
        T: Buildable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        BaseConstructor::Builder(Arc::new(move || Box::new(builder()) as Instance))
    }

    /// Build base objects with `T::default()`
    pub fn object<T: Buildable + Default>() -> Self {
        Self::builder(T::default)
    }

    /// Insert entities of the named type
    pub fn entity(entity_name: impl Into<String>) -> Self {
        BaseConstructor::Entity(entity_name.into())
    }
}

impl fmt::Debug for BaseConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseConstructor::Builder(_) => f.write_str("Builder(..)"),
            BaseConstructor::Entity(name) => f.debug_tuple("Entity").field(name).finish(),
        }
    }
}

/// A named, reusable recipe for one kind of object
pub struct FactoryTemplate {
    name: String,
    base: Option<BaseConstructor>,
    definitions: HashMap<String, ValueDefinition>,
    parent: Option<TemplateId>,
    subfactories: Vec<(String, SubfactoryDefinition)>,
}

impl FactoryTemplate {
    pub(crate) fn new(name: impl Into<String>, base: Option<BaseConstructor>) -> Self {
        Self {
            name: name.into(),
            base,
            definitions: HashMap::new(),
            parent: None,
            subfactories: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The template this one was declared inside of
    pub fn parent(&self) -> Option<TemplateId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<TemplateId>) {
        self.parent = parent;
    }

    pub fn base(&self) -> Option<&BaseConstructor> {
        self.base.as_ref()
    }

    /// Replace the base constructor
    pub fn set_base(&mut self, base: BaseConstructor) -> &mut Self {
        self.base = Some(base);
        self
    }

    /// The definitions declared on this template, excluding inherited ones
    pub fn definitions(&self) -> &HashMap<String, ValueDefinition> {
        &self.definitions
    }

    pub fn definition(&self, property: &str) -> Option<&ValueDefinition> {
        self.definitions.get(property)
    }

    /// Store a value definition for a property, replacing any previous one
    pub fn set_definition(
        &mut self,
        property: impl Into<String>,
        definition: ValueDefinition,
    ) -> &mut Self {
        self.definitions.insert(property.into(), definition);
        self
    }

    /// Set a property to a literal value, serialized now
    ///
    /// A value that cannot be serialized is not dropped: builds using this
    /// template fail with [`FactoryError::Serialization`](crate::FactoryError).
    pub fn set<V: Serialize>(&mut self, property: impl Into<String>, value: V) -> &mut Self {
        self.set_definition(property, ValueDefinition::serialized(value))
    }

    /// Set a property to a value computed on every build
    pub fn set_lazy<F>(&mut self, property: impl Into<String>, producer: F) -> &mut Self
    where
        F: Fn() -> JsonValue + Send + Sync + 'static,
    {
        self.set_definition(property, ValueDefinition::lazy(producer))
    }

    /// Set a property from a counter that advances on every build
    pub fn set_sequence<F>(&mut self, property: impl Into<String>, producer: F) -> &mut Self
    where
        F: Fn(usize) -> JsonValue + Send + Sync + 'static,
    {
        self.set_definition(property, ValueDefinition::sequence(producer))
    }

    /// Set a property to an object built from another factory
    pub fn set_factory(&mut self, property: impl Into<String>, factory: &str) -> &mut Self {
        self.set_definition(property, ValueDefinition::factory(factory))
    }

    /// Set a property to an object built from an altered copy of another factory
    pub fn set_factory_with<F>(
        &mut self,
        property: impl Into<String>,
        factory: &str,
        overrides: F,
    ) -> &mut Self
    where
        F: Fn(&mut FactoryTemplate) + Send + Sync + 'static,
    {
        self.set_definition(property, ValueDefinition::factory_with(factory, overrides))
    }

    /// Set a property to `count` objects built from another factory
    pub fn set_collection(
        &mut self,
        property: impl Into<String>,
        factory: &str,
        count: usize,
    ) -> &mut Self {
        self.set_definition(property, ValueDefinition::collection(factory, count))
    }

    /// Set a property to `count` objects, each built from a copy altered by its index
    pub fn set_collection_with<F>(
        &mut self,
        property: impl Into<String>,
        factory: &str,
        count: usize,
        overrides: F,
    ) -> &mut Self
    where
        F: Fn(usize, &mut FactoryTemplate) + Send + Sync + 'static,
    {
        self.set_definition(
            property,
            ValueDefinition::collection_with(factory, count, overrides),
        )
    }

    /// Assign anything convertible into a value definition
    pub fn assign(
        &mut self,
        property: impl Into<String>,
        value: impl Into<ValueDefinition>,
    ) -> &mut Self {
        self.set_definition(property, value.into())
    }

    /// Remove this template's own definition of a property
    pub fn unset(&mut self, property: &str) -> Option<ValueDefinition> {
        self.definitions.remove(property)
    }

    /// Declare a sub-factory of this template
    ///
    /// The sub-factory starts with this template's base constructor and is
    /// registered in the same registry once this template's definition is done.
    /// Declarations made while overriding a template for a single build are
    /// ignored.
    pub fn define<F>(&mut self, name: impl Into<String>, definition: F) -> &mut Self
    where
        F: FnOnce(&mut FactoryTemplate) + Send + Sync + 'static,
    {
        self.subfactories.push((name.into(), Box::new(definition)));
        self
    }

    pub(crate) fn take_subfactories(&mut self) -> Vec<(String, SubfactoryDefinition)> {
        std::mem::take(&mut self.subfactories)
    }

    pub(crate) fn has_pending_subfactories(&self) -> bool {
        !self.subfactories.is_empty()
    }

    /// Check whether this template carries what `style` needs to create a base object
    pub fn is_buildable(&self, style: BuildStyle) -> bool {
        match style {
            BuildStyle::Object => matches!(self.base, Some(BaseConstructor::Builder(_))),
            BuildStyle::Entity => matches!(self.base, Some(BaseConstructor::Entity(_))),
            BuildStyle::Record => true,
        }
    }
}

impl Clone for FactoryTemplate {
    /// Copies the base constructor, definitions and parent handle. Pending
    /// sub-factory declarations stay with the original.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            base: self.base.clone(),
            definitions: self.definitions.clone(),
            parent: self.parent,
            subfactories: Vec::new(),
        }
    }
}

impl fmt::Debug for FactoryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryTemplate")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("definitions", &self.definitions)
            .field("parent", &self.parent)
            .finish()
    }
}
