//! Build sessions
//!
//! A session resolves one named template into a populated object graph. It
//! borrows the registry for its whole lifetime, so templates cannot change
//! underneath a build, and every nested build runs through the same session
//! with the same style and persistence context.

use crate::buildable::{Buildable, FixtureValue, Instance};
use crate::error::{FactoryError, FactoryResult};
use crate::record::Record;
use crate::registry::FactoryRegistry;
use crate::store::PersistenceContext;
use crate::template::{BaseConstructor, FactoryTemplate};
use crate::value::ValueDefinition;
use std::fmt;

/// Which backend produces base objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStyle {
    /// Call the template's object builder
    Object,
    /// Start from an empty [`Record`]
    Record,
    /// Insert an entity into the session's persistence context
    Entity,
}

impl fmt::Display for BuildStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self {
            BuildStyle::Object => "object",
            BuildStyle::Record => "record",
            BuildStyle::Entity => "entity",
        };
        write!(f, "{}", style)
    }
}

/// Per-call build context over a borrowed registry
pub struct BuildSession<'a> {
    registry: &'a FactoryRegistry,
    style: BuildStyle,
    context: Option<&'a mut dyn PersistenceContext>,
    depth: usize,
}

impl<'a> BuildSession<'a> {
    /// Create a session building in object or record style
    pub fn new(registry: &'a FactoryRegistry, style: BuildStyle) -> Self {
        Self {
            registry,
            style,
            context: None,
            depth: 0,
        }
    }

    /// Create a session inserting entities into `context`
    pub fn with_context(
        registry: &'a FactoryRegistry,
        context: &'a mut dyn PersistenceContext,
    ) -> Self {
        Self {
            registry,
            style: BuildStyle::Entity,
            context: Some(context),
            depth: 0,
        }
    }

    pub fn style(&self) -> BuildStyle {
        self.style
    }

    /// Build a top-level object and run the registry's after-build hooks on it
    ///
    /// Returns `Ok(None)` when no factory is registered under `name`.
    pub fn build(
        &mut self,
        name: &str,
        overrides: Option<&dyn Fn(&mut FactoryTemplate)>,
    ) -> FactoryResult<Option<Instance>> {
        let mut built = self.resolve(name, overrides)?;
        if let Some(instance) = built.as_mut() {
            self.clean_up(name, &mut **instance);
        }
        Ok(built)
    }

    /// Resolve a template into a populated object without running hooks
    pub fn resolve(
        &mut self,
        name: &str,
        overrides: Option<&dyn Fn(&mut FactoryTemplate)>,
    ) -> FactoryResult<Option<Instance>> {
        let registry = self.registry;
        let Some(stored) = registry.template(name) else {
            tracing::debug!("Factory '{}' is not defined", name);
            return Ok(None);
        };

        // Instance overrides only ever touch a private copy
        let altered;
        let template = match overrides {
            Some(alter) => {
                let mut copy = stored.clone();
                alter(&mut copy);
                if copy.has_pending_subfactories() {
                    tracing::warn!(
                        "Ignoring sub-factories declared while overriding '{}'",
                        name
                    );
                }
                altered = copy;
                &altered
            }
            None => stored,
        };

        if !template.is_buildable(self.style) {
            return Err(FactoryError::unbuildable(name, self.style));
        }

        if let Some(max_depth) = registry.config().max_depth {
            if self.depth > max_depth {
                return Err(FactoryError::DepthExceeded {
                    factory: name.to_string(),
                    depth: max_depth,
                });
            }
        }

        self.depth += 1;
        let populated = self.populate(template);
        self.depth -= 1;

        populated.map(Some)
    }

    fn populate(&mut self, template: &FactoryTemplate) -> FactoryResult<Instance> {
        let mut instance = self.make_base(template)?;

        for level in self.ancestors(template) {
            for (property, definition) in level.definitions() {
                let Some(value) = self.make_value(property, definition)? else {
                    continue;
                };
                tracing::debug!(
                    "Applying {} with {} from factory '{}'",
                    property,
                    value.kind(),
                    level.name()
                );
                instance.set_property(property, value)?;
            }
        }

        Ok(instance)
    }

    /// The template followed by its parents, ordered root first
    fn ancestors<'t>(&self, leaf: &'t FactoryTemplate) -> Vec<&'t FactoryTemplate>
    where
        'a: 't,
    {
        let mut chain = vec![leaf];
        let mut parent = leaf.parent();
        while let Some(id) = parent {
            let Some(template) = self.registry.template_by_id(id) else {
                break;
            };
            chain.push(template);
            parent = template.parent();
        }
        chain.reverse();

        tracing::trace!(
            "Resolved ancestors of '{}': {:?}",
            leaf.name(),
            chain.iter().map(|t| t.name()).collect::<Vec<_>>()
        );
        chain
    }

    fn make_base(&mut self, template: &FactoryTemplate) -> FactoryResult<Instance> {
        match (self.style, template.base()) {
            (BuildStyle::Object, Some(BaseConstructor::Builder(builder))) => Ok(builder()),
            (BuildStyle::Record, _) => Ok(Box::new(Record::new())),
            (BuildStyle::Entity, Some(BaseConstructor::Entity(entity))) => {
                match self.context.as_mut() {
                    Some(context) => context.insert_entity(entity),
                    None => Err(FactoryError::configuration(
                        "entity builds need a persistence context",
                    )),
                }
            }
            _ => Err(FactoryError::unbuildable(template.name(), self.style)),
        }
    }

    fn make_value(
        &mut self,
        property: &str,
        definition: &ValueDefinition,
    ) -> FactoryResult<Option<FixtureValue>> {
        match definition {
            ValueDefinition::Literal(producer) => Ok(Some(FixtureValue::Data(producer()?))),
            ValueDefinition::Factory { name, overrides } => {
                let alter = overrides
                    .as_ref()
                    .map(|f| &**f as &dyn Fn(&mut FactoryTemplate));
                match self.resolve(name, alter)? {
                    Some(instance) => Ok(Some(FixtureValue::Object(instance))),
                    None => self.missing(property, name),
                }
            }
            ValueDefinition::Collection {
                name,
                count,
                overrides,
            } => {
                if !self.registry.contains(name) {
                    return self.missing(property, name);
                }

                let mut items = Vec::with_capacity(*count);
                for index in 0..*count {
                    let built = match overrides {
                        Some(per_index) => {
                            let alter = |item: &mut FactoryTemplate| per_index(index, item);
                            self.resolve(name, Some(&alter))?
                        }
                        None => self.resolve(name, None)?,
                    };
                    items.extend(built);
                }
                Ok(Some(FixtureValue::Collection(items)))
            }
        }
    }

    fn missing(&self, property: &str, factory: &str) -> FactoryResult<Option<FixtureValue>> {
        if self.registry.config().strict_references {
            return Err(FactoryError::missing_factory(factory));
        }
        tracing::warn!(
            "Leaving '{}' unset: factory '{}' is not defined",
            property,
            factory
        );
        Ok(None)
    }

    fn clean_up(&self, name: &str, instance: &mut dyn Buildable) {
        for hook in self.registry.hooks() {
            hook(name, &mut *instance);
        }
    }
}
