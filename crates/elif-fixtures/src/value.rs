//! Value definitions
//!
//! A value definition is the rule a template stores for one property. It is
//! evaluated once per build by the [`BuildSession`](crate::BuildSession).

use crate::error::{FactoryError, FactoryResult};
use crate::template::FactoryTemplate;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Produces a literal value when a build runs
pub type LiteralFn = Arc<dyn Fn() -> FactoryResult<JsonValue> + Send + Sync>;

/// Alters a private clone of a template before it is resolved
pub type TemplateOverride = Arc<dyn Fn(&mut FactoryTemplate) + Send + Sync>;

/// Alters the clone used for one item of a collection, given the item index
pub type IndexedOverride = Arc<dyn Fn(usize, &mut FactoryTemplate) + Send + Sync>;

/// How one property's value is produced
#[derive(Clone)]
pub enum ValueDefinition {
    /// Evaluate a closure at build time
    Literal(LiteralFn),
    /// Build another factory
    Factory {
        name: String,
        overrides: Option<TemplateOverride>,
    },
    /// Build another factory `count` times
    ///
    /// When no factory is registered under `name` the property is left unset
    /// rather than assigned an empty collection, unless
    /// [`FactoryConfig::strict_references`](crate::FactoryConfig) is on.
    Collection {
        name: String,
        count: usize,
        overrides: Option<IndexedOverride>,
    },
}

impl ValueDefinition {
    /// A literal captured now and cloned into every build
    pub fn value(value: JsonValue) -> Self {
        ValueDefinition::Literal(Arc::new(move || Ok(value.clone())))
    }

    /// A literal serialized now
    ///
    /// A value serde cannot represent as JSON is kept as an error that fails
    /// every build using this definition.
    pub fn serialized<V: Serialize>(value: V) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Self::value(json),
            Err(e) => {
                let message = e.to_string();
                ValueDefinition::Literal(Arc::new(move || {
                    Err(FactoryError::Serialization(serde::ser::Error::custom(&message)))
                }))
            }
        }
    }

    /// A literal evaluated anew on every build
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> JsonValue + Send + Sync + 'static,
    {
        ValueDefinition::Literal(Arc::new(move || Ok(producer())))
    }

    /// A literal fed an increasing counter, shared by every build that uses it
    pub fn sequence<F>(producer: F) -> Self
    where
        F: Fn(usize) -> JsonValue + Send + Sync + 'static,
    {
        let counter = AtomicUsize::new(0);
        ValueDefinition::Literal(Arc::new(move || {
            Ok(producer(counter.fetch_add(1, Ordering::SeqCst)))
        }))
    }

    /// A nested build of another factory
    pub fn factory(name: impl Into<String>) -> Self {
        ValueDefinition::Factory {
            name: name.into(),
            overrides: None,
        }
    }

    /// A nested build of another factory, altered for this property only
    pub fn factory_with<F>(name: impl Into<String>, overrides: F) -> Self
    where
        F: Fn(&mut FactoryTemplate) + Send + Sync + 'static,
    {
        ValueDefinition::Factory {
            name: name.into(),
            overrides: Some(Arc::new(overrides)),
        }
    }

    /// A collection of `count` nested builds
    pub fn collection(name: impl Into<String>, count: usize) -> Self {
        ValueDefinition::Collection {
            name: name.into(),
            count,
            overrides: None,
        }
    }

    /// A collection of `count` nested builds, each altered by its index
    pub fn collection_with<F>(name: impl Into<String>, count: usize, overrides: F) -> Self
    where
        F: Fn(usize, &mut FactoryTemplate) + Send + Sync + 'static,
    {
        ValueDefinition::Collection {
            name: name.into(),
            count,
            overrides: Some(Arc::new(overrides)),
        }
    }

    /// Name of the referenced factory, if any
    pub fn factory_name(&self) -> Option<&str> {
        match self {
            ValueDefinition::Literal(_) => None,
            ValueDefinition::Factory { name, .. } | ValueDefinition::Collection { name, .. } => {
                Some(name.as_str())
            }
        }
    }
}

impl fmt::Debug for ValueDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDefinition::Literal(_) => f.write_str("Literal(..)"),
            ValueDefinition::Factory { name, overrides } => f
                .debug_struct("Factory")
                .field("name", name)
                .field("overridden", &overrides.is_some())
                .finish(),
            ValueDefinition::Collection {
                name,
                count,
                overrides,
            } => f
                .debug_struct("Collection")
                .field("name", name)
                .field("count", count)
                .field("overridden", &overrides.is_some())
                .finish(),
        }
    }
}
