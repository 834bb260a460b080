//! Fixture DSL
//!
//! Sugar over [`FactoryRegistry`] and [`FactoryTemplate`] for test code:
//!
//! ```rust
//! use elif_fixtures::prelude::*;
//!
//! let mut registry = FactoryRegistry::new();
//! registry.define("FeedItem", BaseConstructor::object::<Record>(), |item| {
//!     item.assign("text", "My item text");
//! });
//! registry.define("Feed", BaseConstructor::object::<Record>(), |feed| {
//!     feed.assign("title", "My Title")
//!         .assign("firstItem", factory("FeedItem"))
//!         .assign("items", 10.of_factory("FeedItem"));
//! });
//!
//! let feed = registry.build_record("Feed").unwrap();
//! assert_eq!(feed.get("items").unwrap().as_array().unwrap().len(), 10);
//! ```
//!
//! The free functions at the bottom of this module operate on a process-wide
//! default registry guarded by a lock. Definition closures run while that lock
//! is held for writing and override closures while it is held for reading, so
//! they must not call back into the default registry.

use crate::buildable::{Buildable, Instance};
use crate::config::FactoryConfig;
use crate::record::Record;
use crate::registry::FactoryRegistry;
use crate::store::PersistenceContext;
use crate::template::{BaseConstructor, FactoryTemplate};
use crate::value::ValueDefinition;
use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

macro_rules! literal_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ValueDefinition {
                fn from(value: $ty) -> Self {
                    ValueDefinition::value(JsonValue::from(value))
                }
            }
        )*
    };
}

literal_from!(&str, String, bool, i32, i64, u32, u64, usize, f64, JsonValue);

/// A nested build of another factory
pub fn factory(name: &str) -> ValueDefinition {
    ValueDefinition::factory(name)
}

/// A nested build of another factory, altered for this property only
pub fn factory_with<F>(name: &str, overrides: F) -> ValueDefinition
where
    F: Fn(&mut FactoryTemplate) + Send + Sync + 'static,
{
    ValueDefinition::factory_with(name, overrides)
}

/// A literal evaluated at build time rather than at definition time
pub fn lazy<F>(producer: F) -> ValueDefinition
where
    F: Fn() -> JsonValue + Send + Sync + 'static,
{
    ValueDefinition::lazy(producer)
}

/// A literal computed from a counter that advances on every build
pub fn sequence<F>(producer: F) -> ValueDefinition
where
    F: Fn(usize) -> JsonValue + Send + Sync + 'static,
{
    ValueDefinition::sequence(producer)
}

/// `count.of_factory(name)` builds a collection of `count` objects
///
/// Implemented for `usize`, `u32` and `i32` so plain integer literals work.
/// A negative count builds an empty collection.
pub trait OfFactory {
    fn of_factory(self, name: &str) -> ValueDefinition;

    /// Each item is built from a copy of the factory altered with its index
    fn of_factory_with<F>(self, name: &str, overrides: F) -> ValueDefinition
    where
        F: Fn(usize, &mut FactoryTemplate) + Send + Sync + 'static;
}

macro_rules! of_factory_for {
    ($($ty:ty),* $(,)?) => {
        $(
            impl OfFactory for $ty {
                fn of_factory(self, name: &str) -> ValueDefinition {
                    ValueDefinition::collection(name, usize::try_from(self).unwrap_or(0))
                }

                fn of_factory_with<F>(self, name: &str, overrides: F) -> ValueDefinition
                where
                    F: Fn(usize, &mut FactoryTemplate) + Send + Sync + 'static,
                {
                    ValueDefinition::collection_with(
                        name,
                        usize::try_from(self).unwrap_or(0),
                        overrides,
                    )
                }
            }
        )*
    };
}

of_factory_for!(usize, u32, i32);

/// Base objects built with `T::default()`
pub fn object<T: Buildable + Default>() -> BaseConstructor {
    BaseConstructor::object::<T>()
}

/// Base objects inserted as entities of the named type
pub fn entity(entity_name: &str) -> BaseConstructor {
    BaseConstructor::entity(entity_name)
}

static DEFAULT_REGISTRY: Lazy<RwLock<FactoryRegistry>> =
    Lazy::new(|| RwLock::new(default_registry()));

/// The default registry reads `ELIF_FIXTURES_MAX_DEPTH` and
/// `ELIF_FIXTURES_STRICT_REFERENCES` once, on first use
fn default_registry() -> FactoryRegistry {
    FactoryRegistry::with_config(FactoryConfig::from_env_or_default())
}

/// Read access to the default registry
pub fn registry() -> RwLockReadGuard<'static, FactoryRegistry> {
    DEFAULT_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Write access to the default registry
pub fn registry_mut() -> RwLockWriteGuard<'static, FactoryRegistry> {
    DEFAULT_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Define a factory in the default registry
pub fn define<F>(name: &str, base: BaseConstructor, definition: F)
where
    F: FnOnce(&mut FactoryTemplate),
{
    registry_mut().define(name, base, definition);
}

pub fn undefine(name: &str) {
    registry_mut().undefine(name);
}

pub fn undefine_all() {
    registry_mut().undefine_all();
}

/// Build a factory from the default registry
pub fn build(name: &str) -> Option<Instance> {
    registry().build(name)
}

/// Build a factory from the default registry with a one-off override
pub fn build_with<F>(name: &str, overrides: F) -> Option<Instance>
where
    F: Fn(&mut FactoryTemplate),
{
    registry().build_with(name, overrides)
}

/// Build a factory from the default registry and downcast it
pub fn build_as<T: Buildable>(name: &str) -> Option<T> {
    registry().build_as(name)
}

pub fn build_as_with<T, F>(name: &str, overrides: F) -> Option<T>
where
    T: Buildable,
    F: Fn(&mut FactoryTemplate),
{
    registry().build_as_with(name, overrides)
}

/// Build a factory from the default registry as a [`Record`]
pub fn build_record(name: &str) -> Option<Record> {
    registry().build_record(name)
}

pub fn build_record_with<F>(name: &str, overrides: F) -> Option<Record>
where
    F: Fn(&mut FactoryTemplate),
{
    registry().build_record_with(name, overrides)
}

/// Build a factory from the default registry into a persistence context
pub fn insert(name: &str, context: &mut dyn PersistenceContext) -> Option<Instance> {
    registry().insert(name, context)
}

pub fn insert_with<F>(name: &str, context: &mut dyn PersistenceContext, overrides: F) -> Option<Instance>
where
    F: Fn(&mut FactoryTemplate),
{
    registry().insert_with(name, context, overrides)
}
