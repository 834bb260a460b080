//! Property assignment capability
//!
//! Anything a factory builds implements [`Buildable`]: the session hands it one
//! property name and one [`FixtureValue`] at a time. Plain structs get an
//! implementation from [`impl_buildable!`](crate::impl_buildable), records and
//! persisted entities implement it by hand.

use crate::error::{FactoryError, FactoryResult};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::fmt;

/// A built object, owned by whoever requested the build
pub type Instance = Box<dyn Buildable>;

/// Type-erasure helpers used to recover a concrete type from an [`Instance`]
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An object whose properties can be assigned by name
pub trait Buildable: AsAny + fmt::Debug {
    /// Assign `value` to `property`.
    ///
    /// Unknown property names are reported as [`FactoryError::UnknownProperty`].
    fn set_property(&mut self, property: &str, value: FixtureValue) -> FactoryResult<()>;

    /// Name used in error messages
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A value produced by a value definition at build time
#[derive(Debug)]
pub enum FixtureValue {
    /// Literal data
    Data(JsonValue),
    /// A single object built from another factory
    Object(Instance),
    /// An ordered collection of objects built from another factory
    Collection(Vec<Instance>),
}

impl FixtureValue {
    /// Short description used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            FixtureValue::Data(_) => "data",
            FixtureValue::Object(_) => "object",
            FixtureValue::Collection(_) => "collection",
        }
    }

    /// Get the literal data, if this is a literal
    pub fn as_data(&self) -> Option<&JsonValue> {
        match self {
            FixtureValue::Data(value) => Some(value),
            _ => None,
        }
    }
}

impl From<JsonValue> for FixtureValue {
    fn from(value: JsonValue) -> Self {
        FixtureValue::Data(value)
    }
}

/// Recover the concrete type of a built instance
pub fn downcast<T: Buildable>(instance: Instance) -> Option<T> {
    AsAny::into_any(instance).downcast::<T>().ok().map(|boxed| *boxed)
}

/// Borrow the concrete type of a built instance
pub fn downcast_ref<T: Buildable>(instance: &dyn Buildable) -> Option<&T> {
    instance.as_any().downcast_ref::<T>()
}

/// Conversions from [`FixtureValue`] into struct fields, used by `impl_buildable!`
pub mod convert {
    use super::*;

    /// Deserialize literal data into the field type
    pub fn data<T: DeserializeOwned>(property: &str, value: FixtureValue) -> FactoryResult<T> {
        match value {
            FixtureValue::Data(json) => serde_json::from_value(json)
                .map_err(|e| FactoryError::invalid_value(property, e.to_string())),
            other => Err(FactoryError::invalid_value(
                property,
                format!("expected data, got {}", other.kind()),
            )),
        }
    }

    /// Take a nested built object of the field type
    pub fn object<T: Buildable>(property: &str, value: FixtureValue) -> FactoryResult<T> {
        match value {
            FixtureValue::Object(instance) => downcast_instance(property, instance),
            other => Err(FactoryError::invalid_value(
                property,
                format!("expected object, got {}", other.kind()),
            )),
        }
    }

    pub fn optional_object<T: Buildable>(
        property: &str,
        value: FixtureValue,
    ) -> FactoryResult<Option<T>> {
        match value {
            FixtureValue::Data(JsonValue::Null) => Ok(None),
            value => object(property, value).map(Some),
        }
    }

    /// Take a nested collection whose items are all of the field's item type
    pub fn collection<T: Buildable>(property: &str, value: FixtureValue) -> FactoryResult<Vec<T>> {
        match value {
            FixtureValue::Collection(items) => items
                .into_iter()
                .map(|item| downcast_instance(property, item))
                .collect(),
            other => Err(FactoryError::invalid_value(
                property,
                format!("expected collection, got {}", other.kind()),
            )),
        }
    }

    pub fn optional_collection<T: Buildable>(
        property: &str,
        value: FixtureValue,
    ) -> FactoryResult<Option<Vec<T>>> {
        match value {
            FixtureValue::Data(JsonValue::Null) => Ok(None),
            value => collection(property, value).map(Some),
        }
    }

    fn downcast_instance<T: Buildable>(property: &str, instance: Instance) -> FactoryResult<T> {
        let found = instance.type_name();
        downcast::<T>(instance).ok_or_else(|| {
            FactoryError::invalid_value(
                property,
                format!(
                    "expected {}, got {}",
                    std::any::type_name::<T>(),
                    found
                ),
            )
        })
    }
}

/// Implement [`Buildable`] for a plain struct
///
/// Each listed field is assignable under its own name. The kind after the colon
/// picks the conversion: `data` deserializes a literal, `object` and
/// `optional_object` take a nested built instance, `collection` and
/// `optional_collection` take the items of a nested collection.
///
/// ```rust
/// use elif_fixtures::impl_buildable;
///
/// #[derive(Debug, Default)]
/// struct Comment {
///     body: String,
///     likes: u32,
/// }
///
/// impl_buildable!(Comment { body: data, likes: data });
/// ```
#[macro_export]
macro_rules! impl_buildable {
    ($ty:ident { $($field:ident : $kind:ident),* $(,)? }) => {
        impl $crate::Buildable for $ty {
            fn set_property(
                &mut self,
                property: &str,
                value: $crate::FixtureValue,
            ) -> $crate::FactoryResult<()> {
                $(
                    if property == stringify!($field) {
                        self.$field = $crate::buildable::convert::$kind(property, value)?;
                        return Ok(());
                    }
                )*
                let _ = value;
                Err($crate::FactoryError::unknown_property(property, stringify!($ty)))
            }

            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }
        }
    };
}
