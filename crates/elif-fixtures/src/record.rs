//! Dictionary construction backend

use crate::buildable::{downcast, Buildable, FixtureValue, Instance};
use crate::error::{FactoryError, FactoryResult};
use serde_json::{Map, Value as JsonValue};

/// A key/value container built in record style
///
/// Keys are kept in sorted order. Nested records become JSON objects and nested
/// collections become JSON arrays, so a finished record converts losslessly
/// into a single [`JsonValue`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, JsonValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    /// Check whether a field was assigned
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over field names in order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Convert into a JSON object
    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }

    fn nested_json(property: &str, instance: Instance) -> FactoryResult<JsonValue> {
        let found = instance.type_name();
        downcast::<Record>(instance)
            .map(Record::into_json)
            .ok_or_else(|| {
                FactoryError::invalid_value(
                    property,
                    format!("records can only nest records, got {}", found),
                )
            })
    }
}

impl Buildable for Record {
    fn set_property(&mut self, property: &str, value: FixtureValue) -> FactoryResult<()> {
        let json = match value {
            FixtureValue::Data(json) => json,
            FixtureValue::Object(instance) => Self::nested_json(property, instance)?,
            FixtureValue::Collection(items) => JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| Self::nested_json(property, item))
                    .collect::<FactoryResult<Vec<_>>>()?,
            ),
        };
        self.fields.insert(property.to_string(), json);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "Record"
    }
}

impl From<Record> for JsonValue {
    fn from(record: Record) -> Self {
        record.into_json()
    }
}
