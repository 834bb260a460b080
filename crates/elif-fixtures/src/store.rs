//! Persistence construction backend
//!
//! Factories built in entity style insert a fresh entity into a
//! [`PersistenceContext`] and assign properties onto it. The context is
//! threaded unchanged through every nested build, so an object graph lands in
//! one context. Saving or discarding inserted entities is up to the caller.

use crate::buildable::{downcast, Buildable, FixtureValue, Instance};
use crate::error::{FactoryError, FactoryResult};
use serde_json::{Map, Value as JsonValue};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// A unit of work that entities are inserted into
pub trait PersistenceContext {
    /// Insert a new, empty entity of the named type
    fn insert_entity(&mut self, entity_name: &str) -> FactoryResult<Instance>;
}

#[derive(Debug, Default)]
struct StoreState {
    schemas: HashMap<String, BTreeSet<String>>,
    objects: Vec<StoredObject>,
    saved: usize,
}

impl StoreState {
    fn object(&self, id: Uuid) -> Option<&StoredObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    fn object_mut(&mut self, id: Uuid) -> Option<&mut StoredObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    id: Uuid,
    entity: String,
    attributes: Map<String, JsonValue>,
}

/// In-memory persistence context
///
/// Entity types must be registered with their attribute names before anything
/// can be inserted. References between entities are stored as entity ids.
/// Clones share the same underlying storage. Not thread-safe.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type and the attributes it accepts
    pub fn with_entity(self, entity_name: &str, attributes: &[&str]) -> Self {
        self.register_entity(entity_name, attributes);
        self
    }

    /// Register an entity type, replacing any previous registration
    pub fn register_entity(&self, entity_name: &str, attributes: &[&str]) {
        let attributes = attributes.iter().map(|a| a.to_string()).collect();
        self.state
            .borrow_mut()
            .schemas
            .insert(entity_name.to_string(), attributes);
    }

    /// Number of live entities of a type
    pub fn count(&self, entity_name: &str) -> usize {
        self.state
            .borrow()
            .objects
            .iter()
            .filter(|object| object.entity == entity_name)
            .count()
    }

    /// All live entities of a type, in insertion order
    pub fn entities(&self, entity_name: &str) -> Vec<Entity> {
        self.state
            .borrow()
            .objects
            .iter()
            .filter(|object| object.entity == entity_name)
            .map(|object| self.handle(object))
            .collect()
    }

    /// Find a live entity by id
    pub fn find(&self, id: Uuid) -> Option<Entity> {
        self.state.borrow().object(id).map(|object| self.handle(object))
    }

    /// Check for entities inserted since the last save
    pub fn has_changes(&self) -> bool {
        let state = self.state.borrow();
        state.objects.len() > state.saved
    }

    /// Commit pending inserts, returning how many were committed
    pub fn save(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let committed = state.objects.len() - state.saved;
        state.saved = state.objects.len();
        tracing::debug!("Saved {} entities", committed);
        committed
    }

    /// Discard pending inserts, returning how many were discarded
    pub fn rollback(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let saved = state.saved;
        let discarded = state.objects.len() - saved;
        state.objects.truncate(saved);
        tracing::debug!("Rolled back {} entities", discarded);
        discarded
    }

    fn handle(&self, object: &StoredObject) -> Entity {
        Entity {
            id: object.id,
            entity: object.entity.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl PersistenceContext for MemoryStore {
    fn insert_entity(&mut self, entity_name: &str) -> FactoryResult<Instance> {
        let mut state = self.state.borrow_mut();
        if !state.schemas.contains_key(entity_name) {
            return Err(FactoryError::unknown_entity(entity_name));
        }

        let object = StoredObject {
            id: Uuid::new_v4(),
            entity: entity_name.to_string(),
            attributes: Map::new(),
        };
        tracing::trace!("Inserted {} entity {}", entity_name, object.id);

        let entity = Entity {
            id: object.id,
            entity: object.entity.clone(),
            state: Rc::clone(&self.state),
        };
        state.objects.push(object);
        Ok(Box::new(entity))
    }
}

/// Handle to an entity living in a [`MemoryStore`]
#[derive(Clone)]
pub struct Entity {
    id: Uuid,
    entity: String,
    state: Rc<RefCell<StoreState>>,
}

impl Entity {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    /// Read an attribute; references to other entities read as their id
    pub fn get(&self, attribute: &str) -> Option<JsonValue> {
        self.state
            .borrow()
            .object(self.id)
            .and_then(|object| object.attributes.get(attribute).cloned())
    }

    /// Resolve a to-one reference attribute to the referenced entity
    pub fn related(&self, attribute: &str) -> Option<Entity> {
        let id = self.get(attribute)?.as_str()?.parse::<Uuid>().ok()?;
        self.state.borrow().object(id).map(|object| Entity {
            id: object.id,
            entity: object.entity.clone(),
            state: Rc::clone(&self.state),
        })
    }

    /// Snapshot of all assigned attributes
    pub fn attributes(&self) -> Map<String, JsonValue> {
        self.state
            .borrow()
            .object(self.id)
            .map(|object| object.attributes.clone())
            .unwrap_or_default()
    }

    fn reference(property: &str, instance: Instance) -> FactoryResult<JsonValue> {
        let found = instance.type_name();
        downcast::<Entity>(instance)
            .map(|entity| JsonValue::String(entity.id.to_string()))
            .ok_or_else(|| {
                FactoryError::invalid_value(
                    property,
                    format!("entities can only reference entities, got {}", found),
                )
            })
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .finish()
    }
}

impl Buildable for Entity {
    fn set_property(&mut self, property: &str, value: FixtureValue) -> FactoryResult<()> {
        let json = match value {
            FixtureValue::Data(json) => json,
            FixtureValue::Object(instance) => Self::reference(property, instance)?,
            FixtureValue::Collection(items) => JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| Self::reference(property, item))
                    .collect::<FactoryResult<Vec<_>>>()?,
            ),
        };

        let mut state = self.state.borrow_mut();
        let known = state
            .schemas
            .get(&self.entity)
            .is_some_and(|attributes| attributes.contains(property));
        if !known {
            return Err(FactoryError::unknown_property(property, self.entity.as_str()));
        }

        let object = state.object_mut(self.id).ok_or_else(|| {
            FactoryError::invalid_value(property, format!("entity {} was rolled back", self.id))
        })?;
        object.attributes.insert(property.to_string(), json);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "Entity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_entity("User", &["email", "name", "serverID", "posts"])
            .with_entity("Post", &["title", "author"])
    }

    fn insert(store: &mut MemoryStore, entity: &str) -> Entity {
        let instance = store.insert_entity(entity).unwrap();
        downcast::<Entity>(instance).unwrap()
    }

    #[test]
    fn test_insert_and_assign() {
        let mut store = store();
        let mut user = insert(&mut store, "User");

        user.set_property("email", json!("kevin@example.com").into())
            .unwrap();
        user.set_property("serverID", json!(123).into()).unwrap();

        assert_eq!(store.count("User"), 1);
        assert_eq!(user.get("email"), Some(json!("kevin@example.com")));
        assert_eq!(store.find(user.id()).unwrap().get("serverID"), Some(json!(123)));
    }

    #[test]
    fn test_unknown_entity_is_rejected() {
        let mut store = store();
        let err = store.insert_entity("Comment").unwrap_err();

        assert!(matches!(err, FactoryError::UnknownEntity { .. }));
        assert_eq!(store.count("Comment"), 0);
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let mut store = store();
        let mut user = insert(&mut store, "User");

        let err = user
            .set_property("nickname", json!("kev").into())
            .unwrap_err();

        match err {
            FactoryError::UnknownProperty { property, target } => {
                assert_eq!(property, "nickname");
                assert_eq!(target, "User");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_references_are_stored_by_id() {
        let mut store = store();
        let mut user = insert(&mut store, "User");
        let first = store.insert_entity("Post").unwrap();
        let second = store.insert_entity("Post").unwrap();
        let author = store.insert_entity("User").unwrap();

        let mut post = store.entities("Post").remove(0);
        post.set_property("author", FixtureValue::Object(author))
            .unwrap();
        user.set_property("posts", FixtureValue::Collection(vec![first, second]))
            .unwrap();

        assert_eq!(post.related("author").unwrap().entity_name(), "User");
        assert_eq!(user.get("posts").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_save_and_rollback() {
        let mut store = store();
        insert(&mut store, "User");
        assert!(store.has_changes());
        assert_eq!(store.save(), 1);
        assert!(!store.has_changes());

        let pending = insert(&mut store, "User");
        assert_eq!(store.rollback(), 1);
        assert_eq!(store.count("User"), 1);
        assert!(pending.get("email").is_none());
    }
}
