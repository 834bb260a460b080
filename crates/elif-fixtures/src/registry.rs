//! Factory registry
//!
//! The registry is the sole owner of its templates. Templates live in an
//! append-only arena and are looked up by name; sub-factories point at their
//! parent through a [`TemplateId`] into that arena, so undefining a parent's
//! name leaves already-declared sub-factories intact. Redefined and undefined
//! templates stay in the arena until [`FactoryRegistry::undefine_all`], which
//! empties it and starts a new generation of ids.
//!
//! A registry is not internally synchronized. Concurrent builds against a
//! registry that is not being redefined are fine; defining while building needs
//! external locking, which is what the default registry in [`dsl`](crate::dsl)
//! provides.

use crate::buildable::{downcast, Buildable, Instance};
use crate::config::FactoryConfig;
use crate::error::FactoryResult;
use crate::record::Record;
use crate::session::{BuildSession, BuildStyle};
use crate::store::PersistenceContext;
use crate::template::{BaseConstructor, FactoryTemplate, TemplateId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Runs on every finished top-level object, receiving the factory name
pub type BuildHook = Arc<dyn Fn(&str, &mut dyn Buildable) + Send + Sync>;

/// Named factory templates and the entry points that build them
#[derive(Default)]
pub struct FactoryRegistry {
    templates: Vec<FactoryTemplate>,
    by_name: HashMap<String, TemplateId>,
    hooks: Vec<BuildHook>,
    config: FactoryConfig,
    generation: u32,
}

impl FactoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with custom configuration
    pub fn with_config(config: FactoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create a registry and run `definitions` against it
    pub fn with_definitions<F>(definitions: F) -> Self
    where
        F: FnOnce(&mut FactoryRegistry),
    {
        let mut registry = Self::new();
        definitions(&mut registry);
        registry
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: FactoryConfig) {
        self.config = config;
    }

    /// Define a factory, replacing any factory already registered under `name`
    ///
    /// `definition` receives the new template. Sub-factories it declares are
    /// registered right after the template itself.
    pub fn define<F>(&mut self, name: &str, base: BaseConstructor, definition: F) -> TemplateId
    where
        F: FnOnce(&mut FactoryTemplate),
    {
        self.define_template(name.to_string(), Some(base), None, definition)
    }

    fn define_template<F>(
        &mut self,
        name: String,
        base: Option<BaseConstructor>,
        parent: Option<TemplateId>,
        definition: F,
    ) -> TemplateId
    where
        F: FnOnce(&mut FactoryTemplate),
    {
        let mut template = FactoryTemplate::new(name.clone(), base);
        template.set_parent(parent);
        definition(&mut template);

        let subfactories = template.take_subfactories();
        let inherited = template.base().cloned();

        let id = TemplateId {
            index: self.templates.len(),
            generation: self.generation,
        };
        self.templates.push(template);
        if self.by_name.insert(name.clone(), id).is_some() {
            tracing::debug!("Redefined factory '{}'", name);
        } else {
            tracing::debug!("Defined factory '{}'", name);
        }

        for (sub_name, sub_definition) in subfactories {
            self.define_template(sub_name, inherited.clone(), Some(id), sub_definition);
        }

        id
    }

    /// Remove a factory by name; templates that inherit from it keep working
    pub fn undefine(&mut self, name: &str) {
        if self.by_name.remove(name).is_some() {
            tracing::debug!("Undefined factory '{}'", name);
        }
    }

    /// Remove every factory
    ///
    /// Ids returned by earlier calls to [`define`](Self::define) no longer
    /// resolve afterwards.
    pub fn undefine_all(&mut self) {
        tracing::debug!("Undefined {} factories", self.by_name.len());
        self.by_name.clear();
        self.templates.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Look up a template by name
    pub fn template(&self, name: &str) -> Option<&FactoryTemplate> {
        self.by_name
            .get(name)
            .and_then(|id| self.template_by_id(*id))
    }

    /// Look up a template by handle, including ones no longer registered by name
    pub fn template_by_id(&self, id: TemplateId) -> Option<&FactoryTemplate> {
        if id.generation != self.generation {
            return None;
        }
        self.templates.get(id.index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of factories registered by name
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered factory names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register a hook that runs on every finished top-level object
    pub fn after_build<F>(&mut self, hook: F)
    where
        F: Fn(&str, &mut dyn Buildable) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
    }

    pub(crate) fn hooks(&self) -> &[BuildHook] {
        &self.hooks
    }

    /// Start a session over this registry
    pub fn session(&self, style: BuildStyle) -> BuildSession<'_> {
        BuildSession::new(self, style)
    }

    /// Build a factory in object style
    pub fn try_build(&self, name: &str) -> FactoryResult<Option<Instance>> {
        self.session(BuildStyle::Object).build(name, None)
    }

    /// Build a factory in object style, altering a private copy of it first
    pub fn try_build_with<F>(&self, name: &str, overrides: F) -> FactoryResult<Option<Instance>>
    where
        F: Fn(&mut FactoryTemplate),
    {
        self.session(BuildStyle::Object)
            .build(name, Some(&overrides))
    }

    /// Build a factory in record style
    pub fn try_build_record(&self, name: &str) -> FactoryResult<Option<Record>> {
        let built = self.session(BuildStyle::Record).build(name, None)?;
        Ok(built.and_then(downcast::<Record>))
    }

    /// Build a factory in record style, altering a private copy of it first
    pub fn try_build_record_with<F>(&self, name: &str, overrides: F) -> FactoryResult<Option<Record>>
    where
        F: Fn(&mut FactoryTemplate),
    {
        let built = self
            .session(BuildStyle::Record)
            .build(name, Some(&overrides))?;
        Ok(built.and_then(downcast::<Record>))
    }

    /// Build a factory into a persistence context
    pub fn try_insert(
        &self,
        name: &str,
        context: &mut dyn PersistenceContext,
    ) -> FactoryResult<Option<Instance>> {
        BuildSession::with_context(self, context).build(name, None)
    }

    /// Build a factory into a persistence context, altering a private copy of it first
    pub fn try_insert_with<F>(
        &self,
        name: &str,
        context: &mut dyn PersistenceContext,
        overrides: F,
    ) -> FactoryResult<Option<Instance>>
    where
        F: Fn(&mut FactoryTemplate),
    {
        BuildSession::with_context(self, context).build(name, Some(&overrides))
    }

    /// Build a factory in object style
    ///
    /// Returns `None` when the factory is not defined.
    ///
    /// # Panics
    /// Panics when the factory cannot build objects or a property assignment fails.
    pub fn build(&self, name: &str) -> Option<Instance> {
        expect_built(name, self.try_build(name))
    }

    /// Build a factory with a one-off override
    ///
    /// # Panics
    /// Panics when the factory cannot build objects or a property assignment fails.
    pub fn build_with<F>(&self, name: &str, overrides: F) -> Option<Instance>
    where
        F: Fn(&mut FactoryTemplate),
    {
        expect_built(name, self.try_build_with(name, overrides))
    }

    /// Build a factory and downcast the result
    ///
    /// # Panics
    /// Panics when the build fails or the factory builds a different type.
    pub fn build_as<T: Buildable>(&self, name: &str) -> Option<T> {
        self.build(name).map(|instance| expect_type(name, instance))
    }

    /// Build a factory with a one-off override and downcast the result
    ///
    /// # Panics
    /// Panics when the build fails or the factory builds a different type.
    pub fn build_as_with<T, F>(&self, name: &str, overrides: F) -> Option<T>
    where
        T: Buildable,
        F: Fn(&mut FactoryTemplate),
    {
        self.build_with(name, overrides)
            .map(|instance| expect_type(name, instance))
    }

    /// Build a factory as a [`Record`]
    ///
    /// # Panics
    /// Panics when a property assignment fails.
    pub fn build_record(&self, name: &str) -> Option<Record> {
        expect_built(name, self.try_build_record(name))
    }

    /// Build a factory as a [`Record`] with a one-off override
    ///
    /// # Panics
    /// Panics when a property assignment fails.
    pub fn build_record_with<F>(&self, name: &str, overrides: F) -> Option<Record>
    where
        F: Fn(&mut FactoryTemplate),
    {
        expect_built(name, self.try_build_record_with(name, overrides))
    }

    /// Build a factory `count` times, each build independent of the others
    ///
    /// # Panics
    /// Panics when the factory cannot build objects or a property assignment fails.
    pub fn build_many(&self, name: &str, count: usize) -> Vec<Instance> {
        (0..count).filter_map(|_| self.build(name)).collect()
    }

    /// Build a factory into a persistence context
    ///
    /// # Panics
    /// Panics when the factory has no entity name or a property assignment fails.
    pub fn insert(&self, name: &str, context: &mut dyn PersistenceContext) -> Option<Instance> {
        expect_built(name, self.try_insert(name, context))
    }

    /// Build a factory into a persistence context with a one-off override
    ///
    /// # Panics
    /// Panics when the factory has no entity name or a property assignment fails.
    pub fn insert_with<F>(
        &self,
        name: &str,
        context: &mut dyn PersistenceContext,
        overrides: F,
    ) -> Option<Instance>
    where
        F: Fn(&mut FactoryTemplate),
    {
        expect_built(name, self.try_insert_with(name, context, overrides))
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("factories", &self.names())
            .field("hooks", &self.hooks.len())
            .field("config", &self.config)
            .finish()
    }
}

fn expect_built<T>(name: &str, result: FactoryResult<Option<T>>) -> Option<T> {
    match result {
        Ok(built) => built,
        Err(err) => panic!("Failed to build factory '{}': {}", name, err),
    }
}

fn expect_type<T: Buildable>(name: &str, instance: Instance) -> T {
    let found = instance.type_name();
    match downcast::<T>(instance) {
        Some(built) => built,
        None => panic!(
            "Factory '{}' built {}, not {}",
            name,
            found,
            std::any::type_name::<T>()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn records() -> BaseConstructor {
        BaseConstructor::object::<Record>()
    }

    #[test]
    fn test_registry_creation() {
        let registry = FactoryRegistry::new();

        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.config(), &FactoryConfig::default());
    }

    #[test]
    fn test_with_definitions() {
        let registry = FactoryRegistry::with_definitions(|registry| {
            registry.define("Feed", records(), |feed| {
                feed.set("title", "My Title");
            });
            registry.define("FeedItem", records(), |_| {});
        });

        assert_eq!(registry.names(), vec!["Feed", "FeedItem"]);
        assert!(registry.contains("Feed"));
    }

    #[test]
    fn test_redefine_replaces_without_merging() {
        let mut registry = FactoryRegistry::new();
        registry.define("Feed", records(), |feed| {
            feed.set("title", "Old").set("subtitle", "Old");
        });
        registry.define("Feed", records(), |feed| {
            feed.set("title", "New");
        });

        let feed = registry.build_record("Feed").unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(feed.get("title"), Some(&json!("New")));
        assert!(!feed.contains("subtitle"));
    }

    #[test]
    fn test_undefine() {
        let mut registry = FactoryRegistry::new();
        registry.define("Feed", records(), |_| {});
        registry.define("FeedItem", records(), |_| {});

        registry.undefine("Feed");
        registry.undefine("Feed");
        assert!(registry.build("Feed").is_none());
        assert!(registry.contains("FeedItem"));

        registry.undefine_all();
        assert!(registry.is_empty());
        assert!(registry.build("FeedItem").is_none());
    }

    #[test]
    fn test_subfactory_registration() {
        let mut registry = FactoryRegistry::new();
        let parent = registry.define("FeedItem", records(), |item| {
            item.set("text", "My feed item text");
            item.define("DeletedFeedItem", |deleted| {
                deleted.set("deleted", true);
            });
        });

        let child = registry.template("DeletedFeedItem").unwrap();
        assert_eq!(child.parent(), Some(parent));
        assert!(child.is_buildable(BuildStyle::Object));
        assert!(child.definition("text").is_none());
    }

    #[test]
    fn test_ids_do_not_outlive_undefine_all() {
        let mut registry = FactoryRegistry::new();
        let feed = registry.define("Feed", records(), |_| {});
        assert_eq!(registry.template_by_id(feed).unwrap().name(), "Feed");

        registry.undefine_all();
        let item = registry.define("FeedItem", records(), |_| {});

        assert!(registry.template_by_id(feed).is_none());
        assert_eq!(registry.template_by_id(item).unwrap().name(), "FeedItem");
        assert_ne!(feed, item);
    }

    #[test]
    fn test_subfactory_survives_parent_undefine() {
        let mut registry = FactoryRegistry::new();
        registry.define("FeedItem", records(), |item| {
            item.set("text", "My feed item text");
            item.define("DeletedFeedItem", |deleted| {
                deleted.set("deleted", true);
            });
        });
        registry.undefine("FeedItem");

        let deleted = registry.build_record("DeletedFeedItem").unwrap();

        assert_eq!(deleted.get("text"), Some(&json!("My feed item text")));
        assert_eq!(deleted.get("deleted"), Some(&json!(true)));
    }

    #[test]
    fn test_after_build_hooks_run_on_top_level_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut registry = FactoryRegistry::new();
        registry.define("FeedItem", records(), |_| {});
        registry.define("Feed", records(), |feed| {
            feed.set_collection("items", "FeedItem", 4);
        });
        registry.after_build(move |name, object| {
            assert_eq!(name, "Feed");
            object
                .set_property("cleaned", json!(true).into())
                .unwrap();
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let feed = registry.build_as::<Record>("Feed").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.get("cleaned"), Some(&json!(true)));
    }

    #[test]
    fn test_build_many_builds_independently() {
        let mut registry = FactoryRegistry::new();
        registry.define("User", records(), |user| {
            user.set_sequence("email", |n| json!(format!("user{}@example.com", n)));
        });

        let users: Vec<Record> = registry
            .build_many("User", 3)
            .into_iter()
            .filter_map(downcast::<Record>)
            .collect();

        assert_eq!(users.len(), 3);
        assert_eq!(users[0].get("email"), Some(&json!("user0@example.com")));
        assert_eq!(users[2].get("email"), Some(&json!("user2@example.com")));
    }

    #[test]
    #[should_panic(expected = "Factory 'Feed' built Record")]
    fn test_build_as_wrong_type_panics() {
        #[derive(Debug, Default)]
        struct Feed;
        crate::impl_buildable!(Feed {});

        let mut registry = FactoryRegistry::new();
        registry.define("Feed", records(), |_| {});

        registry.build_as::<Feed>("Feed");
    }

    #[test]
    fn test_build_record_with_override() {
        let mut registry = FactoryRegistry::new();
        registry.define("Feed", records(), |feed| {
            feed.set("title", "My Title").set("userID", 23);
        });

        let custom = registry
            .build_record_with("Feed", |feed| {
                feed.set("title", "Custom");
                feed.unset("userID");
            })
            .unwrap();
        let plain = registry.build_record("Feed").unwrap();

        assert_eq!(custom.get("title"), Some(&json!("Custom")));
        assert!(!custom.contains("userID"));
        assert_eq!(plain.get("userID"), Some(&json!(23)));
    }

    #[test]
    fn test_registry_debug_lists_names() {
        let mut registry = FactoryRegistry::new();
        registry.define("Feed", records(), |_| {});

        assert!(format!("{:?}", registry).contains("\"Feed\""));
    }
}
