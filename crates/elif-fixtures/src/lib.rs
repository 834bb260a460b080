//! # elif-fixtures - Declarative Test Fixture Factories
//!
//! Register named factory templates describing how to construct and populate an
//! object graph, then build instances with optional one-off overrides.
//!
//! ## Features
//!
//! - **Templates**: literal, lazy and sequence values, nested factories and
//!   N-item factory collections
//! - **Sub-factories**: templates declared inside another template inherit every
//!   value they do not replace
//! - **Instance overrides**: alter a private copy of a template for one build,
//!   leaving the registered template untouched
//! - **Build styles**: plain structs, JSON-like records, or entities inserted
//!   into a persistence context
//!
//! ## Quick Start
//!
//! ```rust
//! use elif_fixtures::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct FeedItem {
//!     text: String,
//! }
//!
//! #[derive(Debug, Default)]
//! struct Feed {
//!     title: String,
//!     items: Vec<FeedItem>,
//! }
//!
//! impl_buildable!(FeedItem { text: data });
//! impl_buildable!(Feed { title: data, items: collection });
//!
//! let mut registry = FactoryRegistry::new();
//! registry.define("FeedItem", BaseConstructor::object::<FeedItem>(), |item| {
//!     item.set("text", "My item text");
//! });
//! registry.define("Feed", BaseConstructor::object::<Feed>(), |feed| {
//!     feed.set("title", "My Title")
//!         .set_collection("items", "FeedItem", 10);
//! });
//!
//! let feed: Feed = registry.build_as("Feed").unwrap();
//! assert_eq!(feed.items.len(), 10);
//!
//! let custom: Feed = registry
//!     .build_as_with("Feed", |feed| {
//!         feed.set("title", "Custom");
//!     })
//!     .unwrap();
//! assert_eq!(custom.title, "Custom");
//! ```

pub mod buildable;
pub mod config;
pub mod dsl;
pub mod error;
pub mod fake;
pub mod record;
pub mod registry;
pub mod session;
pub mod store;
pub mod template;
pub mod value;

// Re-export commonly used types
pub use buildable::{downcast, downcast_ref, Buildable, FixtureValue, Instance};
pub use config::FactoryConfig;
pub use error::{FactoryError, FactoryResult};
pub use record::Record;
pub use registry::{BuildHook, FactoryRegistry};
pub use session::{BuildSession, BuildStyle};
pub use store::{Entity, MemoryStore, PersistenceContext};
pub use template::{BaseConstructor, FactoryTemplate, ObjectBuilder, TemplateId};
pub use value::{IndexedOverride, LiteralFn, TemplateOverride, ValueDefinition};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        dsl::{factory, factory_with, lazy, sequence, OfFactory},
        fake, impl_buildable, BaseConstructor, Buildable, Entity, FactoryConfig, FactoryError,
        FactoryRegistry, FactoryResult, FactoryTemplate, FixtureValue, Instance, MemoryStore,
        PersistenceContext, Record, ValueDefinition,
    };

    // Re-export commonly used external types
    pub use serde_json::{json, Value as JsonValue};
}
