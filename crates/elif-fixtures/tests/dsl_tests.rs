//! Tests for the DSL and the process-wide default registry

mod common;

use common::{Feed, FeedItem};
use elif_fixtures::dsl::{self, entity, object};
use elif_fixtures::prelude::*;
use serial_test::serial;

fn define_feeds() {
    dsl::undefine_all();

    dsl::define("Feed", object::<Feed>(), |feed| {
        feed.assign("title", "My Title")
            .assign("first_item", factory("FeedItem"))
            .assign(
                "last_item",
                factory_with("FeedItem", |item| {
                    item.assign("text", "My last item");
                }),
            )
            .assign(
                "items",
                10.of_factory_with("FeedItem", |index, item| {
                    item.assign("item_id", index);
                }),
            );

        feed.define("Other Feed", |other| {
            other.assign("title", "My Other Title");
        });
    });

    dsl::define("FeedItem", object::<FeedItem>(), |item| {
        item.assign("text", "My item text");
    });
}

#[test]
#[serial]
fn test_dsl() {
    common::init_tracing();
    define_feeds();

    let feed: Feed = dsl::build_as("Feed").unwrap();

    assert_eq!(feed.title.as_deref(), Some("My Title"));
    assert_eq!(
        feed.first_item.unwrap().text.as_deref(),
        Some("My item text")
    );
    assert_eq!(feed.last_item.unwrap().text.as_deref(), Some("My last item"));

    let items = feed.items.unwrap();
    assert_eq!(items.len(), 10);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.item_id, Some(i as u64));
        assert_eq!(item.text.as_deref(), Some("My item text"));
    }

    let other: Feed = dsl::build_as("Other Feed").unwrap();
    assert_eq!(other.title.as_deref(), Some("My Other Title"));
    assert_eq!(other.items.unwrap().len(), 10);
}

#[test]
#[serial]
fn test_subfactory_keeps_working_after_parent_is_undefined() {
    define_feeds();
    dsl::undefine("Feed");

    assert!(dsl::build("Feed").is_none());

    let other: Feed = dsl::build_as("Other Feed").unwrap();
    assert_eq!(other.title.as_deref(), Some("My Other Title"));
    assert_eq!(
        other.first_item.unwrap().text.as_deref(),
        Some("My item text")
    );
}

#[test]
#[serial]
fn test_build_with_override_on_default_registry() {
    define_feeds();

    let custom: Feed = dsl::build_as_with("Feed", |feed| {
        feed.assign("title", "Custom")
            .assign("items", 2.of_factory("FeedItem"));
    })
    .unwrap();
    let plain: Feed = dsl::build_as("Feed").unwrap();

    assert_eq!(custom.title.as_deref(), Some("Custom"));
    assert_eq!(custom.items.unwrap().len(), 2);
    assert_eq!(plain.title.as_deref(), Some("My Title"));
    assert_eq!(plain.items.unwrap().len(), 10);
}

#[test]
#[serial]
fn test_lazy_and_sequence_values() {
    dsl::undefine_all();
    dsl::define("FeedItem", object::<FeedItem>(), |item| {
        item.assign("ordinal", sequence(|n| json!(n + 1)))
            .assign(
                "url",
                lazy(|| json!(format!("https://feeds.example.com/{}", fake::random_slug("feed")))),
            );
    });

    let first: FeedItem = dsl::build_as("FeedItem").unwrap();
    let second: FeedItem = dsl::build_as("FeedItem").unwrap();

    assert_eq!(first.ordinal, 1);
    assert_eq!(second.ordinal, 2);
    assert_ne!(first.url, second.url);
}

#[test]
#[serial]
fn test_undefine_all_empties_default_registry() {
    define_feeds();
    assert!(dsl::registry().contains("Other Feed"));

    dsl::undefine_all();

    assert!(dsl::registry().is_empty());
    assert!(dsl::build("Feed").is_none());
    assert!(dsl::build_record("FeedItem").is_none());
}

#[test]
#[serial]
fn test_insert_through_default_registry() {
    dsl::undefine_all();
    dsl::define("User", entity("User"), |user| {
        user.assign("email", "kevin@example.com")
            .assign("name", "Kevin");
    });

    let store = common::store();
    let mut context = store.clone();
    let user = dsl::insert("User", &mut context).unwrap();
    let user = elif_fixtures::downcast_ref::<Entity>(&*user).unwrap();

    assert_eq!(user.entity_name(), "User");
    assert_eq!(user.get("name"), Some(json!("Kevin")));
    assert_eq!(store.count("User"), 1);
}

#[test]
#[serial]
#[should_panic(expected = "cannot build in object style")]
fn test_build_entity_factory_as_object_panics() {
    dsl::undefine_all();
    dsl::define("User", entity("User"), |_| {});

    dsl::build("User");
}
