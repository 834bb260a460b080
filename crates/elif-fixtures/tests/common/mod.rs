//! Shared fixture models for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use elif_fixtures::{impl_buildable, MemoryStore};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeedItem {
    pub item_id: Option<u64>,
    pub user_id: Option<u64>,
    pub text: Option<String>,
    pub comments_count: u32,
    pub likes_count: u32,
    pub url: Option<String>,
    pub deleted: bool,
    pub ordinal: u32,
}

impl_buildable!(FeedItem {
    item_id: data,
    user_id: data,
    text: data,
    comments_count: data,
    likes_count: data,
    url: data,
    deleted: data,
    ordinal: data,
});

#[derive(Debug, Default)]
pub struct Feed {
    pub title: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: Option<u64>,
    pub items: Option<Vec<FeedItem>>,
    pub first_item: Option<FeedItem>,
    pub last_item: Option<FeedItem>,
}

impl_buildable!(Feed {
    title: data,
    timestamp: data,
    user_id: data,
    items: optional_collection,
    first_item: optional_object,
    last_item: optional_object,
});

/// Store with the `User`, `Post` and `Comment` entity types registered
pub fn store() -> MemoryStore {
    MemoryStore::new()
        .with_entity("User", &["email", "name", "serverID", "posts"])
        .with_entity("Post", &["title", "text", "timestamp", "author", "comments"])
        .with_entity("Comment", &["text", "timestamp"])
}

/// Route library logs to the test output, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
