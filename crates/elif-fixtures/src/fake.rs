//! Fake data helpers for lazy literals
//!
//! ```rust
//! use elif_fixtures::{fake, FactoryRegistry, BaseConstructor, Record};
//! use serde_json::json;
//!
//! let mut registry = FactoryRegistry::new();
//! registry.define("User", BaseConstructor::object::<Record>(), |user| {
//!     user.set_lazy("email", || json!(fake::random_email()));
//! });
//! ```

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

const SLUG_LEN: usize = 8;

/// Random alphanumeric text of exactly `len` characters
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Lowercase identifier such as `feed-x3k9q2ab`, unique enough for fixtures
pub fn random_slug(prefix: &str) -> String {
    format!("{}-{}", prefix, random_string(SLUG_LEN).to_lowercase())
}

/// Email address on the reserved `example.com` domain
pub fn random_email() -> String {
    format!("{}@example.com", random_slug("user"))
}

/// Generate a random integer in `min..=max`
pub fn random_number(min: i64, max: i64) -> i64 {
    rand::thread_rng().gen_range(min..=max)
}

pub fn uuid() -> Uuid {
    Uuid::new_v4()
}

/// The current time
pub fn timestamp() -> DateTime<Utc> {
    Utc::now()
}
