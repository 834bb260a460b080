//! Factory registry configuration

use crate::error::{FactoryError, FactoryResult};
use std::env;

/// Environment variable holding the maximum nested build depth
pub const MAX_DEPTH_ENV: &str = "ELIF_FIXTURES_MAX_DEPTH";

/// Environment variable switching missing nested factories into hard errors
pub const STRICT_REFERENCES_ENV: &str = "ELIF_FIXTURES_STRICT_REFERENCES";

/// Configuration for build behavior
///
/// The default applies no recursion limit and tolerates references to factories
/// that are not registered, leaving the referencing property unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Maximum nesting of factory references in one build, `None` for unbounded
    pub max_depth: Option<usize>,
    /// Fail the build when a nested factory reference is not registered
    pub strict_references: bool,
}

impl FactoryConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> FactoryResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = env::var(MAX_DEPTH_ENV) {
            config.max_depth = Some(parse_depth(&value)?);
        }

        if let Ok(value) = env::var(STRICT_REFERENCES_ENV) {
            config.strict_references = parse_flag(&value)?;
        }

        Ok(config)
    }

    /// Load configuration from environment variables, falling back to the
    /// defaults when a variable holds an unusable value
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!("Ignoring fixture configuration from environment: {}", e);
            Self::default()
        })
    }

    /// Limit the nesting of factory references
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Treat missing nested factories as errors
    pub fn strict(mut self) -> Self {
        self.strict_references = true;
        self
    }
}

fn parse_depth(value: &str) -> FactoryResult<usize> {
    value.trim().parse::<usize>().map_err(|_| {
        FactoryError::configuration(format!(
            "{} must be a non-negative integer, got '{}'",
            MAX_DEPTH_ENV, value
        ))
    })
}

fn parse_flag(value: &str) -> FactoryResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(FactoryError::configuration(format!(
            "{} must be a boolean, got '{}'",
            STRICT_REFERENCES_ENV, value
        ))),
    }
}
