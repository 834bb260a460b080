use crate::session::BuildStyle;
use thiserror::Error;

/// Error type for factory definition and build failures
///
/// Every variant except `Serialization` and `Configuration` describes a mistake in
/// the fixture definitions themselves. The panicking entry points on
/// [`FactoryRegistry`](crate::FactoryRegistry) turn these into test failures.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Factory '{factory}' cannot build in {style} style: set an object builder or entity name first")]
    Unbuildable { factory: String, style: BuildStyle },

    #[error("Unknown property '{property}' on {target}")]
    UnknownProperty { property: String, target: String },

    #[error("Invalid value for property '{property}': {message}")]
    InvalidValue { property: String, message: String },

    #[error("Unknown entity type: {entity}")]
    UnknownEntity { entity: String },

    #[error("Factory not found: {factory}")]
    MissingFactory { factory: String },

    #[error("Factory '{factory}' exceeded the maximum build depth of {depth}")]
    DepthExceeded { factory: String, depth: usize },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FactoryError {
    /// Create an unbuildable factory error
    pub fn unbuildable(factory: impl Into<String>, style: BuildStyle) -> Self {
        Self::Unbuildable {
            factory: factory.into(),
            style,
        }
    }

    /// Create an unknown property error
    pub fn unknown_property(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnknownProperty {
            property: property.into(),
            target: target.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create an unknown entity error
    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
        }
    }

    /// Create a missing factory error
    pub fn missing_factory(factory: impl Into<String>) -> Self {
        Self::MissingFactory {
            factory: factory.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for factory operations
pub type FactoryResult<T> = Result<T, FactoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbuildable_message_names_factory_and_style() {
        let err = FactoryError::unbuildable("Feed", BuildStyle::Entity);
        let message = err.to_string();

        assert!(message.contains("'Feed'"));
        assert!(message.contains("entity style"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: FactoryError = json_err.into();

        assert!(matches!(err, FactoryError::Serialization(_)));
    }
}
