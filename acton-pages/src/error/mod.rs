//! Error types and error handling
//!
//! Errors are split by how they propagate:
//!
//! - [`ConfigError`] and [`PageError::AuthenticationRequired`] abort a
//!   navigation and surface at the page boundary
//! - validation and delete-dependency problems are returned as data
//!   (`SaveOutcome::Invalid`, `DeleteOutcome::Blocked`), never as errors
//! - [`CrudError::NotFound`] is recovered by the coordinator with a fallback
//!   selection

use crate::model::{EntityId, SemanticType};
use thiserror::Error;

/// Metadata or wiring problem that makes a page impossible to build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Entity type (and none of its embedded bases) declares a view name
    #[error("entity type `{0}` does not declare a VIEW_NAME")]
    MissingViewName(String),

    /// Lookup of a key nobody registered
    #[error("entity type `{0}` is not registered")]
    UnregisteredEntityType(String),

    /// Second registration for the same key
    #[error("entity type `{0}` is already registered")]
    DuplicateEntityType(String),

    /// Second registration for the same data provider locator
    #[error("data provider `{0}` is already registered")]
    DuplicateDataProvider(String),

    /// Second registration for the same data service locator
    #[error("data service locator `{0}` is already registered")]
    DuplicateServiceLocator(String),

    /// Process-wide registry was installed twice
    #[error("the global entity type registry is already installed")]
    RegistryAlreadyInstalled,

    /// Field path that does not resolve on the entity type
    #[error("field `{field}` does not exist on entity type `{entity_type}`")]
    UnknownField {
        /// Entity type key the path was resolved against
        entity_type: String,
        /// Offending field path
        field: String,
    },

    /// No page definition with this id
    #[error("no page found for id {0}")]
    MissingPageDefinition(u64),

    /// Page references a grid definition that does not exist
    #[error("grid definition {0} not found")]
    MissingGridDefinition(u64),

    /// Page references a detail definition that does not exist
    #[error("detail definition {0} not found")]
    MissingDetailDefinition(u64),

    /// Field binds to a data provider locator nobody registered
    #[error("data provider `{locator}` for field `{field}` could not be resolved")]
    UnresolvedDataProvider {
        /// Field that requested the provider
        field: String,
        /// Locator that failed to resolve
        locator: String,
    },

    /// Grid definition names a data service locator nobody registered
    #[error("data service `{0}` is not registered")]
    UnresolvedDataService(String),

    /// Entity handed to a page built for another entity type
    #[error("expected entity type `{expected}`, got `{actual}`")]
    EntityTypeMismatch {
        /// Entity type the page or service was built for
        expected: String,
        /// Entity type actually received
        actual: String,
    },

    /// Detail line relation that is not a reference field
    #[error("relation `{relation}` on `{entity_type}` is not a reference field")]
    InvalidRelation {
        /// Entity type the relation was resolved against
        entity_type: String,
        /// Offending relation path
        relation: String,
    },

    /// No page shows entities of this view
    #[error("no page is defined for view `{0}`")]
    NoPageForView(String),

    /// Page definitions file could not be read or parsed
    #[error("invalid page definitions: {0}")]
    Definitions(String),
}

/// Malformed navigation token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid navigation token `{token}`: {reason}")]
pub struct RouteParseError {
    /// Token as received
    pub token: String,
    /// What was wrong with it
    pub reason: String,
}

impl RouteParseError {
    /// Create a parse error for `token`
    #[must_use]
    pub fn new(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a data service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Entity with this id does not exist
    #[error("{entity_type} #{id} not found")]
    NotFound {
        /// Entity type key
        entity_type: String,
        /// Missing id
        id: EntityId,
    },

    /// Write rejected because it would violate a data constraint
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

/// Conversion failure between a [`FieldValue`](crate::model::FieldValue) and a Rust value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Empty value for a non-optional field
    #[error("a value is required")]
    Missing,

    /// Input is not numeric
    #[error("must be a number")]
    NotANumber,

    /// Fractional number for an integer field
    #[error("must be a whole number")]
    NotAnInteger,

    /// Number does not fit the field's integer type
    #[error("value is out of range")]
    OutOfRange,

    /// Input is not a date
    #[error("must be a date (YYYY-MM-DD)")]
    InvalidDate,

    /// Input is not a boolean
    #[error("must be yes or no")]
    InvalidBoolean,

    /// Input is not a record id
    #[error("must reference an existing record")]
    InvalidReference,

    /// Value of the wrong kind
    #[error("expected a {expected} value, got {actual}")]
    TypeMismatch {
        /// Semantic type of the field
        expected: SemanticType,
        /// Kind of the value received
        actual: &'static str,
    },
}

/// Failure writing a value into an entity field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// Entity has no field with this name
    #[error("unknown field `{0}`")]
    UnknownField(String),

    /// Value could not be converted to the field's type
    #[error("field `{field}`: {source}")]
    Convert {
        /// Field being written
        field: String,
        /// Underlying conversion failure
        #[source]
        source: ConvertError,
    },
}

/// Failure of a CRUD lifecycle operation
#[derive(Debug, Error)]
pub enum CrudError {
    /// Operation needs a selected entity and there is none
    #[error("no entity is selected")]
    NoSelection,

    /// Selected entity no longer resolves
    #[error("{entity_type} #{id} no longer exists")]
    NotFound {
        /// Entity type key
        entity_type: String,
        /// Missing id
        id: EntityId,
    },

    /// Data service failure
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Metadata problem hit while composing
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Value could not be written into the entity
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Top-level error for page navigation
#[derive(Debug, Error)]
pub enum PageError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Navigation token could not be parsed
    #[error(transparent)]
    Route(#[from] RouteParseError),

    /// Page requires an authenticated actor
    #[error("Unauthorized: page {page_id} requires an authenticated user")]
    AuthenticationRequired {
        /// Page that was requested
        page_id: u64,
    },

    /// Lifecycle operation failed while entering the page
    #[error("CRUD error: {0}")]
    Crud(#[from] CrudError),

    /// Definition store or data service failure
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

impl PageError {
    /// Whether the error is a configuration problem rather than a user or data problem
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Crud(CrudError::Config(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::UnknownField {
            entity_type: "ActivityStatus".to_string(),
            field: "colour".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "field `colour` does not exist on entity type `ActivityStatus`"
        );
        assert_eq!(
            ConfigError::MissingPageDefinition(7).to_string(),
            "no page found for id 7"
        );
    }

    #[test]
    fn test_page_error_classification() {
        let config: PageError = ConfigError::MissingViewName("Foo".to_string()).into();
        assert!(config.is_configuration());

        let nested: PageError =
            CrudError::from(ConfigError::UnregisteredEntityType("Foo".to_string())).into();
        assert!(nested.is_configuration());

        let auth = PageError::AuthenticationRequired { page_id: 3 };
        assert!(!auth.is_configuration());
    }

    #[test]
    fn test_bind_error_wraps_conversion() {
        let err = BindError::Convert {
            field: "sort_order".to_string(),
            source: ConvertError::NotANumber,
        };
        assert_eq!(err.to_string(), "field `sort_order`: must be a number");
    }
}
