//! Field metadata introspection
//!
//! Turns an entity type's static field table into renderable
//! [`FieldMetadata`] records. Results are deterministic for a given type, so
//! they are cached per entity type key for the life of the introspector.

use convert_case::{Case, Casing};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::model::{EntityType, FieldModel, SemanticType};
use crate::registry::EntityTypeRegistry;

/// Renderable description of one entity field
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMetadata {
    /// Field name
    pub name: &'static str,
    /// Label shown to users
    pub display_name: String,
    /// Semantic type
    pub semantic_type: SemanticType,
    /// Field must not be left blank
    pub required: bool,
    /// Field is never written back
    pub read_only: bool,
    /// Field is never rendered
    pub hidden: bool,
    /// Maximum text length in characters
    pub max_length: Option<usize>,
    /// Data provider locator for selectable options
    pub data_provider: Option<&'static str>,
    /// Entity type key of the referenced type
    pub reference_target: Option<&'static str>,
    /// Field may hold no value
    pub nullable: bool,
}

impl FieldMetadata {
    /// Describe a static field model
    #[must_use]
    pub fn from_model(model: &FieldModel) -> Self {
        Self {
            name: model.name,
            display_name: model
                .label
                .map_or_else(|| default_label(model.name), str::to_string),
            semantic_type: model.semantic,
            required: model.required,
            read_only: model.read_only,
            hidden: model.hidden,
            max_length: model.max_length,
            data_provider: model.data_provider,
            reference_target: model.reference_target,
            nullable: model.nullable,
        }
    }
}

/// Human-readable label generated from a field or type name
///
/// ```rust
/// use acton_pages::introspect::default_label;
///
/// assert_eq!(default_label("sort_order"), "Sort Order");
/// assert_eq!(default_label("dueDate"), "Due Date");
/// ```
#[must_use]
pub fn default_label(name: &str) -> String {
    name.to_case(Case::Title)
}

/// Describe the fields of a statically known entity type
///
/// Same result as [`FieldIntrospector::describe_fields`] without going
/// through the registry.
#[must_use]
pub fn describe<T: EntityType>() -> Vec<FieldMetadata> {
    describe_models(&T::field_models())
}

fn describe_models(models: &[&'static FieldModel]) -> Vec<FieldMetadata> {
    let mut seen = HashSet::new();
    models
        .iter()
        .filter(|model| seen.insert(model.name))
        .map(|model| FieldMetadata::from_model(model))
        .collect()
}

/// Cached field metadata lookup by entity type key
#[derive(Debug)]
pub struct FieldIntrospector {
    registry: Arc<EntityTypeRegistry>,
    cache: RwLock<HashMap<&'static str, Arc<[FieldMetadata]>>>,
}

impl FieldIntrospector {
    /// Create an introspector over a populated registry
    #[must_use]
    pub fn new(registry: Arc<EntityTypeRegistry>) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Ordered field metadata of an entity type, most-derived declarations first
    ///
    /// Data-provider locators are not checked here; they are validated when a
    /// form actually renders the field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredEntityType`] for unknown keys.
    pub fn describe_fields(&self, entity_type: &str) -> Result<Arc<[FieldMetadata]>, ConfigError> {
        if let Some(cached) = self.cache.read().get(entity_type) {
            return Ok(Arc::clone(cached));
        }

        let descriptor = self.registry.resolve(entity_type)?;
        let described: Arc<[FieldMetadata]> =
            describe_models(&descriptor.field_models()).into();
        tracing::debug!(
            entity_type = descriptor.entity_type_key(),
            fields = described.len(),
            "Described entity fields"
        );

        let mut cache = self.cache.write();
        Ok(Arc::clone(
            cache
                .entry(descriptor.entity_type_key())
                .or_insert(described),
        ))
    }

    /// Metadata of a single field
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownField`] when the type has no such field.
    pub fn field(&self, entity_type: &str, path: &str) -> Result<FieldMetadata, ConfigError> {
        self.describe_fields(entity_type)?
            .iter()
            .find(|field| field.name == path)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownField {
                entity_type: entity_type.to_string(),
                field: path.to_string(),
            })
    }

    /// Number of entity types described so far
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.cache.read().len()
    }
}
