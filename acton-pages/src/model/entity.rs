//! Entity self-description
//!
//! Entity types describe their fields through a static table generated by
//! `#[derive(Entity)]`. No runtime reflection is involved: the table, the
//! view name and the by-name accessors are all produced at compile time.
//!
//! ```rust
//! use acton_pages::prelude::*;
//!
//! #[derive(Debug, Clone, Default, FieldSet)]
//! #[entity(view_name = "Named Entity View")]
//! pub struct NamedBase {
//!     #[field(id)]
//!     pub id: Option<EntityId>,
//!     #[field(required, max_length = 64)]
//!     pub name: String,
//! }
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[entity(key = "Priority")]
//! pub struct Priority {
//!     #[field(embed)]
//!     pub base: NamedBase,
//!     pub sort_order: i32,
//! }
//!
//! let mut priority = Priority::default();
//! priority.set_field_value("name", FieldValue::Text("High".into())).unwrap();
//! assert_eq!(priority.base.name, "High");
//! assert_eq!(priority.view_name(), Some("Named Entity View"));
//! ```

use std::any::Any;
use std::fmt;

use super::value::FieldValue;
use crate::error::BindError;

/// Identity of a persisted entity
pub type EntityId = u64;

/// Type-erased entity instance
pub type BoxedEntity = Box<dyn Entity>;

/// Static descriptor of one declared field
///
/// Instances live in `static` tables generated by the derive macros.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldModel {
    /// Field name, also the path used by page definitions
    pub name: &'static str,
    /// Explicit display label
    pub label: Option<&'static str>,
    /// Semantic classification derived from the Rust type
    pub semantic: super::SemanticType,
    /// Field must not be left blank
    pub required: bool,
    /// Field is shown but never written back
    pub read_only: bool,
    /// Field is never rendered
    pub hidden: bool,
    /// Maximum text length in characters
    pub max_length: Option<usize>,
    /// Locator of the data provider supplying selectable options
    pub data_provider: Option<&'static str>,
    /// Entity type key of the referenced type
    pub reference_target: Option<&'static str>,
    /// Rust type can hold "no value"
    pub nullable: bool,
}

/// Statically described set of fields
///
/// Implemented by `#[derive(FieldSet)]` for reusable base structs and by
/// `#[derive(Entity)]` for entity types. Structs embedded with
/// `#[field(embed)]` contribute their fields after the embedding struct's own
/// fields, so the most-derived declaration of a name wins.
pub trait FieldSet {
    /// View name declared by this set or the first embedded set that has one
    const VIEW_NAME: Option<&'static str>;

    /// Append this set's field descriptors, own fields first
    fn collect_fields(out: &mut Vec<&'static FieldModel>);

    /// Whether `name` is a field of this set or an embedded set
    fn owns_field(name: &str) -> bool;

    /// Read a field by name
    fn read_field(&self, name: &str) -> Option<FieldValue>;

    /// Write a field by name
    ///
    /// # Errors
    ///
    /// Returns [`BindError::UnknownField`] for names the set does not own and
    /// [`BindError::Convert`] when the value does not fit the field type.
    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<(), BindError>;

    /// Id of the entity, if persisted
    fn entity_id(&self) -> Option<EntityId>;

    /// Assign the persisted id
    fn set_entity_id(&mut self, id: EntityId);

    /// Whether the record is flagged as non-deletable
    fn non_deletable(&self) -> bool;
}

/// Statically known entity type
pub trait EntityType: FieldSet + Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Stable key used to register and look up the type
    const ENTITY_KEY: &'static str;

    /// All field descriptors, most-derived first
    #[must_use]
    fn field_models() -> Vec<&'static FieldModel> {
        let mut fields = Vec::new();
        Self::collect_fields(&mut fields);
        fields
    }
}

/// Object-safe view of an entity instance used by the generic engine
///
/// Implemented for every [`EntityType`].
pub trait Entity: fmt::Debug + Send + Sync + 'static {
    /// Entity type key of the instance's runtime type
    fn entity_key(&self) -> &'static str;

    /// `VIEW_NAME` of the runtime type
    fn view_name(&self) -> Option<&'static str>;

    /// Persisted id
    fn id(&self) -> Option<EntityId>;

    /// Assign the persisted id
    fn set_id(&mut self, id: EntityId);

    /// Read a field by name
    fn field_value(&self, name: &str) -> Option<FieldValue>;

    /// Write a field by name
    ///
    /// # Errors
    ///
    /// See [`FieldSet::write_field`].
    fn set_field_value(&mut self, name: &str, value: FieldValue) -> Result<(), BindError>;

    /// Whether the record is flagged as non-deletable
    fn is_non_deletable(&self) -> bool;

    /// Clone behind a box
    fn clone_entity(&self) -> BoxedEntity;

    /// Borrow as [`Any`] for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as [`Any`] for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert into [`Any`] for owned downcasting
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Whether the entity has been persisted
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    /// Short human-readable label: the `name` field when set, else the id
    fn display_label(&self) -> String {
        match self.field_value("name") {
            Some(FieldValue::Text(name)) if !name.trim().is_empty() => name,
            _ => self.id().map_or_else(
                || format!("New {}", self.entity_key()),
                |id| format!("{} #{id}", self.entity_key()),
            ),
        }
    }
}

impl<T: EntityType> Entity for T {
    fn entity_key(&self) -> &'static str {
        T::ENTITY_KEY
    }

    fn view_name(&self) -> Option<&'static str> {
        T::VIEW_NAME
    }

    fn id(&self) -> Option<EntityId> {
        self.entity_id()
    }

    fn set_id(&mut self, id: EntityId) {
        self.set_entity_id(id);
    }

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        self.read_field(name)
    }

    fn set_field_value(&mut self, name: &str, value: FieldValue) -> Result<(), BindError> {
        self.write_field(name, value)
    }

    fn is_non_deletable(&self) -> bool {
        self.non_deletable()
    }

    fn clone_entity(&self) -> BoxedEntity {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Clone for BoxedEntity {
    fn clone(&self) -> Self {
        self.clone_entity()
    }
}

/// Borrow a type-erased entity as `T`
#[must_use]
pub fn downcast_ref<T: EntityType>(entity: &dyn Entity) -> Option<&T> {
    entity.as_any().downcast_ref::<T>()
}

/// Mutably borrow a type-erased entity as `T`
#[must_use]
pub fn downcast_mut<T: EntityType>(entity: &mut dyn Entity) -> Option<&mut T> {
    entity.as_any_mut().downcast_mut::<T>()
}

/// Take a type-erased entity back as `T`
///
/// # Errors
///
/// Returns the original key when the entity is not a `T`.
pub fn downcast<T: EntityType>(entity: BoxedEntity) -> Result<T, &'static str> {
    let key = entity.entity_key();
    entity.into_any().downcast::<T>().map(|boxed| *boxed).map_err(|_| key)
}
