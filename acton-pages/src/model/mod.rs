//! Entity model: self-describing entity types and dynamic field values

mod entity;
mod value;

pub use entity::{
    downcast, downcast_mut, downcast_ref, BoxedEntity, Entity, EntityId, EntityType, FieldModel, FieldSet,
};
pub use value::{EntityRef, FieldValue, FieldValueType, SemanticType};
