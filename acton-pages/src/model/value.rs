//! Dynamic field values
//!
//! [`FieldValue`] is the currency between entities and composed forms. The
//! [`FieldValueType`] trait maps each supported Rust field type to its
//! [`SemanticType`] at compile time, which is what the derive macros use to
//! classify declared fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::entity::{EntityId, EntityType};
use crate::error::ConvertError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Semantic classification of a field, independent of its Rust type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Free text
    Text,
    /// Integer or decimal number
    Number,
    /// Date or timestamp
    Date,
    /// Yes/no flag
    Boolean,
    /// Reference to another entity
    Reference,
}

impl SemanticType {
    /// Lowercase name of the type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field value detached from its entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// No value
    #[default]
    Empty,
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Decimal value
    Decimal(f64),
    /// Boolean value
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Point in time
    DateTime(DateTime<Utc>),
    /// Id of a referenced entity
    Reference(EntityId),
}

impl FieldValue {
    /// Whether the value counts as blank for required-field checks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Name of the value's kind, for error messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Reference(_) => "reference",
        }
    }

    /// Parse raw user input for a field of the given semantic type
    ///
    /// Blank input parses to [`FieldValue::Empty`] for every type.
    ///
    /// # Errors
    ///
    /// Returns a [`ConvertError`] describing why the input is not valid for
    /// `semantic`.
    pub fn parse(semantic: SemanticType, raw: &str) -> Result<Self, ConvertError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::Empty);
        }
        match semantic {
            SemanticType::Text => Ok(Self::Text(raw.to_string())),
            SemanticType::Number => trimmed.parse::<i64>().map(Self::Integer).or_else(|_| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .map(Self::Decimal)
                    .ok_or(ConvertError::NotANumber)
            }),
            SemanticType::Date => parse_date(trimmed),
            SemanticType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(Self::Boolean(true)),
                "false" | "off" | "no" | "0" => Ok(Self::Boolean(false)),
                _ => Err(ConvertError::InvalidBoolean),
            },
            SemanticType::Reference => trimmed
                .parse::<EntityId>()
                .map(Self::Reference)
                .map_err(|_| ConvertError::InvalidReference),
        }
    }

    /// Render the value the way an input control expects it
    #[must_use]
    pub fn to_input_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal(value) => value.to_string(),
            Self::Boolean(value) => value.to_string(),
            Self::Date(date) => date.format(DATE_FORMAT).to_string(),
            Self::DateTime(at) => at.format(DATETIME_INPUT_FORMAT).to_string(),
            Self::Reference(id) => id.to_string(),
        }
    }
}

fn parse_date(input: &str) -> Result<FieldValue, ConvertError> {
    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT) {
        return Ok(FieldValue::Date(date));
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(FieldValue::DateTime(at.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(input, DATETIME_INPUT_FORMAT)
        .map(|at| FieldValue::DateTime(at.and_utc()))
        .map_err(|_| ConvertError::InvalidDate)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(true) => f.write_str("Yes"),
            Self::Boolean(false) => f.write_str("No"),
            Self::DateTime(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M")),
            other => f.write_str(&other.to_input_string()),
        }
    }
}

/// Rust types that can back an entity field
///
/// The associated constants are evaluated at compile time by the derive
/// macros to fill each type's static field table.
pub trait FieldValueType: Sized {
    /// Semantic classification of the type
    const SEMANTIC: SemanticType;

    /// Whether the type can hold "no value"
    const NULLABLE: bool = false;

    /// Entity type key for reference types
    const REFERENCE_TARGET: Option<&'static str> = None;

    /// Convert into a detached value
    fn to_field_value(&self) -> FieldValue;

    /// Convert from a detached value
    ///
    /// # Errors
    ///
    /// Returns a [`ConvertError`] when the value does not fit the type.
    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError>;
}

impl FieldValueType for String {
    const SEMANTIC: SemanticType = SemanticType::Text;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Text(text) => Ok(text),
            other => Ok(other.to_input_string()),
        }
    }
}

impl FieldValueType for bool {
    const SEMANTIC: SemanticType = SemanticType::Boolean;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Boolean(*self)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Boolean(flag) => Ok(flag),
            FieldValue::Empty => Ok(false),
            other => Err(mismatch(Self::SEMANTIC, &other)),
        }
    }
}

impl FieldValueType for i64 {
    const SEMANTIC: SemanticType = SemanticType::Number;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Integer(number) => Ok(number),
            FieldValue::Decimal(number) if number.fract() == 0.0 => {
                if number >= i64::MIN as f64 && number <= i64::MAX as f64 {
                    Ok(number as Self)
                } else {
                    Err(ConvertError::OutOfRange)
                }
            }
            FieldValue::Decimal(_) => Err(ConvertError::NotAnInteger),
            FieldValue::Empty => Err(ConvertError::Missing),
            other => Err(mismatch(Self::SEMANTIC, &other)),
        }
    }
}

macro_rules! narrow_integer_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValueType for $ty {
                const SEMANTIC: SemanticType = SemanticType::Number;

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::Integer(i64::from(*self))
                }

                fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
                    let wide = i64::from_field_value(value)?;
                    Self::try_from(wide).map_err(|_| ConvertError::OutOfRange)
                }
            }
        )*
    };
}

narrow_integer_field!(i16, i32, u16, u32);

impl FieldValueType for u64 {
    const SEMANTIC: SemanticType = SemanticType::Number;

    #[allow(clippy::cast_precision_loss)]
    fn to_field_value(&self) -> FieldValue {
        i64::try_from(*self).map_or_else(|_| FieldValue::Decimal(*self as f64), FieldValue::Integer)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        let wide = i64::from_field_value(value)?;
        Self::try_from(wide).map_err(|_| ConvertError::OutOfRange)
    }
}

impl FieldValueType for f64 {
    const SEMANTIC: SemanticType = SemanticType::Number;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Decimal(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Decimal(number) => Ok(number),
            FieldValue::Integer(number) => Ok(number as Self),
            FieldValue::Empty => Err(ConvertError::Missing),
            other => Err(mismatch(Self::SEMANTIC, &other)),
        }
    }
}

impl FieldValueType for NaiveDate {
    const SEMANTIC: SemanticType = SemanticType::Date;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Date(*self)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Date(date) => Ok(date),
            FieldValue::DateTime(at) => Ok(at.date_naive()),
            FieldValue::Empty => Err(ConvertError::Missing),
            FieldValue::Text(text) => match parse_date(text.trim())? {
                FieldValue::Date(date) => Ok(date),
                FieldValue::DateTime(at) => Ok(at.date_naive()),
                _ => Err(ConvertError::InvalidDate),
            },
            other => Err(mismatch(Self::SEMANTIC, &other)),
        }
    }
}

impl FieldValueType for DateTime<Utc> {
    const SEMANTIC: SemanticType = SemanticType::Date;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::DateTime(*self)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::DateTime(at) => Ok(at),
            FieldValue::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc())
                .ok_or(ConvertError::InvalidDate),
            FieldValue::Empty => Err(ConvertError::Missing),
            other => Err(mismatch(Self::SEMANTIC, &other)),
        }
    }
}

impl<T: FieldValueType> FieldValueType for Option<T> {
    const SEMANTIC: SemanticType = T::SEMANTIC;
    const NULLABLE: bool = true;
    const REFERENCE_TARGET: Option<&'static str> = T::REFERENCE_TARGET;

    fn to_field_value(&self) -> FieldValue {
        self.as_ref()
            .map_or(FieldValue::Empty, FieldValueType::to_field_value)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        if value.is_empty() {
            return Ok(None);
        }
        T::from_field_value(value).map(Some)
    }
}

fn mismatch(expected: SemanticType, value: &FieldValue) -> ConvertError {
    ConvertError::TypeMismatch {
        expected,
        actual: value.kind(),
    }
}

/// Typed reference to another entity, stored as its id
///
/// Fields of this type are classified [`SemanticType::Reference`] and carry
/// the target's entity type key in their descriptor.
pub struct EntityRef<T> {
    id: EntityId,
    target: PhantomData<fn() -> T>,
}

impl<T> EntityRef<T> {
    /// Reference the entity with `id`
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self {
            id,
            target: PhantomData,
        }
    }

    /// Id of the referenced entity
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }
}

impl<T: EntityType> EntityRef<T> {
    /// Reference to an entity instance, if it has been persisted
    #[must_use]
    pub fn to(entity: &T) -> Option<Self> {
        entity.entity_id().map(Self::new)
    }
}

impl<T> Clone for EntityRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntityRef<T> {}

impl<T> PartialEq for EntityRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for EntityRef<T> {}

impl<T> Hash for EntityRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for EntityRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.id).finish()
    }
}

impl<T: EntityType> FieldValueType for EntityRef<T> {
    const SEMANTIC: SemanticType = SemanticType::Reference;
    const REFERENCE_TARGET: Option<&'static str> = Some(T::ENTITY_KEY);

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Reference(self.id)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Reference(id) => Ok(Self::new(id)),
            FieldValue::Integer(id) => EntityId::try_from(id)
                .map(Self::new)
                .map_err(|_| ConvertError::InvalidReference),
            FieldValue::Empty => Err(ConvertError::Missing),
            other => Err(mismatch(Self::SEMANTIC, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blank_is_empty_for_every_type() {
        for semantic in [
            SemanticType::Text,
            SemanticType::Number,
            SemanticType::Date,
            SemanticType::Boolean,
            SemanticType::Reference,
        ] {
            assert_eq!(FieldValue::parse(semantic, "   ").unwrap(), FieldValue::Empty);
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(
            FieldValue::parse(SemanticType::Number, "42").unwrap(),
            FieldValue::Integer(42)
        );
        assert_eq!(
            FieldValue::parse(SemanticType::Number, "2.5").unwrap(),
            FieldValue::Decimal(2.5)
        );
        assert_eq!(
            FieldValue::parse(SemanticType::Number, "forty"),
            Err(ConvertError::NotANumber)
        );
    }

    #[test]
    fn test_parse_date_and_datetime() {
        let date = FieldValue::parse(SemanticType::Date, "2024-03-01").unwrap();
        assert_eq!(
            date,
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );

        let local = FieldValue::parse(SemanticType::Date, "2024-03-01T09:30").unwrap();
        assert_eq!(local.to_input_string(), "2024-03-01T09:30");

        assert_eq!(
            FieldValue::parse(SemanticType::Date, "01/03/2024"),
            Err(ConvertError::InvalidDate)
        );
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(
            FieldValue::parse(SemanticType::Boolean, "on").unwrap(),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            FieldValue::parse(SemanticType::Boolean, "No").unwrap(),
            FieldValue::Boolean(false)
        );
        assert!(FieldValue::parse(SemanticType::Boolean, "maybe").is_err());
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(i32::from_field_value(FieldValue::Integer(7)), Ok(7));
        assert_eq!(
            i32::from_field_value(FieldValue::Decimal(7.5)),
            Err(ConvertError::NotAnInteger)
        );
        assert_eq!(
            u16::from_field_value(FieldValue::Integer(-1)),
            Err(ConvertError::OutOfRange)
        );
        assert_eq!(
            i64::from_field_value(FieldValue::Empty),
            Err(ConvertError::Missing)
        );
    }

    #[test]
    fn test_option_maps_blank_to_none() {
        assert_eq!(
            Option::<i32>::from_field_value(FieldValue::Text("  ".to_string())),
            Ok(None)
        );
        assert_eq!(
            Option::<String>::from_field_value(FieldValue::Text("x".to_string())),
            Ok(Some("x".to_string()))
        );
        assert_eq!(None::<i32>.to_field_value(), FieldValue::Empty);
        assert!(<Option<i32> as FieldValueType>::NULLABLE);
        assert!(!<i32 as FieldValueType>::NULLABLE);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Boolean(true).to_string(), "Yes");
        assert_eq!(FieldValue::Integer(3).to_string(), "3");
        assert_eq!(FieldValue::Empty.to_string(), "");
    }
}
