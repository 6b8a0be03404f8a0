//! Per-field validation errors
//!
//! Collected while writing a composed form back into its entity and while
//! running the save-permission chain. Integrates with the `validator` crate
//! so entity types can use `#[derive(Validate)]` for their own rules.

use std::collections::BTreeMap;
use std::fmt;

/// One problem reported for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Text shown next to the field
    pub message: String,
    /// Machine-readable reason, e.g. `required` or `convert`
    pub code: Option<String>,
}

impl FieldError {
    /// Error without a code
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Error carrying a code
    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Collection of validation errors keyed by field path
///
/// Fields iterate in path order so reports are stable.
///
/// # Examples
///
/// ```rust
/// use acton_pages::forms::ValidationErrors;
///
/// let mut errors = ValidationErrors::new();
/// errors.add("name", "Name is required");
/// errors.add("sort_order", "Sort Order must be a number");
///
/// assert!(errors.has_errors());
/// assert_eq!(errors.for_field("name").len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationErrors {
    /// No errors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(FieldError::new(message));
    }

    /// Record `message` with `code` against `field`
    pub fn add_with_code(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(FieldError::with_code(message, code));
    }

    /// Whether anything was recorded
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether `field` has at least one error
    #[must_use]
    pub fn has_field_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Errors recorded against `field`, empty when none
    #[must_use]
    pub fn for_field(&self, field: &str) -> &[FieldError] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Field paths with errors, in path order
    #[must_use]
    pub fn fields_with_errors(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    /// Total number of recorded errors
    #[must_use]
    pub fn count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Forget every error
    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Append the errors of `other`
    pub fn merge(&mut self, other: &Self) {
        for (field, errors) in &other.errors {
            self.errors
                .entry(field.clone())
                .or_default()
                .extend(errors.iter().cloned());
        }
    }

    /// Errors grouped by field path
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldError])> {
        self.errors
            .iter()
            .map(|(field, errors)| (field.as_str(), errors.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, errors) in self.iter() {
            for error in errors {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {error}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut result = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                result.add_with_code(field.to_string(), message, error.code.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
    }

    #[test]
    fn test_field_error_with_code() {
        let error = FieldError::with_code("is required", "required");
        assert_eq!(error.message, "is required");
        assert_eq!(error.code.as_deref(), Some("required"));
    }

    #[test]
    fn test_errors_accumulate_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "is required");
        errors.add("name", "is too long");

        assert!(errors.has_errors());
        assert!(errors.has_field_error("name"));
        assert!(!errors.has_field_error("color"));
        assert_eq!(errors.for_field("name").len(), 2);
        assert_eq!(errors.count(), 2);
    }

    #[test]
    fn test_merge_appends() {
        let mut local = ValidationErrors::new();
        local.add("name", "is required");

        let mut service = ValidationErrors::new();
        service.add("color", "is invalid");
        service.add("name", "is taken");

        local.merge(&service);

        assert_eq!(local.for_field("name").len(), 2);
        assert_eq!(local.for_field("color").len(), 1);
        assert_eq!(local.count(), 3);
    }

    #[test]
    fn test_display_is_ordered_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("sort_order", "must be a number");
        errors.add("name", "is required");
        assert_eq!(
            errors.to_string(),
            "name: is required; sort_order: must be a number"
        );
    }

    #[test]
    fn test_from_validator_errors() {
        let invalid = Named {
            name: String::new(),
        };
        let errors: ValidationErrors = invalid.validate().unwrap_err().into();
        assert_eq!(errors.for_field("name")[0].message, "must not be empty");
        assert_eq!(errors.for_field("name")[0].code.as_deref(), Some("length"));
    }
}
