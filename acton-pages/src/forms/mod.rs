//! Form, grid and toolbar composition
//!
//! A detail definition plus an entity's field metadata yields a
//! [`ComposedForm`]: ordered fields grouped into sections, bound to the
//! current entity's values. The [`FormComposer`] decides whether a selection
//! change can reuse the current form (rebind values only) or must rebuild it.
//!
//! # Binding and writing back
//!
//! ```rust,ignore
//! let mut form = composer.compose(&detail, &status)?;
//! form.set_input("name", "Blocked")?;
//!
//! let mut working = status.clone();
//! let errors = form.write_back(&mut working);
//! assert!(!errors.has_errors());
//! ```

mod composer;
mod error;
mod field;
mod grid;
mod render;
mod toolbar;

pub use composer::{ComposeOutcome, FormComposer, StagedForm};
pub use error::{FieldError, ValidationErrors};
pub use field::{ComposedField, FieldFlags, FieldKind, InputType, SelectOption};
pub use grid::{ComposedGrid, GridColumn, GridLayout, GridRow};
pub use render::{FormRenderOptions, FormRenderer};
pub use toolbar::{ComposedToolbar, ToolbarAction, ToolbarVisibility};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BindError, ConfigError, ConvertError, ServiceError};
use crate::model::{Entity, FieldValue};
use crate::registry::DataProvider;

static NEXT_FORM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a composed form instance
///
/// Every rebuild allocates a new id; a reused form keeps its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(u64);

impl FormId {
    fn next() -> Self {
        Self(NEXT_FORM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

/// Memoization key of a composed form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormKey {
    /// Entity type key
    pub entity_type: &'static str,
    /// View name of the entity type
    pub view_name: &'static str,
}

impl fmt::Display for FormKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.view_name)
    }
}

/// Group of fields under one section header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSection {
    /// Header text; `None` for fields declared before any section line
    pub name: Option<String>,
    /// Indices into [`ComposedForm::fields`]
    pub fields: Vec<usize>,
}

/// Detail form composed from a detail definition
pub struct ComposedForm {
    id: FormId,
    key: FormKey,
    detail_id: u64,
    fields: Vec<ComposedField>,
    sections: Vec<FormSection>,
    providers: Vec<(usize, Arc<dyn DataProvider>)>,
    errors: ValidationErrors,
}

impl ComposedForm {
    fn new(
        key: FormKey,
        detail_id: u64,
        fields: Vec<ComposedField>,
        sections: Vec<FormSection>,
        providers: Vec<(usize, Arc<dyn DataProvider>)>,
    ) -> Self {
        Self {
            id: FormId::next(),
            key,
            detail_id,
            fields,
            sections,
            providers,
            errors: ValidationErrors::new(),
        }
    }

    /// Instance identity
    #[must_use]
    pub const fn id(&self) -> FormId {
        self.id
    }

    /// Memoization key
    #[must_use]
    pub const fn key(&self) -> FormKey {
        self.key
    }

    /// Detail definition the form was built from
    #[must_use]
    pub const fn detail_id(&self) -> u64 {
        self.detail_id
    }

    /// Fields in line order
    #[must_use]
    pub fn fields(&self) -> &[ComposedField] {
        &self.fields
    }

    /// Sections in line order
    #[must_use]
    pub fn sections(&self) -> &[FormSection] {
        &self.sections
    }

    /// Field by path (`name` or `relation.name`)
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&ComposedField> {
        self.fields.iter().find(|field| field.path == path)
    }

    /// Section by header text
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&FormSection> {
        self.sections
            .iter()
            .find(|section| section.name.as_deref() == Some(name))
    }

    /// Fields of a section
    pub fn section_fields<'a>(
        &'a self,
        section: &'a FormSection,
    ) -> impl Iterator<Item = &'a ComposedField> + 'a {
        section
            .fields
            .iter()
            .filter_map(|index| self.fields.get(*index))
    }

    /// Reference fields read by relation lines
    #[must_use]
    pub fn relations(&self) -> Vec<&str> {
        let mut relations: Vec<&str> = self
            .fields
            .iter()
            .filter_map(|field| field.relation.as_deref())
            .collect();
        relations.sort_unstable();
        relations.dedup();
        relations
    }

    /// Errors from the last write-back or save attempt
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Replace the displayed errors
    pub fn set_errors(&mut self, errors: ValidationErrors) {
        self.errors = errors;
    }

    /// Whether any field holds input not yet written back
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.fields.iter().any(|field| field.input.is_some())
    }

    /// Show the entity's values, discarding pending input and errors
    ///
    /// Relation fields are cleared; fill them with [`ComposedForm::bind_related`].
    pub fn bind(&mut self, entity: &dyn Entity) {
        for field in &mut self.fields {
            field.input = None;
            field.value = if field.relation.is_some() {
                FieldValue::Empty
            } else {
                entity
                    .field_value(field.metadata.name)
                    .unwrap_or(FieldValue::Empty)
            };
        }
        self.errors.clear();
    }

    /// Show values of the entity a relation points at
    pub fn bind_related(&mut self, relation: &str, related: Option<&dyn Entity>) {
        for field in &mut self.fields {
            if field.relation.as_deref() == Some(relation) {
                field.value = related
                    .and_then(|entity| entity.field_value(field.metadata.name))
                    .unwrap_or(FieldValue::Empty);
            }
        }
    }

    /// Record raw user input for a field
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownField`] when the form has no such field.
    pub fn set_input(&mut self, path: &str, raw: impl Into<String>) -> Result<(), ConfigError> {
        let key = self.key;
        let field = self
            .fields
            .iter_mut()
            .find(|field| field.path == path)
            .ok_or_else(|| ConfigError::UnknownField {
                entity_type: key.entity_type.to_string(),
                field: path.to_string(),
            })?;
        field.input = Some(raw.into());
        Ok(())
    }

    /// Write pending input into `entity`
    ///
    /// Only editable fields with input are written. Fields whose input does
    /// not convert are reported and left unchanged; the rest are still written.
    pub fn write_back(&self, entity: &mut dyn Entity) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for field in self.fields.iter().filter(|field| field.is_editable()) {
            let Some(raw) = &field.input else {
                continue;
            };

            let value = match FieldValue::parse(field.metadata.semantic_type, raw) {
                Ok(value) => value,
                Err(err) => {
                    errors.add_with_code(&field.path, conversion_message(&field.caption, &err), "convert");
                    continue;
                }
            };
            if let (FieldValue::Text(text), Some(max)) = (&value, field.metadata.max_length) {
                if text.chars().count() > max {
                    errors.add_with_code(
                        &field.path,
                        format!("{} must be at most {max} characters", field.caption),
                        "length",
                    );
                    continue;
                }
            }

            match entity.set_field_value(field.metadata.name, value) {
                Ok(()) => {}
                Err(BindError::Convert { source, .. }) => {
                    errors.add_with_code(&field.path, conversion_message(&field.caption, &source), "convert");
                }
                Err(BindError::UnknownField(_)) => {
                    errors.add(&field.path, format!("{} cannot be written", field.caption));
                }
            }
        }
        errors
    }

    /// Fill select options from the fields' data providers
    ///
    /// Optional selects get a leading blank option.
    ///
    /// # Errors
    ///
    /// Returns the first [`ServiceError`] reported by a provider.
    pub async fn load_options(&mut self) -> Result<(), ServiceError> {
        for (index, provider) in self.providers.clone() {
            let mut options = provider.options().await?;
            if let Some(field) = self.fields.get_mut(index) {
                if !field.flags.required {
                    options.insert(0, SelectOption::new("", ""));
                }
                if let FieldKind::Select { options: current } = &mut field.kind {
                    *current = options;
                }
            }
        }
        Ok(())
    }
}

fn conversion_message(caption: &str, err: &ConvertError) -> String {
    match err {
        ConvertError::Missing => format!("{caption} is required"),
        ConvertError::OutOfRange => format!("{caption} is out of range"),
        ConvertError::TypeMismatch { .. } => format!("{caption}: {err}"),
        _ => format!("{caption} {err}"),
    }
}

impl fmt::Debug for ComposedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedForm")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("detail_id", &self.detail_id)
            .field("fields", &self.fields)
            .field("sections", &self.sections)
            .field("providers", &self.providers.len())
            .field("errors", &self.errors)
            .finish()
    }
}

impl fmt::Display for ComposedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&FormRenderer::render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::FieldMetadata;
    use crate::model::{EntityId, SemanticType};

    #[derive(Debug, Clone, Default, crate::Entity)]
    #[entity(key = "Task", view_name = "Tasks View")]
    struct Task {
        #[field(id)]
        id: Option<EntityId>,
        #[field(required, max_length = 10)]
        name: String,
        estimate: i32,
        #[field(read_only)]
        created_by: String,
    }

    fn form() -> ComposedForm {
        let fields: Vec<_> = crate::introspect::describe::<Task>()
            .into_iter()
            .filter(|metadata| metadata.name != "id")
            .map(|metadata: FieldMetadata| ComposedField::new(metadata, None, None, None))
            .collect();
        let sections = vec![FormSection {
            name: Some("Main".to_string()),
            fields: (0..fields.len()).collect(),
        }];
        ComposedForm::new(
            FormKey {
                entity_type: "Task",
                view_name: "Tasks View",
            },
            1,
            fields,
            sections,
            Vec::new(),
        )
    }

    fn task() -> Task {
        Task {
            id: Some(3),
            name: "Write".to_string(),
            estimate: 2,
            created_by: "ada".to_string(),
        }
    }

    #[test]
    fn test_each_form_gets_a_new_id() {
        assert_ne!(form().id(), form().id());
    }

    #[test]
    fn test_bind_shows_values_and_clears_input() {
        let mut form = form();
        form.set_input("name", "Draft").unwrap();
        assert!(form.is_dirty());

        form.bind(&task());
        assert!(!form.is_dirty());
        assert_eq!(form.field("estimate").unwrap().value, FieldValue::Integer(2));
        assert_eq!(form.section("Main").unwrap().fields.len(), 3);
    }

    #[test]
    fn test_set_input_unknown_field() {
        assert!(matches!(
            form().set_input("colour", "red"),
            Err(ConfigError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_write_back_converts_and_reports() {
        let mut form = form();
        form.bind(&task());
        form.set_input("name", "Review").unwrap();
        form.set_input("estimate", "soon").unwrap();
        form.set_input("created_by", "mallory").unwrap();

        let mut working = task();
        let errors = form.write_back(&mut working);
        assert_eq!(working.name, "Review");
        assert_eq!(working.estimate, 2);
        assert_eq!(working.created_by, "ada");
        assert_eq!(
            errors.for_field("estimate")[0].message,
            "Estimate must be a number"
        );
    }

    #[test]
    fn test_write_back_enforces_max_length() {
        let mut form = form();
        form.set_input("name", "far too long a name").unwrap();
        let mut working = task();
        let errors = form.write_back(&mut working);
        assert_eq!(
            errors.for_field("name")[0].message,
            "Name must be at most 10 characters"
        );
        assert_eq!(working.name, "Write");
    }

    #[test]
    fn test_blank_number_is_required() {
        let mut form = form();
        form.set_input("estimate", " ").unwrap();
        let errors = form.write_back(&mut task());
        assert_eq!(errors.for_field("estimate")[0].message, "Estimate is required");
    }

    #[tokio::test]
    async fn test_load_options_fills_selects() {
        let metadata = FieldMetadata {
            name: "name",
            display_name: "Name".to_string(),
            semantic_type: SemanticType::Text,
            required: false,
            read_only: false,
            hidden: false,
            max_length: None,
            data_provider: None,
            reference_target: None,
            nullable: false,
        };
        let field = ComposedField::new(metadata, None, None, Some("names"));
        let provider: Arc<dyn DataProvider> =
            Arc::new(crate::registry::StaticOptions::from_labels(["A", "B"]));
        let mut form = ComposedForm::new(
            FormKey {
                entity_type: "Task",
                view_name: "Tasks View",
            },
            1,
            vec![field],
            vec![FormSection {
                name: None,
                fields: vec![0],
            }],
            vec![(0, provider)],
        );

        form.load_options().await.unwrap();
        let labels: Vec<_> = form.fields()[0]
            .options()
            .iter()
            .map(|option| option.label.as_str())
            .collect();
        assert_eq!(labels, vec!["", "A", "B"]);
    }
}
