//! Composed form fields
//!
//! A [`ComposedField`] is one `Field` line of a detail definition resolved
//! against the entity type's metadata: its caption, widget kind, flags and
//! the value currently bound to it.

use crate::introspect::FieldMetadata;
use crate::model::{FieldValue, SemanticType};

/// Text fields longer than this render as a textarea
const TEXTAREA_THRESHOLD: usize = 255;

/// Field attribute flags grouped for better ergonomics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    /// Whether field is required
    pub required: bool,
    /// Whether field is read-only
    pub read_only: bool,
    /// Whether field is hidden
    pub hidden: bool,
}

/// HTML input types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    /// Text input (default)
    #[default]
    Text,
    /// Number input
    Number,
    /// Date input
    Date,
    /// Hidden input
    Hidden,
}

impl InputType {
    /// Get the HTML type attribute value
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Option for select dropdowns
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SelectOption {
    /// Value attribute
    pub value: String,
    /// Display text
    pub label: String,
    /// Whether this option is disabled
    pub disabled: bool,
}

impl SelectOption {
    /// Create a new select option
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }

    /// Create a disabled option (useful for placeholder)
    #[must_use]
    pub fn disabled(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: true,
        }
    }
}

/// Kind of form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Standard input field
    Input(InputType),
    /// Textarea for long text
    Textarea {
        /// Number of visible text lines
        rows: u32,
    },
    /// Select dropdown
    Select {
        /// Available options, filled by the field's data provider
        options: Vec<SelectOption>,
    },
    /// Checkbox
    Checkbox,
}

impl Default for FieldKind {
    fn default() -> Self {
        Self::Input(InputType::default())
    }
}

impl FieldKind {
    /// Widget for a field, chosen from its metadata
    #[must_use]
    pub fn for_metadata(metadata: &FieldMetadata) -> Self {
        if metadata.hidden {
            return Self::Input(InputType::Hidden);
        }
        if metadata.data_provider.is_some() {
            return Self::Select {
                options: Vec::new(),
            };
        }
        match metadata.semantic_type {
            SemanticType::Reference => Self::Select {
                options: Vec::new(),
            },
            SemanticType::Boolean => Self::Checkbox,
            SemanticType::Number => Self::Input(InputType::Number),
            SemanticType::Date => Self::Input(InputType::Date),
            SemanticType::Text
                if metadata
                    .max_length
                    .is_some_and(|max| max > TEXTAREA_THRESHOLD) =>
            {
                Self::Textarea { rows: 4 }
            }
            SemanticType::Text => Self::Input(InputType::Text),
        }
    }
}

/// A field of a composed form
#[derive(Debug, Clone)]
pub struct ComposedField {
    /// Field path: the field name, or `relation.field` for relation lines
    pub path: String,
    /// Caption shown to users
    pub caption: String,
    /// Metadata of the resolved field
    pub metadata: FieldMetadata,
    /// Reference field the value is read through
    pub relation: Option<String>,
    /// Locator of the option source
    pub data_provider: Option<String>,
    /// Widget kind
    pub kind: FieldKind,
    /// Attribute flags
    pub flags: FieldFlags,
    /// Value bound from the current entity
    pub value: FieldValue,
    /// Raw user input not yet written back
    pub input: Option<String>,
}

impl ComposedField {
    /// Compose a field from resolved metadata
    #[must_use]
    pub fn new(
        metadata: FieldMetadata,
        caption: Option<&str>,
        relation: Option<&str>,
        data_provider: Option<&str>,
    ) -> Self {
        let path = relation.map_or_else(
            || metadata.name.to_string(),
            |relation| format!("{relation}.{}", metadata.name),
        );
        let data_provider = data_provider
            .or(metadata.data_provider)
            .map(str::to_string);
        let mut kind = FieldKind::for_metadata(&metadata);
        if data_provider.is_some() && !metadata.hidden {
            kind = FieldKind::Select {
                options: Vec::new(),
            };
        }
        let flags = FieldFlags {
            required: metadata.required,
            read_only: metadata.read_only || relation.is_some(),
            hidden: metadata.hidden,
        };

        Self {
            path,
            caption: caption.map_or_else(|| metadata.display_name.clone(), str::to_string),
            relation: relation.map(str::to_string),
            data_provider,
            kind,
            flags,
            metadata,
            value: FieldValue::Empty,
            input: None,
        }
    }

    /// Whether user input is written back into the entity
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !self.flags.read_only && !self.flags.hidden
    }

    /// Text shown in the widget: pending input, else the bound value
    #[must_use]
    pub fn display_value(&self) -> String {
        self.input
            .clone()
            .unwrap_or_else(|| self.value.to_input_string())
    }

    /// Whether a checkbox is ticked
    #[must_use]
    pub fn is_checked(&self) -> bool {
        match &self.input {
            Some(raw) => matches!(raw.trim(), "true" | "on" | "1" | "yes"),
            None => matches!(self.value, FieldValue::Boolean(true)),
        }
    }

    /// HTML id of the widget
    #[must_use]
    pub fn effective_id(&self) -> String {
        self.path.replace('.', "_")
    }

    /// Options of a select field
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        match &self.kind {
            FieldKind::Select { options } => options,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &'static str, semantic_type: SemanticType) -> FieldMetadata {
        FieldMetadata {
            name,
            display_name: crate::introspect::default_label(name),
            semantic_type,
            required: false,
            read_only: false,
            hidden: false,
            max_length: None,
            data_provider: None,
            reference_target: None,
            nullable: false,
        }
    }

    #[test]
    fn test_input_type_as_str() {
        assert_eq!(InputType::Number.as_str(), "number");
        assert_eq!(InputType::Hidden.to_string(), "hidden");
    }

    #[test]
    fn test_select_option_disabled() {
        let opt = SelectOption::disabled("", "Select a status...");
        assert!(opt.disabled);
    }

    #[test]
    fn test_kind_follows_semantic_type() {
        assert_eq!(
            FieldKind::for_metadata(&metadata("done", SemanticType::Boolean)),
            FieldKind::Checkbox
        );
        assert_eq!(
            FieldKind::for_metadata(&metadata("due", SemanticType::Date)),
            FieldKind::Input(InputType::Date)
        );
        assert!(matches!(
            FieldKind::for_metadata(&metadata("status", SemanticType::Reference)),
            FieldKind::Select { .. }
        ));

        let mut notes = metadata("notes", SemanticType::Text);
        notes.max_length = Some(2000);
        assert_eq!(FieldKind::for_metadata(&notes), FieldKind::Textarea { rows: 4 });

        let mut secret = metadata("revision", SemanticType::Number);
        secret.hidden = true;
        assert_eq!(
            FieldKind::for_metadata(&secret),
            FieldKind::Input(InputType::Hidden)
        );
    }

    #[test]
    fn test_caption_override_and_relation_path() {
        let field = ComposedField::new(
            metadata("name", SemanticType::Text),
            Some("Status"),
            Some("status"),
            None,
        );
        assert_eq!(field.path, "status.name");
        assert_eq!(field.caption, "Status");
        assert_eq!(field.effective_id(), "status_name");
        assert!(field.flags.read_only);
        assert!(!field.is_editable());
    }

    #[test]
    fn test_data_provider_turns_text_into_select() {
        let field = ComposedField::new(
            metadata("color", SemanticType::Text),
            None,
            None,
            Some("palette"),
        );
        assert_eq!(field.data_provider.as_deref(), Some("palette"));
        assert!(field.options().is_empty());
        assert!(matches!(field.kind, FieldKind::Select { .. }));
    }

    #[test]
    fn test_display_value_prefers_input() {
        let mut field = ComposedField::new(metadata("sort_order", SemanticType::Number), None, None, None);
        field.value = FieldValue::Integer(3);
        assert_eq!(field.display_value(), "3");
        field.input = Some("abc".to_string());
        assert_eq!(field.display_value(), "abc");
    }

    #[test]
    fn test_checkbox_state() {
        let mut field = ComposedField::new(metadata("done", SemanticType::Boolean), None, None, None);
        assert!(!field.is_checked());
        field.value = FieldValue::Boolean(true);
        assert!(field.is_checked());
        field.input = Some("off".to_string());
        assert!(!field.is_checked());
    }
}
