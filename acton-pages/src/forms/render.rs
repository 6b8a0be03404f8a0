//! HTML fragments for composed pages
//!
//! Forms post field changes and toolbar buttons post their action through
//! HTMX attributes. All text is escaped; field errors render under the field.

use std::fmt::Write;

use super::field::{ComposedField, FieldKind, InputType};
use super::{ComposedForm, ComposedGrid, ComposedToolbar, FormSection, ValidationErrors};

/// Endpoints and CSS classes used by [`FormRenderer`]
#[derive(Debug, Clone)]
pub struct FormRenderOptions {
    /// Endpoint toolbar buttons and field changes post to
    pub action: String,
    /// `hx-target` of toolbar buttons
    pub target: String,
    /// Wrapper class of one field
    pub group_class: String,
    /// Label class
    pub label_class: String,
    /// Input class
    pub input_class: String,
    /// Class of the error text
    pub error_class: String,
    /// Extra input class when the field has errors
    pub input_error_class: String,
    /// Toolbar button class
    pub button_class: String,
}

impl Default for FormRenderOptions {
    fn default() -> Self {
        Self {
            action: "/crud".into(),
            target: "#page-content".into(),
            group_class: "form-group".into(),
            label_class: "form-label".into(),
            input_class: "form-input".into(),
            error_class: "form-error".into(),
            input_error_class: "form-input-error".into(),
            button_class: "toolbar-button".into(),
        }
    }
}

/// Renders composed forms to HTML
pub struct FormRenderer;

impl FormRenderer {
    /// Form fragment with default options
    #[must_use]
    pub fn render(form: &ComposedForm) -> String {
        Self::render_with_options(form, &FormRenderOptions::default())
    }

    /// Form fragment
    #[must_use]
    pub fn render_with_options(form: &ComposedForm, options: &FormRenderOptions) -> String {
        let mut html = String::with_capacity(1024);

        html.push_str("<form");
        Self::write_attr(&mut html, "id", &form.id().to_string());
        Self::write_attr(&mut html, "class", "detail-form");
        Self::write_attr(&mut html, "data-entity-type", form.key().entity_type);
        Self::write_attr(&mut html, "data-view", form.key().view_name);
        Self::write_attr(&mut html, "hx-post", &options.action);
        Self::write_attr(&mut html, "hx-trigger", "change");
        Self::write_attr(&mut html, "hx-swap", "none");
        html.push_str(">\n");

        for section in form.sections() {
            html.push_str(&Self::render_section(form, section, options));
        }

        html.push_str("</form>");
        html
    }

    fn render_section(form: &ComposedForm, section: &FormSection, options: &FormRenderOptions) -> String {
        let mut html = String::with_capacity(512);
        html.push_str("  <fieldset>\n");
        if let Some(ref name) = section.name {
            let _ = writeln!(html, "    <legend>{}</legend>", Self::escape_html(name));
        }
        for field in form.section_fields(section) {
            html.push_str(&Self::render_field(field, form.errors(), options));
        }
        html.push_str("  </fieldset>\n");
        html
    }

    fn render_field(
        field: &ComposedField,
        errors: &ValidationErrors,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(256);
        let field_errors = errors.for_field(&field.path);
        let has_errors = !field_errors.is_empty();

        if matches!(field.kind, FieldKind::Input(InputType::Hidden)) {
            return Self::render_input(field, InputType::Hidden, has_errors, options);
        }

        let _ = writeln!(html, r#"    <div class="{}">"#, options.group_class);

        // Checkbox label comes after input
        let is_checkbox = matches!(field.kind, FieldKind::Checkbox);
        if !is_checkbox {
            let _ = writeln!(
                html,
                r#"      <label for="{}" class="{}">{}</label>"#,
                Self::escape_attr(&field.effective_id()),
                options.label_class,
                Self::escape_html(&field.caption)
            );
        }

        let input_html = match &field.kind {
            FieldKind::Input(input_type) => Self::render_input(field, *input_type, has_errors, options),
            FieldKind::Textarea { rows } => Self::render_textarea(field, *rows, has_errors, options),
            FieldKind::Select { options: opts } => Self::render_select(field, opts, has_errors, options),
            FieldKind::Checkbox => Self::render_checkbox(field, has_errors, options),
        };
        html.push_str(&input_html);

        if is_checkbox {
            let _ = writeln!(
                html,
                r#" <label for="{}" class="{}">{}</label>"#,
                Self::escape_attr(&field.effective_id()),
                options.label_class,
                Self::escape_html(&field.caption)
            );
        }

        for error in field_errors {
            let _ = writeln!(
                html,
                r#"      <span class="{}">{}</span>"#,
                options.error_class,
                Self::escape_html(&error.message)
            );
        }

        html.push_str("    </div>\n");
        html
    }

    fn render_input(
        field: &ComposedField,
        input_type: InputType,
        has_errors: bool,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(128);

        html.push_str("      <input");
        Self::write_attr(&mut html, "type", input_type.as_str());
        Self::write_attr(&mut html, "name", &field.path);
        Self::write_attr(&mut html, "id", &field.effective_id());
        if input_type != InputType::Hidden {
            Self::write_attr(&mut html, "class", &Self::build_input_class(has_errors, options));
        }
        Self::write_attr(&mut html, "value", &field.display_value());
        Self::write_flags(&mut html, field);
        if let Some(len) = field.metadata.max_length {
            Self::write_attr(&mut html, "maxlength", &len.to_string());
        }
        html.push_str(">\n");
        html
    }

    fn render_textarea(
        field: &ComposedField,
        rows: u32,
        has_errors: bool,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(128);

        html.push_str("      <textarea");
        Self::write_attr(&mut html, "name", &field.path);
        Self::write_attr(&mut html, "id", &field.effective_id());
        Self::write_attr(&mut html, "class", &Self::build_input_class(has_errors, options));
        Self::write_attr(&mut html, "rows", &rows.to_string());
        Self::write_flags(&mut html, field);
        html.push('>');
        html.push_str(&Self::escape_html(&field.display_value()));
        html.push_str("</textarea>\n");
        html
    }

    fn render_select(
        field: &ComposedField,
        opts: &[super::field::SelectOption],
        has_errors: bool,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(256);
        let current = field.display_value();

        html.push_str("      <select");
        Self::write_attr(&mut html, "name", &field.path);
        Self::write_attr(&mut html, "id", &field.effective_id());
        Self::write_attr(&mut html, "class", &Self::build_input_class(has_errors, options));
        if field.flags.required {
            html.push_str(" required");
        }
        if field.flags.read_only {
            html.push_str(" disabled");
        }
        html.push_str(">\n");

        for opt in opts {
            html.push_str("        <option");
            Self::write_attr(&mut html, "value", &opt.value);
            if opt.disabled {
                html.push_str(" disabled");
            }
            if opt.value == current {
                html.push_str(" selected");
            }
            html.push('>');
            html.push_str(&Self::escape_html(&opt.label));
            html.push_str("</option>\n");
        }

        html.push_str("      </select>\n");
        html
    }

    fn render_checkbox(field: &ComposedField, has_errors: bool, options: &FormRenderOptions) -> String {
        let mut html = String::with_capacity(128);

        html.push_str("      <input");
        Self::write_attr(&mut html, "type", "checkbox");
        Self::write_attr(&mut html, "name", &field.path);
        Self::write_attr(&mut html, "id", &field.effective_id());
        Self::write_attr(&mut html, "class", &Self::build_input_class(has_errors, options));
        Self::write_attr(&mut html, "value", "true");
        if field.is_checked() {
            html.push_str(" checked");
        }
        if field.flags.read_only {
            html.push_str(" disabled");
        }
        html.push('>');
        html
    }

    /// Render the toolbar's visible buttons
    #[must_use]
    pub fn render_toolbar(toolbar: &ComposedToolbar, options: &FormRenderOptions) -> String {
        let mut html = String::with_capacity(512);
        html.push_str(r#"<div class="crud-toolbar" role="toolbar">"#);
        html.push('\n');
        for action in toolbar.visible_actions() {
            let vals = serde_json::json!({ "action": action.as_str() }).to_string();
            html.push_str("  <button type=\"button\"");
            Self::write_attr(&mut html, "class", &options.button_class);
            Self::write_attr(&mut html, "hx-post", &options.action);
            Self::write_attr(&mut html, "hx-target", &options.target);
            // JSON payload, so single-quoted
            html.push_str(" hx-vals='");
            html.push_str(&vals);
            html.push('\'');
            if !toolbar.is_enabled(action) {
                html.push_str(" disabled");
            }
            html.push('>');
            html.push_str(action.label());
            html.push_str("</button>\n");
        }
        html.push_str("</div>");
        html
    }

    /// Render a grid as a selectable table
    #[must_use]
    pub fn render_grid(grid: &ComposedGrid, options: &FormRenderOptions) -> String {
        let mut html = String::with_capacity(1024);
        let _ = writeln!(
            html,
            r#"<table class="crud-grid" data-entity-type="{}">"#,
            Self::escape_attr(grid.layout.entity_type)
        );
        html.push_str("  <thead><tr>");
        for column in &grid.layout.columns {
            let _ = write!(html, "<th>{}</th>", Self::escape_html(&column.caption));
        }
        html.push_str("</tr></thead>\n  <tbody>\n");

        for (index, row) in grid.rows.iter().enumerate() {
            html.push_str("    <tr");
            if let Some(id) = row.id {
                let vals = serde_json::json!({ "action": "select", "item": id }).to_string();
                Self::write_attr(&mut html, "hx-post", &options.action);
                Self::write_attr(&mut html, "hx-target", &options.target);
                html.push_str(" hx-vals='");
                html.push_str(&vals);
                html.push('\'');
            }
            if grid.selected == Some(index) {
                html.push_str(r#" class="selected" aria-selected="true""#);
            }
            html.push('>');
            for cell in &row.cells {
                let _ = write!(html, "<td>{}</td>", Self::escape_html(cell));
            }
            html.push_str("</tr>\n");
        }

        html.push_str("  </tbody>\n</table>");
        html
    }

    fn write_flags(html: &mut String, field: &ComposedField) {
        if field.flags.required {
            html.push_str(" required");
        }
        if field.flags.read_only {
            html.push_str(" readonly");
        }
    }

    fn build_input_class(has_errors: bool, options: &FormRenderOptions) -> String {
        if has_errors {
            format!("{} {}", options.input_class, options.input_error_class)
        } else {
            options.input_class.clone()
        }
    }

    fn write_attr(html: &mut String, name: &str, value: &str) {
        html.push(' ');
        html.push_str(name);
        html.push_str("=\"");
        html.push_str(&Self::escape_attr(value));
        html.push('"');
    }

    fn escape_attr(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('"', "&quot;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    fn escape_html(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }
}
