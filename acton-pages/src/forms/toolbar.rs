//! CRUD toolbar composition

use serde::{Deserialize, Serialize};

use crate::model::Entity;

/// Which toolbar buttons a page shows
///
/// The tuple form `(new, save, delete, refresh, copy, report)` is what page
/// behaviors exchange.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarVisibility {
    /// "New" button
    pub show_new: bool,
    /// "Save" button
    pub show_save: bool,
    /// "Delete" button
    pub show_delete: bool,
    /// "Refresh" button
    pub show_refresh: bool,
    /// "Copy" button
    pub show_copy: bool,
    /// "Report" button
    pub show_report: bool,
}

impl Default for ToolbarVisibility {
    fn default() -> Self {
        Self::from_tuple((true, true, true, true, false, false))
    }
}

impl ToolbarVisibility {
    /// Every button visible
    #[must_use]
    pub const fn all() -> Self {
        Self::from_tuple((true, true, true, true, true, true))
    }

    /// No toolbar at all
    #[must_use]
    pub const fn none() -> Self {
        Self::from_tuple((false, false, false, false, false, false))
    }

    /// Build from `(new, save, delete, refresh, copy, report)`
    #[must_use]
    #[allow(clippy::fn_params_excessive_bools)]
    pub const fn from_tuple(
        (show_new, show_save, show_delete, show_refresh, show_copy, show_report): (
            bool,
            bool,
            bool,
            bool,
            bool,
            bool,
        ),
    ) -> Self {
        Self {
            show_new,
            show_save,
            show_delete,
            show_refresh,
            show_copy,
            show_report,
        }
    }

    /// Whether `action` is shown
    #[must_use]
    pub const fn shows(&self, action: ToolbarAction) -> bool {
        match action {
            ToolbarAction::New => self.show_new,
            ToolbarAction::Save => self.show_save,
            ToolbarAction::Delete => self.show_delete,
            ToolbarAction::Refresh => self.show_refresh,
            ToolbarAction::Copy => self.show_copy,
            ToolbarAction::Report => self.show_report,
        }
    }

    /// Whether any button is shown
    #[must_use]
    pub const fn any(&self) -> bool {
        self.show_new
            || self.show_save
            || self.show_delete
            || self.show_refresh
            || self.show_copy
            || self.show_report
    }
}

/// A toolbar button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolbarAction {
    /// Create a blank entity
    New,
    /// Persist the current entity
    Save,
    /// Delete the current entity
    Delete,
    /// Reload the current entity
    Refresh,
    /// Duplicate the current entity
    Copy,
    /// Print a report of the current entity
    Report,
}

impl ToolbarAction {
    /// Every action in display order
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Save,
        Self::Delete,
        Self::Refresh,
        Self::Copy,
        Self::Report,
    ];

    /// Button label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Save => "Save",
            Self::Delete => "Delete",
            Self::Refresh => "Refresh",
            Self::Copy => "Copy",
            Self::Report => "Report",
        }
    }

    /// Name used in request payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Save => "save",
            Self::Delete => "delete",
            Self::Refresh => "refresh",
            Self::Copy => "copy",
            Self::Report => "report",
        }
    }
}

/// Toolbar bound to the current entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedToolbar {
    visibility: ToolbarVisibility,
    has_entity: bool,
    persisted: bool,
}

impl ComposedToolbar {
    /// Toolbar with no entity selected
    #[must_use]
    pub const fn new(visibility: ToolbarVisibility) -> Self {
        Self {
            visibility,
            has_entity: false,
            persisted: false,
        }
    }

    /// Track the current entity
    pub fn update(&mut self, entity: Option<&dyn Entity>) {
        self.has_entity = entity.is_some();
        self.persisted = entity.is_some_and(Entity::is_persisted);
    }

    /// Visibility the toolbar was built with
    #[must_use]
    pub const fn visibility(&self) -> ToolbarVisibility {
        self.visibility
    }

    /// Visible actions in display order
    pub fn visible_actions(&self) -> impl Iterator<Item = ToolbarAction> + '_ {
        ToolbarAction::ALL
            .into_iter()
            .filter(|action| self.visibility.shows(*action))
    }

    /// Whether `action` is visible and applicable to the current entity
    ///
    /// Delete, refresh and copy need a persisted entity; save needs any entity.
    #[must_use]
    pub const fn is_enabled(&self, action: ToolbarAction) -> bool {
        if !self.visibility.shows(action) {
            return false;
        }
        match action {
            ToolbarAction::New => true,
            ToolbarAction::Save | ToolbarAction::Report => self.has_entity,
            ToolbarAction::Delete | ToolbarAction::Refresh | ToolbarAction::Copy => self.persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;

    #[derive(Debug, Clone, Default, crate::Entity)]
    #[entity(key = "Note", view_name = "Notes View")]
    struct Note {
        #[field(id)]
        id: Option<EntityId>,
    }

    #[test]
    fn test_default_visibility() {
        let visibility = ToolbarVisibility::default();
        assert!(visibility.show_new && visibility.show_save);
        assert!(!visibility.show_copy && !visibility.show_report);
        assert!(!ToolbarVisibility::none().any());
    }

    #[test]
    fn test_enabled_state_tracks_entity() {
        let mut toolbar = ComposedToolbar::new(ToolbarVisibility::all());
        assert!(toolbar.is_enabled(ToolbarAction::New));
        assert!(!toolbar.is_enabled(ToolbarAction::Save));

        toolbar.update(Some(&Note::default()));
        assert!(toolbar.is_enabled(ToolbarAction::Save));
        assert!(!toolbar.is_enabled(ToolbarAction::Delete));

        toolbar.update(Some(&Note { id: Some(1) }));
        assert!(toolbar.is_enabled(ToolbarAction::Delete));
        assert!(toolbar.is_enabled(ToolbarAction::Refresh));

        toolbar.update(None);
        assert!(!toolbar.is_enabled(ToolbarAction::Refresh));
    }

    #[test]
    fn test_hidden_actions_are_never_enabled() {
        let mut toolbar = ComposedToolbar::new(ToolbarVisibility::default());
        toolbar.update(Some(&Note { id: Some(1) }));
        assert!(!toolbar.is_enabled(ToolbarAction::Copy));
        assert_eq!(toolbar.visible_actions().count(), 4);
    }

    #[test]
    fn test_visibility_deserializes_with_defaults() {
        let visibility: ToolbarVisibility = toml::from_str("show_report = true").unwrap();
        assert!(visibility.show_report);
        assert!(visibility.show_new);
    }
}
