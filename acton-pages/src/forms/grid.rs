//! Master list layout

use serde::Serialize;

use crate::model::{BoxedEntity, EntityId, SemanticType};

/// One grid column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridColumn {
    /// Field name
    pub field: String,
    /// Header caption
    pub caption: String,
    /// Semantic type of the field
    pub semantic: SemanticType,
}

/// Validated column layout of a grid definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    /// Grid definition id
    pub grid_id: u64,
    /// Entity type listed
    pub entity_type: &'static str,
    /// Columns in display order
    pub columns: Vec<GridColumn>,
}

/// One rendered grid row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    /// Id of the row's entity
    pub id: Option<EntityId>,
    /// Cell texts, one per column
    pub cells: Vec<String>,
}

impl GridLayout {
    /// Cell texts of the loaded entities
    #[must_use]
    pub fn rows(&self, entities: &[BoxedEntity]) -> Vec<GridRow> {
        entities
            .iter()
            .map(|entity| GridRow {
                id: entity.id(),
                cells: self
                    .columns
                    .iter()
                    .map(|column| {
                        entity
                            .field_value(&column.field)
                            .map(|value| value.to_string())
                            .unwrap_or_default()
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Grid with its rows and selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedGrid {
    /// Column layout
    pub layout: GridLayout,
    /// Rows in display order
    pub rows: Vec<GridRow>,
    /// Index of the selected row
    pub selected: Option<usize>,
}

impl ComposedGrid {
    /// Grid with no rows loaded yet
    #[must_use]
    pub const fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            rows: Vec::new(),
            selected: None,
        }
    }

    /// Replace the rows, keeping the selection on the same id when possible
    pub fn load(&mut self, entities: &[BoxedEntity]) {
        let selected_id = self.selected_id();
        self.rows = self.layout.rows(entities);
        self.select_id(selected_id);
    }

    /// Select the row with this id, or clear the selection
    pub fn select_id(&mut self, id: Option<EntityId>) {
        self.selected = id.and_then(|id| self.rows.iter().position(|row| row.id == Some(id)));
    }

    /// Id of the selected row
    #[must_use]
    pub fn selected_id(&self) -> Option<EntityId> {
        self.selected
            .and_then(|index| self.rows.get(index))
            .and_then(|row| row.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, crate::Entity)]
    #[entity(key = "Label", view_name = "Labels View")]
    struct Label {
        #[field(id)]
        id: Option<EntityId>,
        name: String,
        archived: bool,
    }

    fn layout() -> GridLayout {
        GridLayout {
            grid_id: 1,
            entity_type: "Label",
            columns: vec![
                GridColumn {
                    field: "name".to_string(),
                    caption: "Name".to_string(),
                    semantic: SemanticType::Text,
                },
                GridColumn {
                    field: "archived".to_string(),
                    caption: "Archived".to_string(),
                    semantic: SemanticType::Boolean,
                },
            ],
        }
    }

    fn rows() -> Vec<BoxedEntity> {
        vec![
            Box::new(Label {
                id: Some(1),
                name: "Red".to_string(),
                archived: false,
            }),
            Box::new(Label {
                id: Some(2),
                name: "Blue".to_string(),
                archived: true,
            }),
        ]
    }

    #[test]
    fn test_rows_render_cells_in_column_order() {
        let rows = layout().rows(&rows());
        assert_eq!(rows[1].id, Some(2));
        assert_eq!(rows[1].cells, vec!["Blue", "Yes"]);
    }

    #[test]
    fn test_reload_keeps_selection_by_id() {
        let mut grid = ComposedGrid::new(layout());
        grid.load(&rows());
        grid.select_id(Some(2));
        assert_eq!(grid.selected, Some(1));

        let mut reloaded = rows();
        reloaded.remove(0);
        grid.load(&reloaded);
        assert_eq!(grid.selected, Some(0));
        assert_eq!(grid.selected_id(), Some(2));

        grid.select_id(Some(99));
        assert_eq!(grid.selected, None);
    }
}
