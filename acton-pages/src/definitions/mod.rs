//! Page, grid and detail definitions
//!
//! Definitions are configuration data owned by an external store. The engine
//! only reads them through [`PageDefinitionStore`]. [`InMemoryDefinitionStore`]
//! keeps them in memory and can be loaded from a TOML file:
//!
//! ```toml
//! [[pages]]
//! id = 5
//! title = "Activity Statuses"
//! grid = 10
//! detail = 20
//!
//! [[grids]]
//! id = 10
//! entity_type = "ActivityStatus"
//! columns = ["name", "sort_order"]
//!
//! [[details]]
//! id = 20
//! name = "Activity Status View"
//! entity_type = "ActivityStatus"
//! lines = [
//!     { section = "Basic" },
//!     { field = "name" },
//!     { field = "color", caption = "Colour" },
//! ]
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, ServiceError};

/// Persisted description of a page's grid and detail composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDefinition {
    /// Page id, the `page:` part of a navigation token
    pub id: u64,
    /// Page title
    pub title: String,
    /// Only authenticated actors may open the page
    #[serde(default)]
    pub requires_authentication: bool,
    /// Grid definition; `None` means the page has no master list
    #[serde(default)]
    pub grid: Option<u64>,
    /// Detail definition
    pub detail: u64,
    /// Icon name
    #[serde(default)]
    pub icon: Option<String>,
    /// Accent color
    #[serde(default)]
    pub color: Option<String>,
}

impl PageDefinition {
    /// Create a page without a grid
    #[must_use]
    pub fn new(id: u64, title: impl Into<String>, detail: u64) -> Self {
        Self {
            id,
            title: title.into(),
            requires_authentication: false,
            grid: None,
            detail,
            icon: None,
            color: None,
        }
    }

    /// Attach a grid definition
    #[must_use]
    pub const fn with_grid(mut self, grid: u64) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Require an authenticated actor
    #[must_use]
    pub const fn requiring_authentication(mut self) -> Self {
        self.requires_authentication = true;
        self
    }
}

/// Master list composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDefinition {
    /// Grid id
    pub id: u64,
    /// Entity type listed by the grid
    pub entity_type: String,
    /// Column field names in display order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Data service locator supplying the rows; the entity's own service when absent
    #[serde(default)]
    pub data_provider: Option<String>,
    /// No master list: the page edits a single entity
    #[serde(default)]
    pub attribute_none: bool,
}

impl GridDefinition {
    /// Create a grid over `entity_type` with the given columns
    #[must_use]
    pub fn new<I, S>(id: u64, entity_type: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            entity_type: entity_type.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            data_provider: None,
            attribute_none: false,
        }
    }

    /// Create a grid flagged as "no master list"
    #[must_use]
    pub fn none(id: u64, entity_type: impl Into<String>) -> Self {
        Self {
            attribute_none: true,
            ..Self::new(id, entity_type, Vec::<String>::new())
        }
    }

    /// Read rows from another registered data service
    #[must_use]
    pub fn with_data_provider(mut self, locator: impl Into<String>) -> Self {
        self.data_provider = Some(locator.into());
        self
    }
}

/// Section header line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLine {
    /// Section name
    pub section: String,
}

/// Bound field line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLine {
    /// Field path on the target entity, or on the related entity when `relation` is set
    pub field: String,
    /// Caption overriding the field's display name
    #[serde(default)]
    pub caption: Option<String>,
    /// Reference field on the target entity leading to the related entity
    #[serde(default)]
    pub relation: Option<String>,
    /// Data provider locator overriding the field's own binding
    #[serde(default)]
    pub data_provider: Option<String>,
}

impl FieldLine {
    /// Line bound to `field`
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            caption: None,
            relation: None,
            data_provider: None,
        }
    }

    /// Override the caption
    #[must_use]
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Resolve the field through a reference field
    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Bind the field to a data provider
    #[must_use]
    pub fn data_provider(mut self, locator: impl Into<String>) -> Self {
        self.data_provider = Some(locator.into());
        self
    }
}

/// One row of a detail definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailLine {
    /// Starts a new section
    Section(SectionLine),
    /// Adds a bound field to the current section
    Field(FieldLine),
}

/// Detail form composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailDefinition {
    /// Detail id
    pub id: u64,
    /// View name, matching the entity type's `VIEW_NAME`
    pub name: String,
    /// Entity type edited by the form
    pub entity_type: String,
    /// Lines in display order
    #[serde(default)]
    pub lines: Vec<DetailLine>,
}

impl DetailDefinition {
    /// Create an empty detail definition
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            entity_type: entity_type.into(),
            lines: Vec::new(),
        }
    }

    /// Append a section header
    #[must_use]
    pub fn section(mut self, name: impl Into<String>) -> Self {
        self.lines.push(DetailLine::Section(SectionLine {
            section: name.into(),
        }));
        self
    }

    /// Append a plain field line
    #[must_use]
    pub fn field(self, path: impl Into<String>) -> Self {
        self.line(FieldLine::new(path))
    }

    /// Append a configured field line
    #[must_use]
    pub fn line(mut self, line: FieldLine) -> Self {
        self.lines.push(DetailLine::Field(line));
        self
    }

    /// Field lines in order
    pub fn field_lines(&self) -> impl Iterator<Item = &FieldLine> {
        self.lines.iter().filter_map(|line| match line {
            DetailLine::Field(field) => Some(field),
            DetailLine::Section(_) => None,
        })
    }
}

/// Read access to page, grid and detail definitions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageDefinitionStore: Send + Sync {
    /// Page definition by id
    async fn page(&self, id: u64) -> Result<Option<PageDefinition>, ServiceError>;

    /// Grid definition by id
    async fn grid(&self, id: u64) -> Result<Option<GridDefinition>, ServiceError>;

    /// Detail definition by id
    async fn detail(&self, id: u64) -> Result<Option<DetailDefinition>, ServiceError>;

    /// First page whose detail definition has the given view name
    async fn page_for_view(&self, view_name: &str) -> Result<Option<PageDefinition>, ServiceError>;
}

/// Serialized form of a definitions file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDefinitions {
    /// Page definitions
    #[serde(default)]
    pub pages: Vec<PageDefinition>,
    /// Grid definitions
    #[serde(default)]
    pub grids: Vec<GridDefinition>,
    /// Detail definitions
    #[serde(default)]
    pub details: Vec<DetailDefinition>,
}

/// Definition store held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDefinitionStore {
    pages: BTreeMap<u64, PageDefinition>,
    grids: BTreeMap<u64, GridDefinition>,
    details: BTreeMap<u64, DetailDefinition>,
}

impl InMemoryDefinitionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a page definition
    #[must_use]
    pub fn with_page(mut self, page: PageDefinition) -> Self {
        self.pages.insert(page.id, page);
        self
    }

    /// Add or replace a grid definition
    #[must_use]
    pub fn with_grid(mut self, grid: GridDefinition) -> Self {
        self.grids.insert(grid.id, grid);
        self
    }

    /// Add or replace a detail definition
    #[must_use]
    pub fn with_detail(mut self, detail: DetailDefinition) -> Self {
        self.details.insert(detail.id, detail);
        self
    }

    /// Build a store from parsed definitions, rejecting duplicate ids
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Definitions`] when two definitions of the same
    /// kind share an id.
    pub fn from_definitions(definitions: PageDefinitions) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        for page in definitions.pages {
            let id = page.id;
            if store.pages.insert(id, page).is_some() {
                return Err(ConfigError::Definitions(format!("duplicate page id {id}")));
            }
        }
        for grid in definitions.grids {
            let id = grid.id;
            if store.grids.insert(id, grid).is_some() {
                return Err(ConfigError::Definitions(format!("duplicate grid id {id}")));
            }
        }
        for detail in definitions.details {
            let id = detail.id;
            if store.details.insert(id, detail).is_some() {
                return Err(ConfigError::Definitions(format!("duplicate detail id {id}")));
            }
        }
        Ok(store)
    }

    /// Parse definitions from TOML
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Definitions`] for invalid TOML or duplicate ids.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let definitions: PageDefinitions =
            toml::from_str(source).map_err(|e| ConfigError::Definitions(e.to_string()))?;
        Self::from_definitions(definitions)
    }

    /// Load definitions from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Definitions`] if the file cannot be read or parsed.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Definitions(format!("{}: {e}", path.display())))?;
        let store = Self::from_toml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            pages = store.pages.len(),
            "Loaded page definitions"
        );
        Ok(store)
    }

    /// Check that every page points at existing grid and detail definitions
    ///
    /// # Errors
    ///
    /// Returns the first missing reference found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for page in self.pages.values() {
            if !self.details.contains_key(&page.detail) {
                return Err(ConfigError::MissingDetailDefinition(page.detail));
            }
            if let Some(grid) = page.grid {
                if !self.grids.contains_key(&grid) {
                    return Err(ConfigError::MissingGridDefinition(grid));
                }
            }
        }
        Ok(())
    }

    /// Number of page definitions
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Entity type keys referenced by any grid or detail definition, sorted
    #[must_use]
    pub fn entity_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .grids
            .values()
            .map(|grid| grid.entity_type.as_str())
            .chain(self.details.values().map(|detail| detail.entity_type.as_str()))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

#[async_trait]
impl PageDefinitionStore for InMemoryDefinitionStore {
    async fn page(&self, id: u64) -> Result<Option<PageDefinition>, ServiceError> {
        Ok(self.pages.get(&id).cloned())
    }

    async fn grid(&self, id: u64) -> Result<Option<GridDefinition>, ServiceError> {
        Ok(self.grids.get(&id).cloned())
    }

    async fn detail(&self, id: u64) -> Result<Option<DetailDefinition>, ServiceError> {
        Ok(self.details.get(&id).cloned())
    }

    async fn page_for_view(&self, view_name: &str) -> Result<Option<PageDefinition>, ServiceError> {
        Ok(self
            .pages
            .values()
            .find(|page| {
                self.details
                    .get(&page.detail)
                    .is_some_and(|detail| detail.name == view_name)
            })
            .cloned())
    }
}
