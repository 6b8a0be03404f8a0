//! CRUD lifecycle coordination
//!
//! A [`CrudCoordinator`] owns the [`CrudContext`] of one page session and
//! drives create, select, save, delete and refresh against the entity type's
//! data service. Validation failures and blocked deletes are returned as data
//! ([`SaveOutcome::Invalid`], [`DeleteOutcome::Blocked`]); only configuration
//! and data-layer failures are errors.
//!
//! ```rust,ignore
//! let mut router = engine.router();
//! router.navigate("page:5&item:42", &Actor::Anonymous).await?;
//!
//! let crud = router.coordinator_mut().unwrap();
//! crud.set_input("name", "Blocked")?;
//! match crud.save().await? {
//!     SaveOutcome::Saved { id } => println!("saved #{id}"),
//!     SaveOutcome::Invalid(errors) => println!("{errors}"),
//! }
//! ```

mod capabilities;
mod events;

pub use capabilities::{perform, ActionOutcome, Creatable, Deletable, Refreshable, Savable};
pub use events::{
    ContentOwner, Notification, NotificationLevel, Notifier, RecordingNotifier, TracingNotifier,
};

use std::fmt;
use std::sync::Arc;

use crate::definitions::DetailDefinition;
use crate::error::{ConfigError, CrudError, ServiceError};
use crate::forms::{
    ComposeOutcome, ComposedForm, ComposedGrid, ComposedToolbar, FormKey, GridLayout,
    ToolbarVisibility, ValidationErrors,
};
use crate::model::{BoxedEntity, Entity, EntityId, FieldValue};
use crate::registry::{DynDataService, EntityTypeDescriptor, NOT_PERSISTED_MESSAGE};
use crate::state::PageEngine;

/// Mutable state of one page session
///
/// Holds the memoized form and its key, the toolbar, the selected entity and
/// the loaded grid rows. Only the owning coordinator mutates it.
#[derive(Debug, Default)]
pub struct CrudContext {
    pub(crate) form_key: Option<FormKey>,
    pub(crate) form: Option<ComposedForm>,
    pub(crate) toolbar: Option<ComposedToolbar>,
    current: Option<BoxedEntity>,
    rows: Vec<BoxedEntity>,
    grid: Option<ComposedGrid>,
}

impl CrudContext {
    /// Key of the current form
    #[must_use]
    pub const fn form_key(&self) -> Option<FormKey> {
        self.form_key
    }

    /// Current detail form
    #[must_use]
    pub const fn form(&self) -> Option<&ComposedForm> {
        self.form.as_ref()
    }

    /// Current detail form, mutably
    pub fn form_mut(&mut self) -> Option<&mut ComposedForm> {
        self.form.as_mut()
    }

    /// Current toolbar
    #[must_use]
    pub const fn toolbar(&self) -> Option<&ComposedToolbar> {
        self.toolbar.as_ref()
    }

    /// Selected entity
    #[must_use]
    pub fn current(&self) -> Option<&dyn Entity> {
        self.current.as_deref()
    }

    /// Id of the selected entity
    #[must_use]
    pub fn current_id(&self) -> Option<EntityId> {
        self.current.as_ref().and_then(|entity| entity.id())
    }

    /// Loaded rows in service order
    #[must_use]
    pub fn rows(&self) -> &[BoxedEntity] {
        &self.rows
    }

    /// Master grid, when the page has one
    #[must_use]
    pub const fn grid(&self) -> Option<&ComposedGrid> {
        self.grid.as_ref()
    }

    fn clear_detail(&mut self) {
        self.form = None;
        self.form_key = None;
        self.current = None;
        if let Some(toolbar) = self.toolbar.as_mut() {
            toolbar.update(None);
        }
        if let Some(grid) = self.grid.as_mut() {
            grid.select_id(None);
        }
    }
}

/// Result of a selection change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Form kept, values rebound
    Reused,
    /// New form built
    Rebuilt,
    /// Detail area cleared
    Cleared,
}

impl From<ComposeOutcome> for SelectOutcome {
    fn from(outcome: ComposeOutcome) -> Self {
        match outcome {
            ComposeOutcome::Reused => Self::Reused,
            ComposeOutcome::Rebuilt => Self::Rebuilt,
        }
    }
}

/// Result of [`CrudCoordinator::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Entity persisted under this id
    Saved {
        /// Id of the persisted entity
        id: EntityId,
    },
    /// Nothing persisted; per-field problems
    Invalid(ValidationErrors),
}

/// Result of [`CrudCoordinator::delete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Entity removed
    Deleted {
        /// Id of the removed entity
        id: EntityId,
        /// Id of the entity selected afterwards
        next: Option<EntityId>,
    },
    /// Delete refused; nothing changed
    Blocked {
        /// Base-link reason, or every service-link reason joined by line breaks
        reason: String,
    },
}

/// Drives the CRUD lifecycle of one page session
pub struct CrudCoordinator {
    engine: PageEngine,
    page_id: u64,
    detail: DetailDefinition,
    descriptor: Arc<EntityTypeDescriptor>,
    row_source: Arc<dyn DynDataService>,
    visibility: ToolbarVisibility,
    single_entity: bool,
    context: CrudContext,
    owner: Option<Arc<dyn ContentOwner>>,
}

impl CrudCoordinator {
    /// Coordinator for a page without a master grid
    ///
    /// The toolbar visibility comes from the type's page behavior, falling
    /// back to the configured default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredEntityType`] when the detail's
    /// entity type is not registered.
    pub fn new(engine: PageEngine, page_id: u64, detail: DetailDefinition) -> Result<Self, ConfigError> {
        let descriptor = engine.registry().resolve(&detail.entity_type)?;
        let visibility = descriptor
            .page_behavior()
            .toolbar()
            .unwrap_or(engine.config().toolbar);
        let row_source = Arc::clone(descriptor.data_service());
        Ok(Self {
            engine,
            page_id,
            detail,
            descriptor,
            row_source,
            visibility,
            single_entity: true,
            context: CrudContext::default(),
            owner: None,
        })
    }

    /// List rows from `row_source` instead of the type's own data service
    ///
    /// Switches the coordinator to list selection rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EntityTypeMismatch`] when the source lists
    /// another entity type than the detail form edits.
    pub fn with_row_source(mut self, row_source: Arc<dyn DynDataService>) -> Result<Self, ConfigError> {
        self.expect_type(row_source.entity_type())?;
        self.row_source = row_source;
        self.single_entity = false;
        Ok(self)
    }

    /// Show a master grid with this layout
    ///
    /// Switches the coordinator to list selection rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EntityTypeMismatch`] when the grid lists
    /// another entity type than the detail form edits.
    pub fn with_grid(mut self, layout: GridLayout) -> Result<Self, ConfigError> {
        self.expect_type(layout.entity_type)?;
        self.context.grid = Some(ComposedGrid::new(layout));
        self.single_entity = false;
        Ok(self)
    }

    /// Use list selection rules without a grid
    #[must_use]
    pub const fn listing(mut self) -> Self {
        self.single_entity = false;
        self
    }

    fn expect_type(&self, actual: &str) -> Result<(), ConfigError> {
        let expected = self.descriptor.entity_type_key();
        if actual == expected {
            Ok(())
        } else {
            Err(ConfigError::EntityTypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }

    /// Tell `owner` about lifecycle events
    #[must_use]
    pub fn with_owner(mut self, owner: Arc<dyn ContentOwner>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Page the coordinator belongs to
    #[must_use]
    pub const fn page_id(&self) -> u64 {
        self.page_id
    }

    /// Descriptor of the edited entity type
    #[must_use]
    pub fn descriptor(&self) -> &EntityTypeDescriptor {
        &self.descriptor
    }

    /// Detail definition of the form
    #[must_use]
    pub const fn detail(&self) -> &DetailDefinition {
        &self.detail
    }

    /// Whether the page edits one entity without a master list
    #[must_use]
    pub const fn is_single_entity(&self) -> bool {
        self.single_entity
    }

    /// Session state
    #[must_use]
    pub const fn context(&self) -> &CrudContext {
        &self.context
    }

    /// Selected entity
    #[must_use]
    pub fn current(&self) -> Option<&dyn Entity> {
        self.context.current()
    }

    /// Current detail form
    #[must_use]
    pub const fn form(&self) -> Option<&ComposedForm> {
        self.context.form()
    }

    /// Reload the rows from the row source
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Service`] when listing fails.
    pub async fn load_rows(&mut self) -> Result<usize, CrudError> {
        let rows = self
            .row_source
            .list()
            .await
            .inspect_err(|err| self.log_failure("load_rows", err))?;
        if let Some(grid) = self.context.grid.as_mut() {
            grid.load(&rows);
        }
        self.context.rows = rows;
        Ok(self.context.rows.len())
    }

    /// Show `entity` in the detail form, or clear the detail area with `None`
    ///
    /// The form is reused when the entity's `(type, view)` key matches the
    /// current form; otherwise it is rebuilt. Options and related entities
    /// are loaded before anything is installed, so on error the previous
    /// form, toolbar, grid selection and entity stay as they were.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Config`] when the form cannot be composed and
    /// [`CrudError::Service`] when options or related entities fail to load.
    pub async fn select(&mut self, entity: Option<BoxedEntity>) -> Result<SelectOutcome, CrudError> {
        let Some(entity) = entity else {
            self.context.clear_detail();
            tracing::debug!(page = self.page_id, "Detail cleared");
            return Ok(SelectOutcome::Cleared);
        };
        let expected = self.descriptor.entity_type_key();
        self.expect_type(entity.entity_key())
            .inspect_err(|err| self.log_failure("select", err))?;

        let mut staged = self
            .engine
            .composer()
            .stage(&self.context, &self.detail, entity.as_ref(), self.visibility)
            .inspect_err(|err| self.log_failure("select", err))?;
        if self.engine.config().composer.load_options {
            if let Some(form) = staged.form_mut() {
                form.load_options()
                    .await
                    .inspect_err(|err| self.log_failure("select", err))?;
            }
        }
        let relations: Vec<String> = staged
            .form()
            .or_else(|| self.context.form())
            .map(|form| form.relations().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        let related = self
            .load_related(entity.as_ref(), relations)
            .await
            .inspect_err(|err| self.log_failure("select", err))?;

        let outcome = staged.install(&mut self.context, entity.as_ref());
        if let Some(form) = self.context.form.as_mut() {
            for (relation, related) in &related {
                form.bind_related(relation, related.as_deref());
            }
        }
        if let Some(grid) = self.context.grid.as_mut() {
            grid.select_id(entity.id());
        }
        tracing::debug!(
            page = self.page_id,
            entity_type = expected,
            id = ?entity.id(),
            ?outcome,
            "Entity selected"
        );
        self.context.current = Some(entity);
        Ok(outcome.into())
    }

    async fn load_related(
        &self,
        entity: &dyn Entity,
        relations: Vec<String>,
    ) -> Result<Vec<(String, Option<BoxedEntity>)>, CrudError> {
        let mut loaded = Vec::with_capacity(relations.len());
        for relation in relations {
            let reference = self
                .engine
                .introspector()
                .field(entity.entity_key(), &relation)?;
            let related = match (entity.field_value(&relation), reference.reference_target) {
                (Some(FieldValue::Reference(id)), Some(target)) => {
                    let descriptor = self.engine.registry().resolve(target)?;
                    descriptor.data_service().get_by_id(id).await?
                }
                _ => None,
            };
            loaded.push((relation, related));
        }
        Ok(loaded)
    }

    /// Select the row with `id`, loading it from the service if needed
    ///
    /// An id that no longer resolves falls back to the default selection.
    ///
    /// # Errors
    ///
    /// See [`CrudCoordinator::select`].
    pub async fn select_by_id(&mut self, id: EntityId) -> Result<SelectOutcome, CrudError> {
        let loaded = self
            .context
            .rows
            .iter()
            .find(|row| row.id() == Some(id))
            .map(|row| row.clone_entity());
        let entity = match loaded {
            Some(entity) => Some(entity),
            None => self.row_source.get_by_id(id).await?,
        };
        match entity {
            Some(entity) => self.select(Some(entity)).await,
            None => {
                tracing::warn!(
                    page = self.page_id,
                    entity_type = self.descriptor.entity_type_key(),
                    id,
                    "Requested item not found, using default selection"
                );
                self.select_default().await
            }
        }
    }

    /// Select the variant's default entity
    ///
    /// Single-entity pages use the page behavior's locate rule and fall back
    /// to a new entity; list pages use the data service's default selection
    /// and clear the detail area when it picks nothing. An empty row set
    /// always yields a new blank entity.
    ///
    /// # Errors
    ///
    /// See [`CrudCoordinator::select`].
    pub async fn select_default(&mut self) -> Result<SelectOutcome, CrudError> {
        let rows = &self.context.rows;
        if rows.is_empty() {
            let entity = self.descriptor.new_entity()?;
            return self.select(Some(entity)).await;
        }

        let index = if self.single_entity {
            self.descriptor.page_behavior().locate_single(rows)
        } else {
            self.row_source.default_selection(rows)
        };
        let chosen = index
            .and_then(|index| rows.get(index))
            .map(|row| row.clone_entity());
        match chosen {
            Some(entity) => self.select(Some(entity)).await,
            None if self.single_entity => {
                let entity = self.descriptor.new_entity()?;
                self.select(Some(entity)).await
            }
            None => self.select(None).await,
        }
    }

    /// Select a new blank entity with the type's defaults
    ///
    /// # Errors
    ///
    /// See [`CrudCoordinator::select`].
    pub async fn create(&mut self) -> Result<SelectOutcome, CrudError> {
        let entity = self
            .descriptor
            .new_entity()
            .inspect_err(|err| self.log_failure("create", err))?;
        let outcome = self.select(Some(entity)).await?;

        if let (Some(owner), Some(current)) = (&self.owner, self.context.current()) {
            owner.on_entity_created(current);
        }
        self.engine.notify(&Notification::info(format!(
            "New {} created. Fill in the details and click Save.",
            self.descriptor.singular_title()
        )));
        Ok(outcome)
    }

    /// Record raw input for a form field
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::NoSelection`] without a form and
    /// [`CrudError::Config`] for unknown field paths.
    pub fn set_input(&mut self, path: &str, raw: impl Into<String>) -> Result<(), CrudError> {
        let form = self.context.form.as_mut().ok_or(CrudError::NoSelection)?;
        form.set_input(path, raw)?;
        Ok(())
    }

    /// Validate and persist the form's input
    ///
    /// Input is written into a working copy; the selected entity and the
    /// stored data stay untouched unless every check passes.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::NoSelection`] without a selected entity and
    /// [`CrudError::Service`] when the data service fails.
    pub async fn save(&mut self) -> Result<SaveOutcome, CrudError> {
        let (Some(current), Some(form)) = (self.context.current.as_ref(), self.context.form.as_ref()) else {
            self.engine
                .notify(&Notification::error("Cannot save: No entity selected."));
            return Err(CrudError::NoSelection);
        };
        let mut working = current.clone_entity();
        let mut errors = form.write_back(working.as_mut());

        let service = self.engine.registry().resolve_data_service(working.as_ref())?;
        if !errors.has_errors() {
            errors = service
                .check_save_allowed(working.as_ref())
                .await
                .inspect_err(|err| self.log_failure("save", err))?;
        }
        if errors.has_errors() {
            tracing::debug!(
                page = self.page_id,
                entity_type = working.entity_key(),
                errors = errors.count(),
                "Save rejected by validation"
            );
            self.engine
                .notify(&Notification::warning(format!("Validation failed: {errors}")));
            if let Some(form) = self.context.form.as_mut() {
                form.set_errors(errors.clone());
            }
            return Ok(SaveOutcome::Invalid(errors));
        }

        let saved = service
            .save(working)
            .await
            .inspect_err(|err| self.log_failure("save", err))?;
        let id = saved.id().ok_or_else(|| {
            ServiceError::Storage(format!("saved {} has no id", saved.entity_key()))
        })?;
        tracing::info!(page = self.page_id, entity_type = saved.entity_key(), id, "Entity saved");

        self.load_rows().await?;
        self.select(Some(saved.clone_entity())).await?;
        if let Some(owner) = &self.owner {
            owner.on_entity_saved(saved.as_ref());
        }
        self.engine
            .notify(&Notification::success("Data saved successfully"));
        Ok(SaveOutcome::Saved { id })
    }

    /// Delete the selected entity if the delete chain allows it
    ///
    /// On success the row now at the deleted row's position is selected
    /// (clamped to the last row); with no rows left the detail is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Service`] when a check or the delete fails.
    pub async fn delete(&mut self) -> Result<DeleteOutcome, CrudError> {
        let Some(current) = self.context.current.as_ref() else {
            return Ok(self.blocked(NOT_PERSISTED_MESSAGE.to_string()));
        };
        let service = self.engine.registry().resolve_data_service(current.as_ref())?;
        let verdict = service
            .check_delete_allowed(current.as_ref())
            .await
            .inspect_err(|err| self.log_failure("delete", err))?;
        if let Some(reason) = verdict {
            return Ok(self.blocked(reason));
        }
        let Some(id) = current.id() else {
            return Ok(self.blocked(NOT_PERSISTED_MESSAGE.to_string()));
        };

        let deleted = current.clone_entity();
        let position = self.context.rows.iter().position(|row| row.id() == Some(id));
        service
            .delete(id)
            .await
            .inspect_err(|err| self.log_failure("delete", err))?;
        tracing::info!(page = self.page_id, entity_type = deleted.entity_key(), id, "Entity deleted");

        self.load_rows().await?;
        let rows = &self.context.rows;
        let next = rows
            .len()
            .checked_sub(1)
            .and_then(|last| rows.get(position.unwrap_or(0).min(last)))
            .map(|row| row.clone_entity());
        let next_id = next.as_ref().and_then(|entity| entity.id());
        self.select(next).await?;

        if let Some(owner) = &self.owner {
            owner.on_entity_deleted(deleted.as_ref());
        }
        self.engine
            .notify(&Notification::success("Entity deleted successfully"));
        Ok(DeleteOutcome::Deleted { id, next: next_id })
    }

    fn blocked(&self, reason: String) -> DeleteOutcome {
        tracing::debug!(
            page = self.page_id,
            entity_type = self.descriptor.entity_type_key(),
            %reason,
            "Delete blocked"
        );
        self.engine.notify(&Notification::warning(reason.clone()));
        DeleteOutcome::Blocked { reason }
    }

    /// Reload the rows and the selected entity
    ///
    /// A selected entity that vanished falls back to the first remaining
    /// row; an unsaved one is simply rebound.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Service`] when reloading fails.
    pub async fn refresh(&mut self) -> Result<SelectOutcome, CrudError> {
        self.load_rows().await?;
        let reloaded = match self.context.current_id() {
            Some(id) => {
                let found = self.row_source.get_by_id(id).await?;
                if found.is_none() {
                    tracing::warn!(
                        page = self.page_id,
                        entity_type = self.descriptor.entity_type_key(),
                        id,
                        "Selected entity vanished, selecting first row"
                    );
                }
                found.or_else(|| self.context.rows.first().map(|row| row.clone_entity()))
            }
            None => self.context.current.as_ref().map(|entity| entity.clone_entity()),
        };
        let outcome = match reloaded {
            Some(entity) => self.select(Some(entity)).await?,
            None => self.select_default().await?,
        };

        if let (Some(owner), Some(current)) = (&self.owner, self.context.current()) {
            owner.on_entity_refreshed(current);
        }
        self.engine
            .notify(&Notification::success("Data refreshed successfully"));
        Ok(outcome)
    }

    fn log_failure(&self, operation: &'static str, err: &dyn std::error::Error) {
        tracing::error!(
            page = self.page_id,
            entity_type = self.descriptor.entity_type_key(),
            operation,
            error = %err,
            "CRUD operation failed"
        );
    }
}

impl fmt::Debug for CrudCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudCoordinator")
            .field("page_id", &self.page_id)
            .field("entity_type", &self.descriptor.entity_type_key())
            .field("single_entity", &self.single_entity)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
