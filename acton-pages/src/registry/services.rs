//! Typed service capabilities and their type-erased adapters
//!
//! Applications implement [`DataService<T>`], [`PageBehavior<T>`] and
//! optionally [`Initializer<T>`] for each entity type. The registry stores
//! them behind the `Dyn*` traits so the engine can drive any registered type
//! through [`BoxedEntity`] values.

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ConfigError, ServiceError};
use crate::forms::{ToolbarVisibility, ValidationErrors};
use crate::model::{downcast, downcast_mut, downcast_ref, BoxedEntity, Entity, EntityId, EntityType};

/// Message of the base delete link for unsaved entities
pub const NOT_PERSISTED_MESSAGE: &str = "Cannot delete: No entity selected or entity not saved yet.";

/// Message of the base delete link for flagged records
pub const NON_DELETABLE_MESSAGE: &str = "Cannot delete: This record is marked as non-deletable";

/// Persistence and business rules for one entity type
#[async_trait]
pub trait DataService<T: EntityType>: Send + Sync + 'static {
    /// Blank entity used by "create"
    fn new_entity(&self) -> T {
        T::default()
    }

    /// All rows, in display order
    async fn list(&self) -> Result<Vec<T>, ServiceError>;

    /// Single row by id
    async fn get_by_id(&self, id: EntityId) -> Result<Option<T>, ServiceError>;

    /// Persist the entity and return the stored version
    async fn save(&self, entity: T) -> Result<T, ServiceError>;

    /// Remove the row with this id
    async fn delete(&self, id: EntityId) -> Result<(), ServiceError>;

    /// Append type-specific links to the delete-permission chain
    ///
    /// The chain passed in already holds the base links. Services can only
    /// append, so an inherited rejection can never be relaxed.
    fn delete_checks(&self, chain: DeleteChain<T>) -> DeleteChain<T> {
        chain
    }

    /// Type-specific save validation, run after the required-field check passed
    async fn validate_save(
        &self,
        entity: &T,
        errors: &mut ValidationErrors,
    ) -> Result<(), ServiceError> {
        let _ = (entity, errors);
        Ok(())
    }

    /// Row selected when a page opens without an explicit item
    fn default_selection(&self, rows: &[&T]) -> Option<usize> {
        (!rows.is_empty()).then_some(0)
    }
}

/// Page-level presentation rules for one entity type
pub trait PageBehavior<T: EntityType>: Send + Sync + 'static {
    /// Which toolbar buttons the page shows; `None` uses the configured default
    fn toolbar(&self) -> Option<ToolbarVisibility> {
        None
    }

    /// Row shown by a single-entity edit page
    fn locate_single(&self, rows: &[&T]) -> Option<usize> {
        (!rows.is_empty()).then_some(0)
    }

    /// Caption for the detail area
    fn caption(&self, entity: &T) -> String {
        entity.display_label()
    }
}

/// Presentation rules used when a type registers no page behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPageBehavior;

impl<T: EntityType> PageBehavior<T> for DefaultPageBehavior {}

/// New-entity defaults and sample rows for one entity type
pub trait Initializer<T: EntityType>: Send + Sync + 'static {
    /// Apply defaults to a freshly created entity
    fn initialize(&self, entity: &mut T) {
        let _ = entity;
    }

    /// Rows inserted when sample data seeding is enabled
    fn sample_data(&self) -> Vec<T> {
        Vec::new()
    }
}

/// One link of the delete-permission chain
#[async_trait]
pub trait DeleteCheck<T: EntityType>: Send + Sync {
    /// Link name, used in logs
    fn name(&self) -> &'static str;

    /// Reason the entity cannot be deleted, or `None`
    async fn check(&self, entity: &T) -> Result<Option<String>, ServiceError>;
}

struct PersistedCheck;

#[async_trait]
impl<T: EntityType> DeleteCheck<T> for PersistedCheck {
    fn name(&self) -> &'static str {
        "persisted"
    }

    async fn check(&self, entity: &T) -> Result<Option<String>, ServiceError> {
        Ok(entity
            .entity_id()
            .is_none()
            .then(|| NOT_PERSISTED_MESSAGE.to_string()))
    }
}

struct NonDeletableCheck;

#[async_trait]
impl<T: EntityType> DeleteCheck<T> for NonDeletableCheck {
    fn name(&self) -> &'static str {
        "non_deletable"
    }

    async fn check(&self, entity: &T) -> Result<Option<String>, ServiceError> {
        Ok(entity
            .non_deletable()
            .then(|| NON_DELETABLE_MESSAGE.to_string()))
    }
}

struct FnCheck<F> {
    name: &'static str,
    check: F,
}

#[async_trait]
impl<T, F> DeleteCheck<T> for FnCheck<F>
where
    T: EntityType,
    F: Fn(&T) -> Option<String> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn check(&self, entity: &T) -> Result<Option<String>, ServiceError> {
        Ok((self.check)(entity))
    }
}

/// Separator between the reasons of service links in one rejection
pub const REASON_SEPARATOR: &str = "\n";

/// Ordered delete-permission links
///
/// Every chain starts from [`DeleteChain::base`]; there is no way to remove a
/// link once added. A base rejection ends the evaluation. Past the base links
/// every link runs and the rejections are reported together.
pub struct DeleteChain<T: EntityType> {
    links: Vec<Arc<dyn DeleteCheck<T>>>,
    base_len: usize,
}

impl<T: EntityType> DeleteChain<T> {
    /// Chain holding the base links: entity persisted, entity not flagged non-deletable
    #[must_use]
    pub fn base() -> Self {
        let links: Vec<Arc<dyn DeleteCheck<T>>> =
            vec![Arc::new(PersistedCheck), Arc::new(NonDeletableCheck)];
        Self {
            base_len: links.len(),
            links,
        }
    }

    /// Append a link
    #[must_use]
    pub fn then(mut self, link: impl DeleteCheck<T> + 'static) -> Self {
        self.links.push(Arc::new(link));
        self
    }

    /// Append a synchronous link
    #[must_use]
    pub fn then_fn<F>(self, name: &'static str, check: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        self.then(FnCheck { name, check })
    }

    /// Link names in evaluation order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.links.iter().map(|link| link.name()).collect()
    }

    /// Rejection reason, or `None` when every link allows the delete
    ///
    /// A base rejection is returned alone. Rejections of later links are
    /// joined with [`REASON_SEPARATOR`] in link order.
    ///
    /// # Errors
    ///
    /// Propagates the first [`ServiceError`] raised by a link.
    pub async fn evaluate(&self, entity: &T) -> Result<Option<String>, ServiceError> {
        let (base, specific) = self.links.split_at(self.base_len);
        for link in base {
            if let Some(reason) = link.check(entity).await? {
                tracing::debug!(
                    entity_type = T::ENTITY_KEY,
                    link = link.name(),
                    "Delete rejected by base link"
                );
                return Ok(Some(reason));
            }
        }

        let mut reasons = Vec::new();
        for link in specific {
            if let Some(reason) = link.check(entity).await? {
                tracing::debug!(
                    entity_type = T::ENTITY_KEY,
                    link = link.name(),
                    "Delete rejected"
                );
                reasons.push(reason);
            }
        }
        Ok((!reasons.is_empty()).then(|| reasons.join(REASON_SEPARATOR)))
    }
}

impl<T: EntityType> Default for DeleteChain<T> {
    fn default() -> Self {
        Self::base()
    }
}

impl<T: EntityType> std::fmt::Debug for DeleteChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteChain")
            .field("links", &self.names())
            .finish()
    }
}

/// Required fields that hold no value
///
/// Read-only and hidden fields are never filled in by users, so they are not
/// checked.
#[must_use]
pub fn required_field_errors<T: EntityType>(entity: &T) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let mut seen = std::collections::HashSet::new();
    for model in T::field_models() {
        if !seen.insert(model.name) || !model.required || model.read_only || model.hidden {
            continue;
        }
        let empty = entity
            .read_field(model.name)
            .is_none_or(|value| value.is_empty());
        if empty {
            let label = model
                .label
                .map_or_else(|| crate::introspect::default_label(model.name), str::to_string);
            errors.add_with_code(model.name, format!("{label} is required"), "required");
        }
    }
    errors
}

/// Type-erased [`DataService`]
#[async_trait]
pub trait DynDataService: Send + Sync {
    /// Entity type key served
    fn entity_type(&self) -> &'static str;

    /// Blank entity with the initializer not yet applied
    fn new_entity(&self) -> BoxedEntity;

    /// All rows
    async fn list(&self) -> Result<Vec<BoxedEntity>, ServiceError>;

    /// Single row by id
    async fn get_by_id(&self, id: EntityId) -> Result<Option<BoxedEntity>, ServiceError>;

    /// Persist and return the stored version
    async fn save(&self, entity: BoxedEntity) -> Result<BoxedEntity, ServiceError>;

    /// Remove by id
    async fn delete(&self, id: EntityId) -> Result<(), ServiceError>;

    /// Run the full delete-permission chain
    async fn check_delete_allowed(&self, entity: &dyn Entity) -> Result<Option<String>, ServiceError>;

    /// Run the required-field check, then the type-specific validation
    async fn check_save_allowed(&self, entity: &dyn Entity) -> Result<ValidationErrors, ServiceError>;

    /// Index of the default row
    fn default_selection(&self, rows: &[BoxedEntity]) -> Option<usize>;
}

/// Type-erased [`PageBehavior`]
pub trait DynPageBehavior: Send + Sync {
    /// Toolbar visibility, if the type overrides the configured default
    fn toolbar(&self) -> Option<ToolbarVisibility>;

    /// Row shown by a single-entity edit page
    fn locate_single(&self, rows: &[BoxedEntity]) -> Option<usize>;

    /// Caption for the detail area
    fn caption(&self, entity: &dyn Entity) -> String;
}

/// Type-erased [`Initializer`]
pub trait DynInitializer: Send + Sync {
    /// Apply new-entity defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EntityTypeMismatch`] for entities of another type.
    fn initialize(&self, entity: &mut dyn Entity) -> Result<(), ConfigError>;

    /// Sample rows
    fn sample_data(&self) -> Vec<BoxedEntity>;
}

fn mismatch<T: EntityType>(actual: &str) -> ServiceError {
    ServiceError::Storage(
        ConfigError::EntityTypeMismatch {
            expected: T::ENTITY_KEY.to_string(),
            actual: actual.to_string(),
        }
        .to_string(),
    )
}

fn typed_rows<T: EntityType>(rows: &[BoxedEntity]) -> Vec<&T> {
    rows.iter()
        .filter_map(|row| downcast_ref::<T>(row.as_ref()))
        .collect()
}

pub(crate) struct DataServiceAdapter<T, S> {
    service: Arc<S>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> DataServiceAdapter<T, S> {
    pub(crate) const fn new(service: Arc<S>) -> Self {
        Self {
            service,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T, S> DynDataService for DataServiceAdapter<T, S>
where
    T: EntityType,
    S: DataService<T>,
{
    fn entity_type(&self) -> &'static str {
        T::ENTITY_KEY
    }

    fn new_entity(&self) -> BoxedEntity {
        Box::new(self.service.new_entity())
    }

    async fn list(&self) -> Result<Vec<BoxedEntity>, ServiceError> {
        Ok(self
            .service
            .list()
            .await?
            .into_iter()
            .map(|row| Box::new(row) as BoxedEntity)
            .collect())
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<BoxedEntity>, ServiceError> {
        Ok(self
            .service
            .get_by_id(id)
            .await?
            .map(|row| Box::new(row) as BoxedEntity))
    }

    async fn save(&self, entity: BoxedEntity) -> Result<BoxedEntity, ServiceError> {
        let typed = downcast::<T>(entity).map_err(mismatch::<T>)?;
        Ok(Box::new(self.service.save(typed).await?))
    }

    async fn delete(&self, id: EntityId) -> Result<(), ServiceError> {
        self.service.delete(id).await
    }

    async fn check_delete_allowed(&self, entity: &dyn Entity) -> Result<Option<String>, ServiceError> {
        let typed =
            downcast_ref::<T>(entity).ok_or_else(|| mismatch::<T>(entity.entity_key()))?;
        self.service
            .delete_checks(DeleteChain::base())
            .evaluate(typed)
            .await
    }

    async fn check_save_allowed(&self, entity: &dyn Entity) -> Result<ValidationErrors, ServiceError> {
        let typed =
            downcast_ref::<T>(entity).ok_or_else(|| mismatch::<T>(entity.entity_key()))?;
        let mut errors = required_field_errors(typed);
        if errors.has_errors() {
            return Ok(errors);
        }
        self.service.validate_save(typed, &mut errors).await?;
        Ok(errors)
    }

    fn default_selection(&self, rows: &[BoxedEntity]) -> Option<usize> {
        self.service.default_selection(&typed_rows::<T>(rows))
    }
}

pub(crate) struct PageBehaviorAdapter<T, P> {
    behavior: Arc<P>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, P> PageBehaviorAdapter<T, P> {
    pub(crate) const fn new(behavior: Arc<P>) -> Self {
        Self {
            behavior,
            _entity: PhantomData,
        }
    }
}

impl<T, P> DynPageBehavior for PageBehaviorAdapter<T, P>
where
    T: EntityType,
    P: PageBehavior<T>,
{
    fn toolbar(&self) -> Option<ToolbarVisibility> {
        self.behavior.toolbar()
    }

    fn locate_single(&self, rows: &[BoxedEntity]) -> Option<usize> {
        self.behavior.locate_single(&typed_rows::<T>(rows))
    }

    fn caption(&self, entity: &dyn Entity) -> String {
        downcast_ref::<T>(entity)
            .map_or_else(|| entity.display_label(), |typed| self.behavior.caption(typed))
    }
}

pub(crate) struct InitializerAdapter<T, I> {
    initializer: Arc<I>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, I> InitializerAdapter<T, I> {
    pub(crate) const fn new(initializer: Arc<I>) -> Self {
        Self {
            initializer,
            _entity: PhantomData,
        }
    }
}

impl<T, I> DynInitializer for InitializerAdapter<T, I>
where
    T: EntityType,
    I: Initializer<T>,
{
    fn initialize(&self, entity: &mut dyn Entity) -> Result<(), ConfigError> {
        let actual = entity.entity_key();
        let typed = downcast_mut::<T>(entity).ok_or_else(|| {
            ConfigError::EntityTypeMismatch {
                expected: T::ENTITY_KEY.to_string(),
                actual: actual.to_string(),
            }
        })?;
        self.initializer.initialize(typed);
        Ok(())
    }

    fn sample_data(&self) -> Vec<BoxedEntity> {
        self.initializer
            .sample_data()
            .into_iter()
            .map(|row| Box::new(row) as BoxedEntity)
            .collect()
    }
}
