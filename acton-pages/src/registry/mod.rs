//! Entity type registry
//!
//! Maps entity type keys to their service descriptors. The registry is
//! populated once at startup and then shared immutably behind an [`Arc`];
//! lookups never take a lock.
//!
//! # Example
//!
//! ```rust
//! use acton_pages::prelude::*;
//! use acton_pages::registry::{EntityServices, EntityTypeRegistry};
//! use acton_pages::storage::InMemoryStore;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[entity(key = "Priority", view_name = "Priorities View")]
//! pub struct Priority {
//!     #[field(id)]
//!     pub id: Option<EntityId>,
//!     #[field(required)]
//!     pub name: String,
//! }
//!
//! let mut registry = EntityTypeRegistry::new();
//! registry.register(EntityServices::new(InMemoryStore::<Priority>::new()))?;
//!
//! let descriptor = registry.resolve("Priority")?;
//! assert_eq!(descriptor.plural_title(), "Priorities");
//! assert!(registry.resolve("Unknown").is_err());
//! # Ok::<(), acton_pages::error::ConfigError>(())
//! ```

mod providers;
mod services;

pub use providers::{DataProvider, StaticOptions};
pub use services::{
    required_field_errors, DataService, DefaultPageBehavior, DeleteChain, DeleteCheck,
    DynDataService, DynInitializer, DynPageBehavior, Initializer, PageBehavior,
    NON_DELETABLE_MESSAGE, NOT_PERSISTED_MESSAGE, REASON_SEPARATOR,
};

pub(crate) use providers::EntityOptions;

use convert_case::{Case, Casing};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ConfigError, ServiceError};
use crate::model::{BoxedEntity, Entity, EntityType, FieldModel};
use services::{DataServiceAdapter, InitializerAdapter, PageBehaviorAdapter};

static GLOBAL: OnceCell<Arc<EntityTypeRegistry>> = OnceCell::new();

/// Services registered for one entity type
///
/// Built with [`EntityServices::new`] and handed to
/// [`EntityTypeRegistry::register`].
pub struct EntityServices<T: EntityType> {
    data_service: Arc<dyn DynDataService>,
    data_service_locator: String,
    page_behavior: Arc<dyn DynPageBehavior>,
    page_service_locator: String,
    initializer: Option<Arc<dyn DynInitializer>>,
    initializer_locator: Option<String>,
    singular_title: Option<String>,
    plural_title: Option<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: EntityType> EntityServices<T> {
    /// Services for `T` backed by `service`, with the default page behavior
    #[must_use]
    pub fn new<S: DataService<T>>(service: S) -> Self {
        Self::from_arc(Arc::new(service))
    }

    /// Same as [`EntityServices::new`] for a service shared elsewhere
    #[must_use]
    pub fn from_arc<S: DataService<T>>(service: Arc<S>) -> Self {
        Self {
            data_service: Arc::new(DataServiceAdapter::<T, S>::new(service)),
            data_service_locator: locator_for::<S>(T::ENTITY_KEY, "Service"),
            page_behavior: Arc::new(PageBehaviorAdapter::<T, _>::new(Arc::new(
                DefaultPageBehavior,
            ))),
            page_service_locator: format!("{}PageService", T::ENTITY_KEY),
            initializer: None,
            initializer_locator: None,
            singular_title: None,
            plural_title: None,
            _entity: PhantomData,
        }
    }

    /// Use custom page behavior
    #[must_use]
    pub fn page_behavior<P: PageBehavior<T>>(mut self, behavior: P) -> Self {
        self.page_service_locator = locator_for::<P>(T::ENTITY_KEY, "PageService");
        self.page_behavior = Arc::new(PageBehaviorAdapter::<T, P>::new(Arc::new(behavior)));
        self
    }

    /// Attach a new-entity initializer
    #[must_use]
    pub fn initializer<I: Initializer<T>>(mut self, initializer: I) -> Self {
        self.initializer_locator = Some(locator_for::<I>(T::ENTITY_KEY, "Initializer"));
        self.initializer = Some(Arc::new(InitializerAdapter::<T, I>::new(Arc::new(
            initializer,
        ))));
        self
    }

    /// Override the generated singular and plural titles
    #[must_use]
    pub fn titles(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.singular_title = Some(singular.into());
        self.plural_title = Some(plural.into());
        self
    }

    /// Override the data service locator grid definitions refer to
    #[must_use]
    pub fn data_service_locator(mut self, locator: impl Into<String>) -> Self {
        self.data_service_locator = locator.into();
        self
    }
}

fn locator_for<S: ?Sized>(entity_type: &str, suffix: &str) -> String {
    let name = std::any::type_name::<S>();
    if name.contains('<') {
        format!("{entity_type}{suffix}")
    } else {
        name.rsplit("::").next().unwrap_or(name).to_string()
    }
}

fn plural_of(singular: &str) -> String {
    if let Some(stem) = singular.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if singular.ends_with(['s', 'x']) || singular.ends_with("ch") || singular.ends_with("sh") {
        return format!("{singular}es");
    }
    format!("{singular}s")
}

/// Immutable description of a registered entity type
#[derive(Clone)]
pub struct EntityTypeDescriptor {
    entity_type_key: &'static str,
    view_name: Option<&'static str>,
    data_service_locator: String,
    page_service_locator: String,
    initializer_locator: Option<String>,
    singular_title: String,
    plural_title: String,
    field_models: fn() -> Vec<&'static FieldModel>,
    data_service: Arc<dyn DynDataService>,
    page_behavior: Arc<dyn DynPageBehavior>,
    initializer: Option<Arc<dyn DynInitializer>>,
}

impl EntityTypeDescriptor {
    fn from_services<T: EntityType>(services: EntityServices<T>) -> Self {
        let singular_title = services
            .singular_title
            .unwrap_or_else(|| T::ENTITY_KEY.to_case(Case::Title));
        let plural_title = services
            .plural_title
            .unwrap_or_else(|| plural_of(&singular_title));
        Self {
            entity_type_key: T::ENTITY_KEY,
            view_name: T::VIEW_NAME,
            data_service_locator: services.data_service_locator,
            page_service_locator: services.page_service_locator,
            initializer_locator: services.initializer_locator,
            singular_title,
            plural_title,
            field_models: T::field_models,
            data_service: services.data_service,
            page_behavior: services.page_behavior,
            initializer: services.initializer,
        }
    }

    /// Entity type key
    #[must_use]
    pub const fn entity_type_key(&self) -> &'static str {
        self.entity_type_key
    }

    /// View name of the type
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingViewName`] when neither the type nor an
    /// embedded base declares one.
    pub fn view_name(&self) -> Result<&'static str, ConfigError> {
        self.view_name
            .ok_or_else(|| ConfigError::MissingViewName(self.entity_type_key.to_string()))
    }

    /// Locator grid definitions use to name the data service
    #[must_use]
    pub fn data_service_locator(&self) -> &str {
        &self.data_service_locator
    }

    /// Locator of the page behavior
    #[must_use]
    pub fn page_service_locator(&self) -> &str {
        &self.page_service_locator
    }

    /// Locator of the initializer, if any
    #[must_use]
    pub fn initializer_locator(&self) -> Option<&str> {
        self.initializer_locator.as_deref()
    }

    /// Singular display title
    #[must_use]
    pub fn singular_title(&self) -> &str {
        &self.singular_title
    }

    /// Plural display title
    #[must_use]
    pub fn plural_title(&self) -> &str {
        &self.plural_title
    }

    /// Declared fields, most-derived first
    #[must_use]
    pub fn field_models(&self) -> Vec<&'static FieldModel> {
        (self.field_models)()
    }

    /// Data service
    #[must_use]
    pub const fn data_service(&self) -> &Arc<dyn DynDataService> {
        &self.data_service
    }

    /// Page behavior
    #[must_use]
    pub const fn page_behavior(&self) -> &Arc<dyn DynPageBehavior> {
        &self.page_behavior
    }

    /// Whether sample data and new-entity defaults are available
    #[must_use]
    pub const fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }

    /// Blank entity with the initializer's defaults applied
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EntityTypeMismatch`] when the data service
    /// produces an entity of another type.
    pub fn new_entity(&self) -> Result<BoxedEntity, ConfigError> {
        let mut entity = self.data_service.new_entity();
        if let Some(initializer) = &self.initializer {
            initializer.initialize(entity.as_mut())?;
        }
        Ok(entity)
    }
}

impl fmt::Debug for EntityTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTypeDescriptor")
            .field("entity_type_key", &self.entity_type_key)
            .field("view_name", &self.view_name)
            .field("data_service_locator", &self.data_service_locator)
            .field("page_service_locator", &self.page_service_locator)
            .field("initializer_locator", &self.initializer_locator)
            .field("singular_title", &self.singular_title)
            .field("plural_title", &self.plural_title)
            .finish_non_exhaustive()
    }
}

/// Registry of entity types and data providers
#[derive(Default)]
pub struct EntityTypeRegistry {
    types: HashMap<&'static str, Arc<EntityTypeDescriptor>>,
    service_locators: HashMap<String, &'static str>,
    providers: HashMap<String, Arc<dyn DataProvider>>,
    initialized: Mutex<HashSet<&'static str>>,
}

impl EntityTypeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the services of an entity type
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateEntityType`] if the key is already
    /// registered and [`ConfigError::DuplicateServiceLocator`] if another type
    /// uses the same data service locator. Existing entries are never
    /// overwritten.
    pub fn register<T: EntityType>(
        &mut self,
        services: EntityServices<T>,
    ) -> Result<&mut Self, ConfigError> {
        if self.types.contains_key(T::ENTITY_KEY) {
            return Err(ConfigError::DuplicateEntityType(T::ENTITY_KEY.to_string()));
        }
        let descriptor = EntityTypeDescriptor::from_services(services);
        if self
            .service_locators
            .contains_key(descriptor.data_service_locator())
        {
            return Err(ConfigError::DuplicateServiceLocator(
                descriptor.data_service_locator.clone(),
            ));
        }

        tracing::debug!(
            entity_type = T::ENTITY_KEY,
            data_service = descriptor.data_service_locator(),
            "Registered entity type"
        );
        self.service_locators
            .insert(descriptor.data_service_locator.clone(), T::ENTITY_KEY);
        self.types.insert(T::ENTITY_KEY, Arc::new(descriptor));
        Ok(self)
    }

    /// Register a named option source
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateDataProvider`] if the locator is taken.
    pub fn register_data_provider(
        &mut self,
        locator: impl Into<String>,
        provider: impl DataProvider + 'static,
    ) -> Result<&mut Self, ConfigError> {
        let locator = locator.into();
        if self.providers.contains_key(&locator) {
            return Err(ConfigError::DuplicateDataProvider(locator));
        }
        self.providers.insert(locator, Arc::new(provider));
        Ok(self)
    }

    /// Descriptor of an entity type
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredEntityType`] for unknown keys.
    pub fn resolve(&self, key: &str) -> Result<Arc<EntityTypeDescriptor>, ConfigError> {
        self.types
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::UnregisteredEntityType(key.to_string()))
    }

    /// Data service of the entity's runtime type
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredEntityType`] when the type is unknown.
    pub fn resolve_data_service(
        &self,
        entity: &dyn Entity,
    ) -> Result<Arc<dyn DynDataService>, ConfigError> {
        self.resolve(entity.entity_key())
            .map(|descriptor| Arc::clone(descriptor.data_service()))
    }

    /// Descriptor whose data service is registered under `locator`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnresolvedDataService`] for unknown locators.
    pub fn resolve_by_service_locator(
        &self,
        locator: &str,
    ) -> Result<Arc<EntityTypeDescriptor>, ConfigError> {
        let key = self
            .service_locators
            .get(locator)
            .ok_or_else(|| ConfigError::UnresolvedDataService(locator.to_string()))?;
        self.resolve(key)
    }

    /// Option source registered under `locator`
    #[must_use]
    pub fn resolve_data_provider(&self, locator: &str) -> Option<Arc<dyn DataProvider>> {
        self.providers.get(locator).cloned()
    }

    /// Key of the type whose singular or plural title matches, ignoring case
    #[must_use]
    pub fn key_for_title(&self, title: &str) -> Option<&'static str> {
        self.types
            .values()
            .find(|descriptor| {
                descriptor.singular_title.eq_ignore_ascii_case(title)
                    || descriptor.plural_title.eq_ignore_ascii_case(title)
            })
            .map(|descriptor| descriptor.entity_type_key)
    }

    /// Registered keys in sorted order
    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.types.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Whether `key` is registered
    #[must_use]
    pub fn is_registered(&self, key: &str) -> bool {
        self.types.contains_key(key)
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Save every initializer's sample rows through its data service
    ///
    /// Types are seeded at most once per registry. A type whose rows could not
    /// all be saved stays unseeded and is retried by the next call. Returns
    /// the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns the first [`ServiceError`] reported by a data service.
    pub async fn seed_sample_data(&self) -> Result<usize, ServiceError> {
        let mut inserted = 0;
        for key in self.keys() {
            let Some(descriptor) = self.types.get(key) else {
                continue;
            };
            let Some(initializer) = &descriptor.initializer else {
                continue;
            };
            if !self.initialized.lock().insert(key) {
                continue;
            }

            let rows = initializer.sample_data();
            let count = rows.len();
            for row in rows {
                if let Err(err) = descriptor.data_service.save(row).await {
                    self.initialized.lock().remove(key);
                    tracing::error!(entity_type = key, error = %err, "Sample data seeding failed");
                    return Err(err);
                }
            }
            tracing::info!(entity_type = key, rows = count, "Seeded sample data");
            inserted += count;
        }
        Ok(inserted)
    }

    /// Whether sample data was seeded for `key`
    #[must_use]
    pub fn is_initialized(&self, key: &str) -> bool {
        self.initialized.lock().contains(key)
    }

    /// Install this registry as the process-wide registry
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RegistryAlreadyInstalled`] on a second call.
    pub fn install_global(self) -> Result<Arc<Self>, ConfigError> {
        let registry = Arc::new(self);
        GLOBAL
            .set(Arc::clone(&registry))
            .map_err(|_| ConfigError::RegistryAlreadyInstalled)?;
        Ok(registry)
    }

    /// The process-wide registry, if installed
    #[must_use]
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL.get().cloned()
    }
}

impl fmt::Debug for EntityTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTypeRegistry")
            .field("types", &self.keys())
            .field("data_providers", &self.providers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
