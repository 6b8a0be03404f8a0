//! Shared engine state
//!
//! [`PageEngine`] bundles everything a page session needs: configuration,
//! the entity type registry, the field introspector, the form composer, the
//! definition store and the notifier. It is cheap to clone; every session
//! gets its own [`Router`] from it.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;

use crate::config::ActonPagesConfig;
use crate::crud::{Notification, Notifier, TracingNotifier};
use crate::definitions::{InMemoryDefinitionStore, PageDefinitionStore};
use crate::forms::FormComposer;
use crate::introspect::FieldIntrospector;
use crate::registry::EntityTypeRegistry;
use crate::router::Router;

/// Application state shared by all page sessions
///
/// # Example
///
/// ```rust,ignore
/// use acton_pages::prelude::*;
///
/// async fn example(registry: EntityTypeRegistry) -> anyhow::Result<()> {
///     let config = ActonPagesConfig::load_for_service("my-app")?;
///     let engine = PageEngine::from_config(config, registry).await?;
///
///     let mut router = engine.router();
///     router.navigate("page:5", &Actor::Anonymous).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PageEngine {
    config: Arc<ActonPagesConfig>,
    registry: Arc<EntityTypeRegistry>,
    introspector: Arc<FieldIntrospector>,
    composer: Arc<FormComposer>,
    store: Arc<dyn PageDefinitionStore>,
    notifier: Arc<dyn Notifier>,
}

impl PageEngine {
    /// Create an engine with default configuration
    #[must_use]
    pub fn new(registry: Arc<EntityTypeRegistry>, store: Arc<dyn PageDefinitionStore>) -> Self {
        Self::with_config(ActonPagesConfig::default(), registry, store)
    }

    /// Create an engine with custom configuration
    #[must_use]
    pub fn with_config(
        config: ActonPagesConfig,
        registry: Arc<EntityTypeRegistry>,
        store: Arc<dyn PageDefinitionStore>,
    ) -> Self {
        let introspector = Arc::new(FieldIntrospector::new(Arc::clone(&registry)));
        let composer = FormComposer::new(Arc::clone(&registry), Arc::clone(&introspector))
            .with_reuse(config.composer.reuse_forms);
        Self {
            config: Arc::new(config),
            registry,
            introspector,
            composer: Arc::new(composer),
            store,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Deliver notifications through `notifier`
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build an engine from configuration
    ///
    /// Loads page definitions from `pages.definitions_path` (an empty store
    /// when unset), validates them, and seeds sample data when
    /// `registry.seed_sample_data` is on.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions file cannot be loaded or is
    /// inconsistent, or if seeding fails.
    pub async fn from_config(
        config: ActonPagesConfig,
        registry: EntityTypeRegistry,
    ) -> anyhow::Result<Self> {
        let store = match &config.pages.definitions_path {
            Some(path) => InMemoryDefinitionStore::load_file(path)
                .await
                .with_context(|| format!("loading page definitions from {}", path.display()))?,
            None => InMemoryDefinitionStore::new(),
        };
        store.validate()?;
        for entity_type in store.entity_types() {
            if !registry.is_registered(entity_type) {
                tracing::warn!(entity_type, "Definitions reference an unregistered entity type");
            }
        }

        if config.registry.seed_sample_data {
            let seeded = registry
                .seed_sample_data()
                .await
                .context("seeding sample data")?;
            tracing::info!(rows = seeded, "Sample data seeded");
        }

        tracing::info!(
            pages = store.page_count(),
            entity_types = registry.len(),
            "Page engine ready"
        );
        Ok(Self::with_config(config, Arc::new(registry), Arc::new(store)))
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &ActonPagesConfig {
        &self.config
    }

    /// Entity type registry
    #[must_use]
    pub const fn registry(&self) -> &Arc<EntityTypeRegistry> {
        &self.registry
    }

    /// Field introspector
    #[must_use]
    pub const fn introspector(&self) -> &Arc<FieldIntrospector> {
        &self.introspector
    }

    /// Form composer
    #[must_use]
    pub fn composer(&self) -> &FormComposer {
        &self.composer
    }

    /// Definition store
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn PageDefinitionStore> {
        &self.store
    }

    /// Send a notification to the user
    pub fn notify(&self, notification: &Notification) {
        self.notifier.notify(notification);
    }

    /// New router for one page session
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new(self.clone())
    }
}

impl fmt::Debug for PageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::RecordingNotifier;
    use crate::definitions::MockPageDefinitionStore;
    use crate::error::ServiceError;
    use std::io::Write;

    fn engine() -> PageEngine {
        PageEngine::new(
            Arc::new(EntityTypeRegistry::new()),
            Arc::new(InMemoryDefinitionStore::new()),
        )
    }

    #[test]
    fn test_with_config() {
        let mut config = ActonPagesConfig::default();
        config.composer.reuse_forms = false;
        let engine = PageEngine::with_config(
            config,
            Arc::new(EntityTypeRegistry::new()),
            Arc::new(InMemoryDefinitionStore::new()),
        );
        assert!(!engine.config().composer.reuse_forms);
    }

    #[test]
    fn test_clone_shares_state() {
        let engine = engine();
        let cloned = engine.clone();
        assert!(Arc::ptr_eq(&engine.config, &cloned.config));
        assert!(Arc::ptr_eq(&engine.registry, &cloned.registry));
    }

    #[test]
    fn test_notifications_reach_notifier() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine().with_notifier(Arc::clone(&notifier) as Arc<dyn Notifier>);
        engine.notify(&Notification::info("hello"));
        assert_eq!(notifier.messages(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_router_starts_unresolved() {
        let router = engine().router();
        assert!(!router.is_resolved());
    }

    #[tokio::test]
    async fn test_from_config_loads_definitions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[pages]]
id = 1
title = "Tags"
detail = 2

[[details]]
id = 2
name = "Tags View"
entity_type = "Tag"
"#
        )
        .unwrap();

        let mut config = ActonPagesConfig::default();
        config.pages.definitions_path = Some(file.path().to_path_buf());
        let engine = PageEngine::from_config(config, EntityTypeRegistry::new())
            .await
            .unwrap();
        assert!(engine.store().page(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_from_config_reports_missing_file() {
        let mut config = ActonPagesConfig::default();
        config.pages.definitions_path = Some("/nonexistent/pages.toml".into());
        let err = PageEngine::from_config(config, EntityTypeRegistry::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("loading page definitions"));
    }

    #[tokio::test]
    async fn test_store_errors_propagate_through_router() {
        let mut store = MockPageDefinitionStore::new();
        store
            .expect_page()
            .returning(|_| Err(ServiceError::Storage("offline".to_string())));
        let engine = PageEngine::new(Arc::new(EntityTypeRegistry::new()), Arc::new(store));

        let mut router = engine.router();
        assert!(router.navigate("page:1", &crate::auth::Actor::Anonymous).await.is_err());
        assert!(!router.is_resolved());
    }
}
