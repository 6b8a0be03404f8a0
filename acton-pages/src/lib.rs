//! acton-pages: metadata-driven CRUD page composition
//!
//! Business screens (master grids, detail forms, CRUD toolbars) are composed
//! at runtime from persisted page definitions and from the field tables that
//! `#[derive(Entity)]` generates for each entity type.
//!
//! - [`registry`]: entity type key to data service, page behavior and initializer
//! - [`introspect`]: entity type to ordered field metadata
//! - [`router`]: navigation token to page variant and session
//! - [`forms`]: form, grid and toolbar composition with form reuse
//! - [`crud`]: create, select, save, delete and refresh lifecycle
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use acton_pages::prelude::*;
//! use acton_pages::storage::InMemoryStore;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[entity(key = "Priority", view_name = "Priorities View")]
//! struct Priority {
//!     #[field(id)]
//!     id: Option<EntityId>,
//!     #[field(required, max_length = 40)]
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     acton_pages::observability::init()?;
//!
//!     let mut registry = EntityTypeRegistry::new();
//!     registry.register(EntityServices::new(InMemoryStore::<Priority>::new()))?;
//!
//!     let config = ActonPagesConfig::load_for_service("my-app")?;
//!     let engine = PageEngine::from_config(config, registry).await?;
//!
//!     let mut router = engine.router();
//!     router.navigate("page:5", &Actor::Anonymous).await?;
//!     Ok(())
//! }
//! ```

// Lint configuration is handled at the workspace level in Cargo.toml
#![allow(clippy::missing_errors_doc)]

// Generated derive code names items through `::acton_pages`
extern crate self as acton_pages;

pub mod auth;
pub mod config;
pub mod crud;
pub mod definitions;
pub mod error;
pub mod forms;
pub mod introspect;
pub mod model;
pub mod observability;
pub mod registry;
pub mod router;
pub mod state;
pub mod storage;

pub use acton_pages_macros::{Entity, FieldSet};
pub use error::BindError;
pub use model::{
    BoxedEntity, Entity, EntityId, EntityRef, EntityType, FieldModel, FieldSet, FieldValue,
    FieldValueType, SemanticType,
};

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use acton_pages::prelude::*;
    //! ```

    // Entity model and derives
    pub use crate::model::{BoxedEntity, EntityId, EntityRef, EntityType, FieldValue, SemanticType};
    pub use crate::{Entity, FieldSet};

    // Registry and services
    pub use crate::registry::{
        DataProvider, DataService, DeleteChain, EntityServices, EntityTypeRegistry, Initializer,
        PageBehavior, StaticOptions,
    };

    // Navigation
    pub use crate::auth::{Actor, Principal};
    pub use crate::router::{NavigationToken, PageVariant, RenderMode, Router};

    // Lifecycle
    pub use crate::crud::{
        ContentOwner, CrudCoordinator, DeleteOutcome, Notification, Notifier, SaveOutcome,
        SelectOutcome,
    };

    // Composition
    pub use crate::definitions::{
        DetailDefinition, FieldLine, GridDefinition, InMemoryDefinitionStore, PageDefinition,
        PageDefinitionStore,
    };
    pub use crate::forms::{
        ComposedForm, FormComposer, FormRenderer, ToolbarAction, ToolbarVisibility,
        ValidationErrors,
    };

    // Errors
    pub use crate::error::{ConfigError, CrudError, PageError, ServiceError};

    // Application state
    pub use crate::config::ActonPagesConfig;
    pub use crate::state::PageEngine;

    // Re-export key dependencies
    pub use async_trait::async_trait;
    pub use validator;
}
