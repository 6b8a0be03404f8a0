//! Page variant resolution and navigation state
//!
//! A [`Router`] turns a navigation token into an active [`PageSession`]:
//! it loads the page definition, checks the actor, picks the
//! [`PageVariant`], builds the [`CrudCoordinator`] and makes the initial
//! selection. The new session is fully built before it replaces the current
//! one, so a failed navigation leaves the router where it was.
//!
//! ```rust,ignore
//! let mut router = engine.router();
//! let variant = router.navigate("page:5&item:42", &Actor::Anonymous).await?;
//! assert_eq!(variant, PageVariant::ListAndDetail);
//! ```

mod token;

pub use token::NavigationToken;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::auth::Actor;
use crate::crud::{ContentOwner, CrudCoordinator, Notification};
use crate::definitions::{GridDefinition, PageDefinition};
use crate::error::{ConfigError, PageError};
use crate::model::{Entity, EntityId};
use crate::state::PageEngine;

/// Message shown when a page cannot be built from its definitions
pub const PAGE_LOAD_FAILED_MESSAGE: &str = "The page could not be loaded.";

/// How a page is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageVariant {
    /// Master grid plus detail form
    ListAndDetail,
    /// Detail form of one item, no grid
    DetailOnly,
    /// One entity edited without a list
    SingleEntityEdit,
}

impl PageVariant {
    /// Pick the variant for a page
    ///
    /// No grid, or a grid marked `attribute_none`, always edits a single
    /// entity and ignores the item id. Otherwise an item shown in
    /// [`RenderMode::DetailOnly`] gets the detail-only variant.
    #[must_use]
    pub fn resolve(grid: Option<&GridDefinition>, item_id: Option<EntityId>, mode: RenderMode) -> Self {
        match grid {
            None => Self::SingleEntityEdit,
            Some(grid) if grid.attribute_none => Self::SingleEntityEdit,
            Some(_) if item_id.is_some() && mode == RenderMode::DetailOnly => Self::DetailOnly,
            Some(_) => Self::ListAndDetail,
        }
    }

    /// Variant name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListAndDetail => "list_and_detail",
            Self::DetailOnly => "detail_only",
            Self::SingleEntityEdit => "single_entity_edit",
        }
    }
}

impl fmt::Display for PageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested presentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Full page
    #[default]
    Page,
    /// Only the detail of the requested item
    DetailOnly,
}

/// Active page with its coordinator
#[derive(Debug)]
pub struct PageSession {
    page: PageDefinition,
    variant: PageVariant,
    token: NavigationToken,
    coordinator: CrudCoordinator,
}

impl PageSession {
    /// Page definition
    #[must_use]
    pub const fn page(&self) -> &PageDefinition {
        &self.page
    }

    /// Resolved variant
    #[must_use]
    pub const fn variant(&self) -> PageVariant {
        self.variant
    }

    /// Token the session was entered with
    ///
    /// Single-entity pages drop the item id.
    #[must_use]
    pub const fn token(&self) -> NavigationToken {
        self.token
    }

    /// Lifecycle coordinator
    #[must_use]
    pub const fn coordinator(&self) -> &CrudCoordinator {
        &self.coordinator
    }

    /// Lifecycle coordinator, mutably
    pub fn coordinator_mut(&mut self) -> &mut CrudCoordinator {
        &mut self.coordinator
    }
}

/// Navigation state
#[derive(Debug, Default)]
pub enum RouterState {
    /// No page shown
    #[default]
    Unresolved,
    /// A page is shown
    Active(Box<PageSession>),
}

/// Per-session navigation state machine
#[derive(Debug)]
pub struct Router {
    engine: PageEngine,
    state: RouterState,
}

impl Router {
    /// Router with no page shown
    #[must_use]
    pub fn new(engine: PageEngine) -> Self {
        Self {
            engine,
            state: RouterState::Unresolved,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &RouterState {
        &self.state
    }

    /// Whether a page is shown
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.state, RouterState::Active(_))
    }

    /// Active session
    #[must_use]
    pub fn session(&self) -> Option<&PageSession> {
        match &self.state {
            RouterState::Active(session) => Some(session),
            RouterState::Unresolved => None,
        }
    }

    /// Active session, mutably
    pub fn session_mut(&mut self) -> Option<&mut PageSession> {
        match &mut self.state {
            RouterState::Active(session) => Some(session),
            RouterState::Unresolved => None,
        }
    }

    /// Variant of the active page
    #[must_use]
    pub fn variant(&self) -> Option<PageVariant> {
        self.session().map(PageSession::variant)
    }

    /// Coordinator of the active page
    #[must_use]
    pub fn coordinator(&self) -> Option<&CrudCoordinator> {
        self.session().map(PageSession::coordinator)
    }

    /// Coordinator of the active page, mutably
    pub fn coordinator_mut(&mut self) -> Option<&mut CrudCoordinator> {
        self.session_mut().map(PageSession::coordinator_mut)
    }

    /// Parse `token` and enter its page as a full page
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Route`] for malformed tokens and the errors of
    /// [`Router::enter`]. The router state is unchanged on error.
    pub async fn navigate(&mut self, token: &str, actor: &Actor) -> Result<PageVariant, PageError> {
        let token: NavigationToken = token.parse().inspect_err(|err| {
            tracing::warn!(error = %err, "Rejected navigation token");
        })?;
        self.enter(token, actor, RenderMode::Page, None).await
    }

    /// Enter the page named by `token`
    ///
    /// Checks authentication, resolves the variant, builds the session and
    /// makes the initial selection: the requested item, or the variant's
    /// default when there is none or it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::AuthenticationRequired`] for anonymous actors on
    /// protected pages, [`PageError::Config`] for broken definitions and
    /// [`PageError::Crud`] when the initial load fails. Configuration errors
    /// are also reported to the user. The router state is unchanged on error.
    #[tracing::instrument(name = "enter_page", skip_all, fields(page = token.page_id, item = ?token.item_id))]
    pub async fn enter(
        &mut self,
        token: NavigationToken,
        actor: &Actor,
        mode: RenderMode,
        owner: Option<Arc<dyn ContentOwner>>,
    ) -> Result<PageVariant, PageError> {
        match self.build_session(token, actor, mode, owner).await {
            Ok(session) => {
                let variant = session.variant;
                tracing::info!(variant = %variant, "Page entered");
                self.state = RouterState::Active(Box::new(session));
                Ok(variant)
            }
            Err(err) => {
                if err.is_configuration() {
                    tracing::error!(
                        page = token.page_id,
                        operation = "enter",
                        error = %err,
                        "Page configuration error"
                    );
                    self.engine
                        .notify(&Notification::error(PAGE_LOAD_FAILED_MESSAGE));
                } else {
                    tracing::warn!(page = token.page_id, error = %err, "Navigation failed");
                }
                Err(err)
            }
        }
    }

    async fn build_session(
        &self,
        token: NavigationToken,
        actor: &Actor,
        mode: RenderMode,
        owner: Option<Arc<dyn ContentOwner>>,
    ) -> Result<PageSession, PageError> {
        let store = self.engine.store();
        let page = store
            .page(token.page_id)
            .await?
            .ok_or(ConfigError::MissingPageDefinition(token.page_id))?;
        if page.requires_authentication && !actor.is_authenticated() {
            return Err(PageError::AuthenticationRequired { page_id: page.id });
        }

        let grid = match page.grid {
            Some(id) => Some(
                store
                    .grid(id)
                    .await?
                    .ok_or(ConfigError::MissingGridDefinition(id))?,
            ),
            None => None,
        };
        let detail = store
            .detail(page.detail)
            .await?
            .ok_or(ConfigError::MissingDetailDefinition(page.detail))?;
        let variant = PageVariant::resolve(grid.as_ref(), token.item_id, mode);

        let mut coordinator = CrudCoordinator::new(self.engine.clone(), page.id, detail)?;
        if let (Some(grid), false) = (&grid, variant == PageVariant::SingleEntityEdit) {
            if let Some(locator) = &grid.data_provider {
                let descriptor = self.engine.registry().resolve_by_service_locator(locator)?;
                coordinator = coordinator.with_row_source(Arc::clone(descriptor.data_service()))?;
            }
            coordinator = if variant == PageVariant::ListAndDetail {
                coordinator.with_grid(self.engine.composer().compose_grid(grid)?)?
            } else {
                coordinator.listing()
            };
        }
        if let Some(owner) = owner {
            coordinator = coordinator.with_owner(owner);
        }

        coordinator.load_rows().await?;
        let item_id = match variant {
            PageVariant::SingleEntityEdit => None,
            PageVariant::ListAndDetail | PageVariant::DetailOnly => token.item_id,
        };
        match item_id {
            Some(id) => coordinator.select_by_id(id).await?,
            None => coordinator.select_default().await?,
        };

        Ok(PageSession {
            page,
            variant,
            token: NavigationToken {
                page_id: token.page_id,
                item_id,
            },
            coordinator,
        })
    }

    /// Leave the current page
    pub fn navigate_away(&mut self) {
        if let RouterState::Active(session) = std::mem::take(&mut self.state) {
            tracing::debug!(page = session.page.id, "Left page");
        }
    }

    /// Token of the page showing entities of this type
    ///
    /// The page is the one whose detail definition is named after the
    /// entity's view name; the entity's id, if any, becomes the item.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingViewName`] or
    /// [`ConfigError::NoPageForView`] when no page matches.
    pub async fn route_for_entity(&self, entity: &dyn Entity) -> Result<NavigationToken, PageError> {
        let descriptor = self.engine.registry().resolve(entity.entity_key())?;
        let view_name = descriptor.view_name()?;
        let page = self
            .engine
            .store()
            .page_for_view(view_name)
            .await?
            .ok_or_else(|| ConfigError::NoPageForView(view_name.to_string()))?;
        Ok(NavigationToken {
            page_id: page.id,
            item_id: entity.id(),
        })
    }

    /// Show one entity in detail-only mode, or clear the router with `None`
    ///
    /// # Errors
    ///
    /// See [`Router::route_for_entity`] and [`Router::enter`].
    pub async fn display_entity(
        &mut self,
        entity: Option<&dyn Entity>,
        actor: &Actor,
        owner: Option<Arc<dyn ContentOwner>>,
    ) -> Result<Option<PageVariant>, PageError> {
        let Some(entity) = entity else {
            self.navigate_away();
            return Ok(None);
        };
        let token = self.route_for_entity(entity).await?;
        self.enter(token, actor, RenderMode::DetailOnly, owner)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_rule() {
        let grid = GridDefinition::new(1, "Tag", ["name"]);
        let none = GridDefinition::none(2, "Tag");

        assert_eq!(
            PageVariant::resolve(None, Some(4), RenderMode::DetailOnly),
            PageVariant::SingleEntityEdit
        );
        assert_eq!(
            PageVariant::resolve(Some(&none), Some(4), RenderMode::DetailOnly),
            PageVariant::SingleEntityEdit
        );
        assert_eq!(
            PageVariant::resolve(Some(&grid), Some(4), RenderMode::DetailOnly),
            PageVariant::DetailOnly
        );
        assert_eq!(
            PageVariant::resolve(Some(&grid), None, RenderMode::DetailOnly),
            PageVariant::ListAndDetail
        );
        assert_eq!(
            PageVariant::resolve(Some(&grid), Some(4), RenderMode::Page),
            PageVariant::ListAndDetail
        );
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(PageVariant::SingleEntityEdit.to_string(), "single_entity_edit");
    }
}
