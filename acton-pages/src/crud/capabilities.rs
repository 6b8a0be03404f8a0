//! Toolbar capabilities
//!
//! Toolbars dispatch through these traits so any host that can create, save,
//! delete or refresh its entity gets the same button wiring.

use async_trait::async_trait;

use super::{CrudCoordinator, DeleteOutcome, SaveOutcome, SelectOutcome};
use crate::error::CrudError;
use crate::forms::ToolbarAction;

/// Can create a new blank entity
#[async_trait]
pub trait Creatable: Send {
    /// Create and select a new entity
    async fn create_entity(&mut self) -> Result<SelectOutcome, CrudError>;
}

/// Can persist the bound input
#[async_trait]
pub trait Savable: Send {
    /// Validate and persist the current entity
    async fn save_entity(&mut self) -> Result<SaveOutcome, CrudError>;
}

/// Can delete the current entity
#[async_trait]
pub trait Deletable: Send {
    /// Delete the current entity if allowed
    async fn delete_entity(&mut self) -> Result<DeleteOutcome, CrudError>;
}

/// Can reload the current entity
#[async_trait]
pub trait Refreshable: Send {
    /// Reload and reselect the current entity
    async fn refresh_entity(&mut self) -> Result<SelectOutcome, CrudError>;
}

#[async_trait]
impl Creatable for CrudCoordinator {
    async fn create_entity(&mut self) -> Result<SelectOutcome, CrudError> {
        self.create().await
    }
}

#[async_trait]
impl Savable for CrudCoordinator {
    async fn save_entity(&mut self) -> Result<SaveOutcome, CrudError> {
        self.save().await
    }
}

#[async_trait]
impl Deletable for CrudCoordinator {
    async fn delete_entity(&mut self) -> Result<DeleteOutcome, CrudError> {
        self.delete().await
    }
}

#[async_trait]
impl Refreshable for CrudCoordinator {
    async fn refresh_entity(&mut self) -> Result<SelectOutcome, CrudError> {
        self.refresh().await
    }
}

/// Result of a dispatched toolbar action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// New or reloaded entity selected
    Selected(SelectOutcome),
    /// Save attempted
    Saved(SaveOutcome),
    /// Delete attempted
    Deleted(DeleteOutcome),
    /// Action has no handler
    Unsupported(ToolbarAction),
}

/// Dispatch a toolbar action to its capability
///
/// Copy and report have no handler and come back as
/// [`ActionOutcome::Unsupported`].
///
/// # Errors
///
/// Propagates the handler's [`CrudError`].
pub async fn perform<C>(target: &mut C, action: ToolbarAction) -> Result<ActionOutcome, CrudError>
where
    C: Creatable + Savable + Deletable + Refreshable,
{
    tracing::debug!(action = action.as_str(), "Toolbar action");
    match action {
        ToolbarAction::New => target.create_entity().await.map(ActionOutcome::Selected),
        ToolbarAction::Save => target.save_entity().await.map(ActionOutcome::Saved),
        ToolbarAction::Delete => target.delete_entity().await.map(ActionOutcome::Deleted),
        ToolbarAction::Refresh => target.refresh_entity().await.map(ActionOutcome::Selected),
        ToolbarAction::Copy | ToolbarAction::Report => Ok(ActionOutcome::Unsupported(action)),
    }
}
