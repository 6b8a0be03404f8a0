//! Option sources for select fields

use async_trait::async_trait;
use std::sync::Arc;

use super::services::DynDataService;
use crate::error::ServiceError;
use crate::forms::SelectOption;

/// Supplies the selectable options of a field
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Options in display order
    async fn options(&self) -> Result<Vec<SelectOption>, ServiceError>;
}

/// Fixed option list
#[derive(Debug, Clone, Default)]
pub struct StaticOptions {
    options: Vec<SelectOption>,
}

impl StaticOptions {
    /// Create a provider returning `options`
    #[must_use]
    pub const fn new(options: Vec<SelectOption>) -> Self {
        Self { options }
    }

    /// Options whose value and label are the same text
    #[must_use]
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            labels
                .into_iter()
                .map(|label| {
                    let label = label.into();
                    SelectOption::new(label.clone(), label)
                })
                .collect(),
        )
    }
}

#[async_trait]
impl DataProvider for StaticOptions {
    async fn options(&self) -> Result<Vec<SelectOption>, ServiceError> {
        Ok(self.options.clone())
    }
}

/// Persisted rows of an entity type, offered by id and display label
pub(crate) struct EntityOptions {
    service: Arc<dyn DynDataService>,
}

impl EntityOptions {
    pub(crate) fn new(service: Arc<dyn DynDataService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DataProvider for EntityOptions {
    async fn options(&self) -> Result<Vec<SelectOption>, ServiceError> {
        Ok(self
            .service
            .list()
            .await?
            .iter()
            .filter_map(|row| {
                row.id()
                    .map(|id| SelectOption::new(id.to_string(), row.display_label()))
            })
            .collect())
    }
}
