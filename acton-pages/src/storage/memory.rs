//! In-memory data service

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ServiceError;
use crate::model::{EntityId, EntityType};
use crate::registry::DataService;

/// Data service keeping entities in a map ordered by id
///
/// Ids are assigned from 1 upwards on first save. The synchronous helpers
/// ([`InMemoryStore::count_where`], [`InMemoryStore::find_where`]) let
/// delete checks of other types query the store without awaiting.
///
/// ```rust
/// use acton_pages::prelude::*;
/// use acton_pages::storage::InMemoryStore;
///
/// #[derive(Debug, Clone, Default, Entity)]
/// #[entity(key = "Tag", view_name = "Tags View")]
/// struct Tag {
///     #[field(id)]
///     id: Option<EntityId>,
///     name: String,
/// }
///
/// let store = InMemoryStore::with_rows(vec![
///     Tag { id: None, name: "red".into() },
///     Tag { id: None, name: "blue".into() },
/// ]);
/// assert_eq!(store.len(), 2);
/// assert_eq!(store.count_where(|tag| tag.name.starts_with('b')), 1);
/// ```
pub struct InMemoryStore<T: EntityType> {
    rows: RwLock<BTreeMap<EntityId, T>>,
    next_id: AtomicU64,
}

impl<T: EntityType> InMemoryStore<T> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a store holding `rows`, assigning ids to rows without one
    #[must_use]
    pub fn with_rows(rows: Vec<T>) -> Self {
        let store = Self::new();
        for row in rows {
            store.insert(row);
        }
        store
    }

    /// Store `entity`, assigning an id when it has none
    pub fn insert(&self, mut entity: T) -> T {
        let id = match entity.entity_id() {
            Some(id) => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::Relaxed);
                id
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                entity.set_entity_id(id);
                id
            }
        };
        self.rows.write().insert(id, entity.clone());
        entity
    }

    /// Entity with `id`
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<T> {
        self.rows.read().get(&id).cloned()
    }

    /// Number of stored entities matching `predicate`
    pub fn count_where(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.rows.read().values().filter(|row| predicate(row)).count()
    }

    /// Stored entities matching `predicate`, in id order
    pub fn find_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    /// Number of stored entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl<T: EntityType> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EntityType> fmt::Debug for InMemoryStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entity_type", &T::ENTITY_KEY)
            .field("len", &self.len())
            .finish()
    }
}

#[async_trait]
impl<T: EntityType> DataService<T> for InMemoryStore<T> {
    async fn list(&self) -> Result<Vec<T>, ServiceError> {
        Ok(self.rows.read().values().cloned().collect())
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<T>, ServiceError> {
        Ok(self.get(id))
    }

    async fn save(&self, entity: T) -> Result<T, ServiceError> {
        if let Some(id) = entity.entity_id() {
            if !self.rows.read().contains_key(&id) {
                return Err(ServiceError::NotFound {
                    entity_type: T::ENTITY_KEY.to_string(),
                    id,
                });
            }
        }
        Ok(self.insert(entity))
    }

    async fn delete(&self, id: EntityId) -> Result<(), ServiceError> {
        self.rows
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound {
                entity_type: T::ENTITY_KEY.to_string(),
                id,
            })
    }
}
