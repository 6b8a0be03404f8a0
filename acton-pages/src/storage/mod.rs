//! Data service backends
//!
//! Persistence itself is outside the engine; applications implement
//! [`DataService`](crate::registry::DataService) over their own storage.
//! [`InMemoryStore`] covers tests, demos and reference data kept in memory.

mod memory;

pub use memory::InMemoryStore;
