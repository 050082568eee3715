//! Dependency container handed to every domain service.
//!
//! The store is behind a trait so tests (and any alternative backend
//! binding) can swap it without touching domain code.

use std::sync::Arc;

use super::memory::MemoryStore;
use super::store::BaseStore;
use crate::config::Config;

/// Dependencies accessible to domain services.
#[derive(Clone)]
pub struct CoreDeps {
    pub store: Arc<dyn BaseStore>,
    pub config: Config,
}

impl CoreDeps {
    pub fn new(store: Arc<dyn BaseStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// An in-memory instance with default configuration. The standard
    /// starting point for tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Config::default())
    }

    /// An in-memory instance with custom configuration.
    pub fn in_memory_with(config: Config) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }
}
