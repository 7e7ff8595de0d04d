//! Table Registry
//!
//! Process-wide mapping from a table name to its [`CacheTable`] instance.
//! The registry guarantees that all callers asking for the same name share a
//! single table, created lazily on first use. Tables are never removed; a
//! registry lives as long as the process does.
//!
//! The usual entry point is the free function [`cache`], which hits the
//! global registry. Tests (and anything wanting isolation) can construct a
//! private [`CacheRegistry`] instead.

use crate::storage::table::CacheTable;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::debug;

/// The process-wide registry backing [`cache`].
static GLOBAL: OnceLock<CacheRegistry> = OnceLock::new();

/// A registry of named cache tables.
///
/// # Example
///
/// ```
/// use embercache::CacheRegistry;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = CacheRegistry::new();
///
///     let sessions = registry.get_or_create("sessions");
///     let again = registry.get_or_create("sessions");
///
///     // Same name, same table
///     assert!(std::sync::Arc::ptr_eq(&sessions, &again));
/// }
/// ```
#[derive(Debug, Default)]
pub struct CacheRegistry {
    tables: RwLock<HashMap<String, Arc<CacheTable>>>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the process-wide registry, creating it on first use.
    pub fn global() -> &'static CacheRegistry {
        GLOBAL.get_or_init(CacheRegistry::new)
    }

    /// Returns the table registered under `name`, creating it if needed.
    ///
    /// Creation always succeeds; every caller using the same name gets the
    /// identical table for the life of the registry.
    ///
    /// # Panics
    ///
    /// Panics if a table has to be created outside a Tokio runtime (see
    /// [`CacheTable::new`]).
    pub fn get_or_create(&self, name: &str) -> Arc<CacheTable> {
        // Fast path: the table usually exists already
        {
            let tables = self.tables.read().unwrap();
            if let Some(table) = tables.get(name) {
                return Arc::clone(table);
            }
        }

        // Slow path: re-check under the write lock so two racing creators
        // cannot both insert a table for the same name
        let mut tables = self.tables.write().unwrap();
        if let Some(table) = tables.get(name) {
            return Arc::clone(table);
        }

        let table = CacheTable::new(name);
        tables.insert(name.to_string(), Arc::clone(&table));
        debug!(table = name, "cache table created");

        table
    }

    /// Returns the number of tables registered so far.
    pub fn len(&self) -> usize {
        self.tables.read().unwrap().len()
    }

    /// Returns true if no table has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the named table from the process-wide registry, creating it on
/// first use.
///
/// # Panics
///
/// Panics if the table has to be created outside a Tokio runtime.
pub fn cache(name: &str) -> Arc<CacheTable> {
    CacheRegistry::global().get_or_create(name)
}
