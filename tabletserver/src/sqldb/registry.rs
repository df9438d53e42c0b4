//! Registry of connection factories, keyed by driver name.
//!
//! A backend registers a factory under a name; whatever constructs
//! connections is handed the registry and asks for a connection by name.
//! There is no process-wide default: every registry is an explicit object.
//!
//! # Thread Safety
//!
//! The factory map sits behind an `RwLock`. `connect` clones the factory out
//! of the map and releases the lock before invoking it, so a factory may take
//! its own locks without any ordering concerns against the registry.
//!
//! # Invariants
//!
//! - Each name maps to at most one factory; registering again replaces it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::sqldb::{DbConnection, SqlError};

/// A connection factory: returns a live connection or a connect error.
pub type ConnectFn = dyn Fn() -> Result<Box<dyn DbConnection>, SqlError> + Send + Sync;

/// Registry of connection factories, keyed by driver name.
#[derive(Default)]
pub struct DriverRegistry {
    factories: RwLock<HashMap<String, Arc<ConnectFn>>>,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous registration.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn DbConnection>, SqlError> + Send + Sync + 'static,
    {
        let replaced = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(factory))
            .is_some();
        if replaced {
            tracing::debug!("Replaced driver '{}'", name);
        } else {
            tracing::debug!("Registered driver '{}'", name);
        }
    }

    /// Remove the factory registered under `name`, if any.
    pub fn unregister(&self, name: &str) {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Whether a factory is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Open a new connection through the factory registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `SqlError::UnknownDriver` if nothing is registered under
    /// `name`, or whatever error the factory reports.
    pub fn connect(&self, name: &str) -> Result<Box<dyn DbConnection>, SqlError> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| SqlError::UnknownDriver(name.to_string()))?;
        factory()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = factories.keys().collect();
        names.sort();
        f.debug_struct("DriverRegistry")
            .field("drivers", &names)
            .finish()
    }
}
