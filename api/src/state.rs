//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::config::DashboardConfig;
use shared::dashboard::Dashboard;
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// Cloning is cheap; all clones share the same dashboard.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The dashboard core.
    dashboard: Arc<Dashboard>,
}

impl AppState {
    /// Creates a new application state around an existing dashboard.
    #[must_use]
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        Self { dashboard }
    }

    /// Creates a new application state with in-memory stores built from `config`.
    #[must_use]
    pub fn from_config(config: DashboardConfig) -> Self {
        Self::new(Arc::new(Dashboard::from_config(config)))
    }

    /// Creates a new application state with in-memory stores.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        Self::from_config(DashboardConfig::default())
    }

    /// Returns a reference to the dashboard.
    #[must_use]
    pub fn dashboard(&self) -> &Dashboard {
        self.dashboard.as_ref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}
