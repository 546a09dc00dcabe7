use std::sync::Arc;

use mysite_core::config::{EndpointConfig, EndpointKind, SiteConfig};
use mysite_db::store::RecordStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference-counted and the configuration
/// sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: mysite_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Transactional record persistence.
    pub store: RecordStore,
}

impl AppState {
    pub fn new(pool: mysite_db::DbPool, config: ServerConfig) -> Self {
        let store = RecordStore::new(pool.clone(), config.site.store.clone());
        Self {
            pool,
            config: Arc::new(config),
            store,
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.config.site
    }

    pub fn endpoint(&self, kind: EndpointKind) -> &EndpointConfig {
        self.config.site.endpoint(kind)
    }
}
