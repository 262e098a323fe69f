//! Service context
//!
//! Everything a service needs: the database and the configuration it was
//! started with. Built once at startup and shared by reference.

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use points_persistence::Database;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Context for ledger operations - database access plus configuration
#[derive(Clone)]
pub struct ServiceContext {
    db: Database,
    config: Arc<LedgerConfig>,
}

impl ServiceContext {
    /// Create a context from an open database
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Open the database named in `config` and build a context around it
    pub async fn connect(config: LedgerConfig) -> LedgerResult<Self> {
        let db = Database::connect(&config.database_url, &config.pool_settings()).await?;
        Ok(Self::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}
