//! # Points Persistence
//!
//! SQLite store for the points ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Database                           │
//! │  ┌──────────────┐   ┌────────────────────┐   ┌──────────┐ │
//! │  │  accounts    │   │ point_transactions │   │  piggy_  │ │
//! │  │ (mutable)    │   │   (append-only)    │   │ bank_tx  │ │
//! │  └──────────────┘   └────────────────────┘   └──────────┘ │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use points_persistence::{AccountRepo, Database, PoolSettings};
//!
//! let db = Database::connect("sqlite:data/points.db?mode=rwc", &PoolSettings::default()).await?;
//! let account = AccountRepo::get_by_id(db.pool(), user_id).await?;
//! ```

pub mod error;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::repos::PoolSettings;
pub use sqlite::schema::{AccountRow, PiggyTransactionRow, PointTransactionRow};
pub use sqlite::{
    connect_pool, create_schema, AccountRepo, NewAccountRow, PiggyTransactionRepo,
    PointTransactionRepo,
};

use sqlx::{Sqlite, SqlitePool, Transaction};

/// Database facade - owns the connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and bootstrap the schema
    ///
    /// # Arguments
    /// * `database_url` - SQLite URL (e.g., "sqlite:points.db?mode=rwc" or "sqlite::memory:")
    /// * `settings` - pool size and write-lock wait
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> PersistenceResult<Self> {
        let pool = connect_pool(database_url, settings).await?;
        tracing::info!(url = database_url, "database ready");
        Ok(Self { pool })
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> PersistenceResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
