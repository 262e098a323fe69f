//! Configuration loading, database initialization and status

use anyhow::{Context, Result};
use points_business::{LedgerConfig, ServiceContext};
use points_persistence::{AccountRepo, Database, PiggyTransactionRepo, PointTransactionRepo};
use std::path::{Path, PathBuf};

/// Defaults, then the config file, then POINTS_* variables, then `--db`
pub fn load_config(path: Option<&Path>, db_override: Option<&str>) -> Result<LedgerConfig> {
    let config = match path {
        Some(path) => LedgerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    let mut config = config
        .with_env_overrides()
        .context("Invalid POINTS_* environment override")?;

    if let Some(url) = db_override {
        config.database_url = url.to_string();
    }
    Ok(config)
}

/// Open the configured database, creating parent directories for file URLs
pub async fn connect(config: LedgerConfig) -> Result<ServiceContext> {
    if let Some(parent) = database_file(&config.database_url)
        .as_deref()
        .and_then(Path::parent)
    {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    ServiceContext::connect(config)
        .await
        .context("Failed to connect to database")
}

/// Create the database file and schema
pub async fn init_database(config: &LedgerConfig, force: bool) -> Result<()> {
    if force {
        if let Some(path) = database_file(&config.database_url).filter(|p| p.exists()) {
            std::fs::remove_file(&path).context("Failed to remove existing database")?;
            println!("🗑️  Removed existing database");
        }
    }

    let ctx = connect(config.clone()).await?;
    ctx.db().close().await;
    println!("✅ Database initialized at {}", config.database_url);
    Ok(())
}

/// Show database status
pub async fn show_status(config: &LedgerConfig) -> Result<()> {
    if let Some(path) = database_file(&config.database_url) {
        if !path.exists() {
            println!("❌ Database not found at {}", path.display());
            println!("   Run 'points init' to create the database");
            return Ok(());
        }
    }

    let db = Database::connect(&config.database_url, &config.pool_settings()).await?;
    let pool = db.pool();

    println!("📊 Database Status");
    println!("   URL: {}", config.database_url);
    println!();
    println!("   Accounts:           {}", AccountRepo::count(pool).await?);
    println!("   Point transfers:    {}", PointTransactionRepo::count(pool).await?);
    println!("   Piggy bank entries: {}", PiggyTransactionRepo::count(pool).await?);

    db.close().await;
    Ok(())
}

/// File path behind a SQLite URL, None for in-memory databases
fn database_file(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
