//! SQLite database operations
//!
//! Provides the single-connection session and database initialization for the
//! messaging store.

use crate::storage::migrations;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Database file name used when no path is configured
pub const DEFAULT_DATABASE_FILE: &str = "messengers.db";

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Whether to run migrations automatically
    pub auto_migrate: bool,
    /// Whether SQLite should enforce the declared foreign keys
    pub enforce_foreign_keys: bool,
    /// Journal mode (default: WAL)
    pub journal_mode: SqliteJournalMode,
    /// Synchronous mode (default: NORMAL for balance of safety/performance)
    pub synchronous: SqliteSynchronous,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            auto_migrate: true,
            enforce_foreign_keys: false,
            journal_mode: SqliteJournalMode::Wal,
            synchronous: SqliteSynchronous::Normal,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database config with the specified path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a config for an in-memory database (useful for testing)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            journal_mode: SqliteJournalMode::Memory,
            ..Default::default()
        }
    }

    /// Enable or disable foreign key enforcement
    pub fn enforce_foreign_keys(mut self, enforce: bool) -> Self {
        self.enforce_foreign_keys = enforce;
        self
    }

    /// Set the journal mode
    pub fn journal_mode(mut self, mode: SqliteJournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Disable automatic migrations
    pub fn no_migrate(mut self) -> Self {
        self.auto_migrate = false;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.path.to_string_lossy() == ":memory:"
    }
}

/// Get the default database path
pub fn default_database_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("messenger").join(DEFAULT_DATABASE_FILE)
    } else {
        PathBuf::from(DEFAULT_DATABASE_FILE)
    }
}

/// Parse a journal mode name as written in configuration
pub fn parse_journal_mode(name: &str) -> Option<SqliteJournalMode> {
    match name.to_ascii_lowercase().as_str() {
        "delete" => Some(SqliteJournalMode::Delete),
        "truncate" => Some(SqliteJournalMode::Truncate),
        "persist" => Some(SqliteJournalMode::Persist),
        "memory" => Some(SqliteJournalMode::Memory),
        "wal" => Some(SqliteJournalMode::Wal),
        "off" => Some(SqliteJournalMode::Off),
        _ => None,
    }
}

/// Database session wrapper
///
/// Holds exactly one SQLite connection for its whole lifetime, so every
/// statement runs sequentially on the same session and commits on its own.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    config: DatabaseConfig,
}

impl Database {
    /// Create a new database connection with the given configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() && !config.is_in_memory() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
            }
        }

        // File paths are passed through as-is, never parsed as a connection URL
        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new().filename(&config.path)
        };

        // sqlx turns foreign keys on by default; the schema relies on them being opt-in
        let connect_options = connect_options
            .journal_mode(config.journal_mode)
            .synchronous(config.synchronous)
            .foreign_keys(config.enforce_foreign_keys)
            .create_if_missing(true);

        // One persistent connection: an in-memory database lives only as long as it does
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("Failed to connect to database: {:?}", config.path))?;

        tracing::debug!(
            path = %config.path.display(),
            foreign_keys = config.enforce_foreign_keys,
            "Opened database session"
        );

        let db = Self {
            pool,
            config: config.clone(),
        };

        if config.auto_migrate {
            db.migrate().await?;
        }

        Ok(db)
    }

    /// Create an in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self> {
        Self::new(DatabaseConfig::in_memory()).await
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool)
            .await
            .context("Failed to run database migrations")
    }

    /// Check migration status
    pub async fn migration_status(&self) -> Result<migrations::MigrationStatus> {
        migrations::migration_status(&self.pool)
            .await
            .context("Failed to check migration status")
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Close the database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }
}
