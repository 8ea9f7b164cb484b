//! Storage layer - SQLite session and schema migrations
//!
//! # Architecture
//!
//! - `database`: Single-connection session management and initialization
//! - `migrations`: Schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use messenger_core::storage::{Database, DatabaseConfig};
//!
//! // Create an in-memory database for testing
//! let db = Database::in_memory().await?;
//!
//! // Or open the database file used by the CLI
//! let db = Database::new(DatabaseConfig::with_path("messengers.db")).await?;
//! ```

pub mod database;
pub mod migrations;

pub use database::{
    default_database_path, parse_journal_mode, Database, DatabaseConfig, DEFAULT_DATABASE_FILE,
};
pub use migrations::{migration_status, run_migrations, MigrationStatus, CURRENT_VERSION};
