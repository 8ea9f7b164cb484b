//! Messenger Core Library
//!
//! This crate provides the core functionality for Messenger, including:
//! - Storage (SQLite session + versioned migrations)
//! - Entities and repositories (users, chats, participants, messages)
//! - The `MessagingStore` CRUD facade
//! - The sample-data seed script
//! - Configuration

pub mod commands;
pub mod config;
pub mod error;
pub mod seed;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
pub use store::{MessagingStore, StoreStats};
