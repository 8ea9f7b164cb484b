//! User records
//!
//! Provides the `User` entity and its repository.

use crate::Result;
use crate::storage::Database;
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Auto-assigned user identifier
    pub id: i64,
    /// Unique display name
    pub username: String,
    /// Unique email address
    pub email: String,
}

/// Field changes for `UserRepository::update`
///
/// `None` and empty strings both leave the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserUpdate {
    /// Change the username
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Change the email address
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Apply the supplied non-empty fields to a user
    pub fn apply_to(&self, user: &mut User) {
        if let Some(username) = self.username.as_deref().filter(|s| !s.is_empty()) {
            user.username = username.to_string();
        }
        if let Some(email) = self.email.as_deref().filter(|s| !s.is_empty()) {
            user.email = email.to_string();
        }
    }
}

/// User repository for database operations
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a user and return it with its assigned id
    pub async fn create(&self, username: &str, email: &str) -> Result<User> {
        let id = sqlx::query("INSERT INTO users (username, email) VALUES (?, ?)")
            .bind(username)
            .bind(email)
            .execute(self.db.pool())
            .await?
            .last_insert_rowid();

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    /// Get a user by ID
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| self.row_to_user(r)))
    }

    /// List all users in id order
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, username, email FROM users ORDER BY id")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(|r| self.row_to_user(r)).collect())
    }

    /// Persist a user's username and email
    pub async fn save(&self, user: &User) -> Result<()> {
        sqlx::query("UPDATE users SET username = ?, email = ? WHERE id = ?")
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Load a user, apply the supplied fields and persist it
    ///
    /// Returns `None` if no user has the given id.
    pub async fn update(&self, id: i64, changes: &UserUpdate) -> Result<Option<User>> {
        let Some(mut user) = self.get(id).await? else {
            return Ok(None);
        };

        changes.apply_to(&mut user);
        self.save(&user).await?;
        Ok(Some(user))
    }

    /// Delete a user row
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all users
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }

    /// Convert a database row to a User
    fn row_to_user(&self, row: sqlx::sqlite::SqliteRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
        }
    }
}
