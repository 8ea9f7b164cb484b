//! Chat messages
//!
//! Provides the `Message` entity and its repository.

use crate::Result;
use crate::storage::Database;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// A text message posted to a chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Auto-assigned message identifier
    pub id: i64,
    /// Chat the message was posted to
    pub chat_id: i64,
    /// Author of the message
    pub sender_id: i64,
    /// Message text
    pub content: String,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
}

/// A message together with its sender's current username
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageWithSender {
    #[serde(flatten)]
    pub message: Message,
    /// `None` once the sender row no longer exists
    pub sender_username: Option<String>,
}

impl MessageWithSender {
    /// Render as `<sender>: <content>`, or the no-sender fallback line
    pub fn display_line(&self) -> String {
        match &self.sender_username {
            Some(username) => format!("{}: {}", username, self.message.content),
            None => format!("Message without sender: {}", self.message.content),
        }
    }
}

/// Message repository for database operations
pub struct MessageRepository<'a> {
    db: &'a Database,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a message stamped with the current time
    pub async fn create(&self, chat_id: i64, sender_id: i64, content: &str) -> Result<Message> {
        let timestamp = Utc::now();
        let id = sqlx::query(
            "INSERT INTO messages (chat_id, sender_id, content, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .bind(timestamp)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        Ok(Message {
            id,
            chat_id,
            sender_id,
            content: content.to_string(),
            timestamp,
        })
    }

    /// Get a message by ID
    pub async fn get(&self, id: i64) -> Result<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, chat_id, sender_id, content, timestamp FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| self.row_to_message(&r)))
    }

    /// List all messages in a chat in insertion order
    pub async fn list_by_chat(&self, chat_id: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, sender_id, content, timestamp FROM messages WHERE chat_id = ? ORDER BY id",
        )
        .bind(chat_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(|r| self.row_to_message(r)).collect())
    }

    /// List all messages in a chat with their sender's username
    pub async fn list_by_chat_with_sender(&self, chat_id: i64) -> Result<Vec<MessageWithSender>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.chat_id, m.sender_id, m.content, m.timestamp, u.username
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE m.chat_id = ?
            ORDER BY m.id
            "#,
        )
        .bind(chat_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|r| MessageWithSender {
                message: self.row_to_message(r),
                sender_username: r.get("username"),
            })
            .collect())
    }

    /// Replace a message's content
    ///
    /// Returns `None` if no message has the given id.
    pub async fn update_content(&self, id: i64, content: &str) -> Result<Option<Message>> {
        let Some(mut message) = self.get(id).await? else {
            return Ok(None);
        };

        sqlx::query("UPDATE messages SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(self.db.pool())
            .await?;

        message.content = content.to_string();
        Ok(Some(message))
    }

    /// Delete a message
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every message sent by a user, returning how many were removed
    pub async fn delete_by_sender(&self, sender_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE sender_id = ?")
            .bind(sender_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Count messages sent by a user
    pub async fn count_by_sender(&self, sender_id: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE sender_id = ?")
            .bind(sender_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }

    /// Count all messages
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }

    /// Convert a database row to a Message
    fn row_to_message(&self, row: &sqlx::sqlite::SqliteRow) -> Message {
        Message {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            sender_id: row.get("sender_id"),
            content: row.get("content"),
            timestamp: row.get("timestamp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::chat::{ChatKind, ChatRepository};
    use crate::commands::user::UserRepository;

    async fn create_test_db() -> Database {
        Database::in_memory()
            .await
            .expect("Failed to create test database")
    }

    /// Create two users and a chat, returning (chat_id, alice_id, bob_id)
    async fn create_test_chat(db: &Database) -> (i64, i64, i64) {
        let users = UserRepository::new(db);
        let alice = users.create("alice", "alice@example.com").await.unwrap();
        let bob = users.create("bob", "bob@example.com").await.unwrap();
        let chat = ChatRepository::new(db)
            .create("alice & bob", ChatKind::Direct)
            .await
            .unwrap();
        (chat.id, alice.id, bob.id)
    }

    #[tokio::test]
    async fn test_message_create_and_get() {
        let db = create_test_db().await;
        let (chat_id, alice, _) = create_test_chat(&db).await;
        let repo = MessageRepository::new(&db);

        let message = repo.create(chat_id, alice, "Hello!").await.expect("Failed to create");

        let retrieved = repo
            .get(message.id)
            .await
            .expect("Failed to get")
            .expect("Message not found");

        assert_eq!(retrieved.content, "Hello!");
        assert_eq!(retrieved.sender_id, alice);
        assert_eq!(retrieved.chat_id, chat_id);
    }

    #[tokio::test]
    async fn test_list_by_chat_in_insertion_order() {
        let db = create_test_db().await;
        let (chat_id, alice, bob) = create_test_chat(&db).await;
        let repo = MessageRepository::new(&db);

        for i in 0..5 {
            let sender = if i % 2 == 0 { alice } else { bob };
            repo.create(chat_id, sender, &format!("Message {}", i)).await.unwrap();
        }
        repo.create(chat_id + 1, alice, "elsewhere").await.unwrap();

        let messages = repo.list_by_chat(chat_id).await.expect("Failed to list");

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].content, "Message 0");
        assert_eq!(messages[4].content, "Message 4");
        assert_eq!(messages[1].sender_id, bob);
    }

    #[tokio::test]
    async fn test_list_with_sender_reports_missing_sender() {
        let db = create_test_db().await;
        let (chat_id, alice, _) = create_test_chat(&db).await;
        let repo = MessageRepository::new(&db);

        repo.create(chat_id, alice, "from alice").await.unwrap();
        repo.create(chat_id, 99, "from nobody").await.unwrap();

        let messages = repo.list_by_chat_with_sender(chat_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_username.as_deref(), Some("alice"));
        assert_eq!(messages[0].display_line(), "alice: from alice");
        assert!(messages[1].sender_username.is_none());
        assert_eq!(messages[1].display_line(), "Message without sender: from nobody");
    }

    #[tokio::test]
    async fn test_update_content() {
        let db = create_test_db().await;
        let (chat_id, alice, _) = create_test_chat(&db).await;
        let repo = MessageRepository::new(&db);

        let message = repo.create(chat_id, alice, "draft").await.unwrap();
        let updated = repo
            .update_content(message.id, "final")
            .await
            .unwrap()
            .expect("Message should exist");

        assert_eq!(updated.content, "final");
        assert_eq!(updated.timestamp, message.timestamp);
        assert_eq!(repo.get(message.id).await.unwrap().unwrap().content, "final");

        assert!(repo.update_content(1000, "nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = create_test_db().await;
        let (chat_id, alice, _) = create_test_chat(&db).await;
        let repo = MessageRepository::new(&db);

        let keep = repo.create(chat_id, alice, "keep").await.unwrap();
        let gone = repo.create(chat_id, alice, "gone").await.unwrap();

        assert!(repo.delete(gone.id).await.unwrap());
        assert!(!repo.delete(gone.id).await.unwrap());
        assert!(repo.get(gone.id).await.unwrap().is_none());
        assert!(repo.get(keep.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_by_sender() {
        let db = create_test_db().await;
        let (chat_id, alice, bob) = create_test_chat(&db).await;
        let repo = MessageRepository::new(&db);

        for i in 0..3 {
            repo.create(chat_id, alice, &format!("alice {}", i)).await.unwrap();
        }
        repo.create(chat_id, bob, "bob").await.unwrap();

        assert_eq!(repo.count_by_sender(alice).await.unwrap(), 3);
        assert_eq!(repo.delete_by_sender(alice).await.unwrap(), 3);
        assert_eq!(repo.count_by_sender(alice).await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
