//! Chats and chat membership
//!
//! Provides the `Chat` entity, its participant join rows, and the repository
//! for both.

use crate::Result;
use crate::commands::user::User;
use crate::storage::Database;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// Whether a chat is one-to-one or a group conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    #[default]
    Direct,
    Group,
}

impl ChatKind {
    /// Build from the group flag
    pub fn from_group_flag(is_group: bool) -> Self {
        if is_group { ChatKind::Group } else { ChatKind::Direct }
    }

    /// Convert to the integer flag stored in `chats.is_group_chat`
    pub fn as_flag(&self) -> i64 {
        match self {
            ChatKind::Direct => 0,
            ChatKind::Group => 1,
        }
    }

    /// Parse from the stored integer flag
    pub fn from_flag(flag: i64) -> Self {
        Self::from_group_flag(flag != 0)
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Direct => "direct",
            ChatKind::Group => "group",
        }
    }
}

/// A conversation between users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Auto-assigned chat identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Direct or group chat
    pub kind: ChatKind,
    /// When the chat was created
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub chat_id: i64,
    pub user_id: i64,
}

/// Chat repository for database operations
pub struct ChatRepository<'a> {
    db: &'a Database,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a chat stamped with the current time
    pub async fn create(&self, name: &str, kind: ChatKind) -> Result<Chat> {
        let created_at = Utc::now();
        let id = sqlx::query("INSERT INTO chats (name, is_group_chat, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(kind.as_flag())
            .bind(created_at)
            .execute(self.db.pool())
            .await?
            .last_insert_rowid();

        Ok(Chat {
            id,
            name: name.to_string(),
            kind,
            created_at,
        })
    }

    /// Get a chat by ID
    pub async fn get(&self, id: i64) -> Result<Option<Chat>> {
        let row = sqlx::query("SELECT id, name, is_group_chat, created_at FROM chats WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|r| self.row_to_chat(r)))
    }

    /// List all chats in id order
    pub async fn list(&self) -> Result<Vec<Chat>> {
        let rows = sqlx::query("SELECT id, name, is_group_chat, created_at FROM chats ORDER BY id")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(|r| self.row_to_chat(r)).collect())
    }

    /// List the chats a user participates in
    pub async fn list_by_participant(&self, user_id: i64) -> Result<Vec<Chat>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.is_group_chat, c.created_at
            FROM chats c
            JOIN chat_participants p ON p.chat_id = c.id
            WHERE p.user_id = ?
            ORDER BY c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|r| self.row_to_chat(r)).collect())
    }

    /// Add a participant row
    ///
    /// Neither id is checked for existence.
    pub async fn add_participant(&self, chat_id: i64, user_id: i64) -> Result<ChatParticipant> {
        sqlx::query("INSERT INTO chat_participants (chat_id, user_id) VALUES (?, ?)")
            .bind(chat_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        Ok(ChatParticipant { chat_id, user_id })
    }

    /// List the users joined to a chat
    ///
    /// Participant rows pointing at deleted users are skipped.
    pub async fn participants(&self, chat_id: i64) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, u.email
            FROM users u
            JOIN chat_participants p ON p.user_id = u.id
            WHERE p.chat_id = ?
            ORDER BY u.id
            "#,
        )
        .bind(chat_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| User {
                id: r.get("id"),
                username: r.get("username"),
                email: r.get("email"),
            })
            .collect())
    }

    /// Count all chats
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chats")
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }

    /// Count all participant rows
    pub async fn count_participants(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_participants")
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }

    /// Convert a database row to a Chat
    fn row_to_chat(&self, row: sqlx::sqlite::SqliteRow) -> Chat {
        Chat {
            id: row.get("id"),
            name: row.get("name"),
            kind: ChatKind::from_flag(row.get("is_group_chat")),
            created_at: row.get("created_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::commands::user::UserRepository;

    async fn create_test_db() -> Database {
        Database::in_memory()
            .await
            .expect("Failed to create test database")
    }

    #[test]
    fn test_chat_kind_flag() {
        assert_eq!(ChatKind::Direct.as_flag(), 0);
        assert_eq!(ChatKind::Group.as_flag(), 1);
        assert_eq!(ChatKind::from_flag(1), ChatKind::Group);
        assert_eq!(ChatKind::from_flag(0), ChatKind::Direct);
        assert!(ChatKind::from_group_flag(true).is_group());
        assert_eq!(ChatKind::default(), ChatKind::Direct);
    }

    #[tokio::test]
    async fn test_chat_create_and_get() {
        let db = create_test_db().await;
        let repo = ChatRepository::new(&db);

        let before = Utc::now();
        let chat = repo
            .create("Team", ChatKind::Group)
            .await
            .expect("Failed to create");

        let retrieved = repo
            .get(chat.id)
            .await
            .expect("Failed to get")
            .expect("Chat not found");

        assert_eq!(retrieved.id, 1);
        assert_eq!(retrieved.name, "Team");
        assert_eq!(retrieved.kind, ChatKind::Group);
        assert!(retrieved.created_at >= before);
        assert_eq!(retrieved.created_at, chat.created_at);
    }

    #[tokio::test]
    async fn test_chat_get_missing() {
        let db = create_test_db().await;
        let repo = ChatRepository::new(&db);

        assert!(repo.get(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_participant() {
        let db = create_test_db().await;
        let users = UserRepository::new(&db);
        let repo = ChatRepository::new(&db);

        let alice = users.create("alice", "alice@example.com").await.unwrap();
        let bob = users.create("bob", "bob@example.com").await.unwrap();

        let direct = repo.create("alice & bob", ChatKind::Direct).await.unwrap();
        let group = repo.create("everyone", ChatKind::Group).await.unwrap();
        let other = repo.create("bob only", ChatKind::Group).await.unwrap();

        repo.add_participant(direct.id, alice.id).await.unwrap();
        repo.add_participant(direct.id, bob.id).await.unwrap();
        repo.add_participant(group.id, alice.id).await.unwrap();
        repo.add_participant(other.id, bob.id).await.unwrap();

        let chats: Vec<_> = repo
            .list_by_participant(alice.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(chats, vec![direct.id, group.id]);
    }

    #[tokio::test]
    async fn test_duplicate_participant_rejected() {
        let db = create_test_db().await;
        let repo = ChatRepository::new(&db);

        let chat = repo.create("pair", ChatKind::Direct).await.unwrap();
        repo.add_participant(chat.id, 1).await.unwrap();

        let err = repo
            .add_participant(chat.id, 1)
            .await
            .expect_err("Duplicate participant should fail");
        assert!(matches!(err, Error::UniqueViolation(_)));

        // The user still sees the chat exactly once
        assert_eq!(repo.list_by_participant(1).await.unwrap().len(), 1);
        assert_eq!(repo.count_participants().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_participant_allows_dangling_ids() {
        let db = create_test_db().await;
        let repo = ChatRepository::new(&db);

        let participant = repo.add_participant(10, 20).await.unwrap();
        assert_eq!(participant, ChatParticipant { chat_id: 10, user_id: 20 });
        assert_eq!(repo.count_participants().await.unwrap(), 1);

        // No chat row exists, so the join yields nothing
        assert!(repo.list_by_participant(20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_participants_lists_existing_users() {
        let db = create_test_db().await;
        let users = UserRepository::new(&db);
        let repo = ChatRepository::new(&db);

        let alice = users.create("alice", "alice@example.com").await.unwrap();
        let bob = users.create("bob", "bob@example.com").await.unwrap();
        let chat = repo.create("pair", ChatKind::Direct).await.unwrap();
        repo.add_participant(chat.id, bob.id).await.unwrap();
        repo.add_participant(chat.id, alice.id).await.unwrap();

        let members = repo.participants(chat.id).await.unwrap();
        assert_eq!(members, vec![alice.clone(), bob.clone()]);

        users.delete(bob.id).await.unwrap();
        let members = repo.participants(chat.id).await.unwrap();
        assert_eq!(members, vec![alice]);
        // The membership row itself is left behind
        assert_eq!(repo.count_participants().await.unwrap(), 2);
    }
}
