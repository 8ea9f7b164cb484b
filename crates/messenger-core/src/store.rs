//! Messaging store
//!
//! A single facade over the four tables. Every operation runs on the shared
//! database session and commits as soon as its statement completes; there are
//! no multi-statement transactions.
//!
//! Update and delete operations report a missing row as `Ok(None)` rather than
//! an error.

use crate::Result;
use crate::commands::{
    Chat, ChatKind, ChatParticipant, ChatRepository, Message, MessageRepository,
    MessageWithSender, User, UserRepository, UserUpdate,
};
use crate::storage::{Database, DatabaseConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Row counts for each table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub users: i64,
    pub chats: i64,
    pub participants: i64,
    pub messages: i64,
}

/// CRUD operations over users, chats, participants and messages
#[derive(Debug, Clone)]
pub struct MessagingStore {
    db: Database,
}

impl MessagingStore {
    /// Wrap an already opened database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (creating if absent) the database described by `config`
    pub async fn open(config: DatabaseConfig) -> anyhow::Result<Self> {
        Ok(Self::new(Database::new(config).await?))
    }

    /// Open a fresh in-memory store (useful for testing)
    pub async fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(Database::in_memory().await?))
    }

    /// Get the underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.db)
    }

    fn chats(&self) -> ChatRepository<'_> {
        ChatRepository::new(&self.db)
    }

    fn messages(&self) -> MessageRepository<'_> {
        MessageRepository::new(&self.db)
    }

    // ========== Create ==========

    /// Insert a user; a taken username or email is a `UniqueViolation`
    pub async fn create_user(&self, username: &str, email: &str) -> Result<User> {
        let user = self.users().create(username, email).await?;
        debug!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Insert a chat stamped with the current time
    pub async fn create_chat(&self, name: &str, is_group: bool) -> Result<Chat> {
        let chat = self
            .chats()
            .create(name, ChatKind::from_group_flag(is_group))
            .await?;
        debug!(chat_id = chat.id, kind = chat.kind.as_str(), "Created chat");
        Ok(chat)
    }

    /// Join a user to a chat without checking that either exists
    pub async fn add_participant(&self, chat_id: i64, user_id: i64) -> Result<ChatParticipant> {
        let participant = self.chats().add_participant(chat_id, user_id).await?;
        debug!(chat_id, user_id, "Added participant");
        Ok(participant)
    }

    /// Post a message stamped with the current time
    pub async fn send_message(&self, chat_id: i64, sender_id: i64, content: &str) -> Result<Message> {
        let message = self.messages().create(chat_id, sender_id, content).await?;
        debug!(message_id = message.id, chat_id, sender_id, "Sent message");
        Ok(message)
    }

    // ========== Read ==========

    /// All messages of a chat in insertion order
    pub async fn get_chat_messages(&self, chat_id: i64) -> Result<Vec<Message>> {
        self.messages().list_by_chat(chat_id).await
    }

    /// All messages of a chat with their sender's username, if the sender still exists
    pub async fn get_chat_messages_with_sender(&self, chat_id: i64) -> Result<Vec<MessageWithSender>> {
        self.messages().list_by_chat_with_sender(chat_id).await
    }

    /// All chats the user participates in
    pub async fn get_user_chats(&self, user_id: i64) -> Result<Vec<Chat>> {
        self.chats().list_by_participant(user_id).await
    }

    /// Users joined to a chat
    pub async fn get_chat_participants(&self, chat_id: i64) -> Result<Vec<User>> {
        self.chats().participants(chat_id).await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.users().get(user_id).await
    }

    pub async fn get_chat(&self, chat_id: i64) -> Result<Option<Chat>> {
        self.chats().get(chat_id).await
    }

    pub async fn get_message(&self, message_id: i64) -> Result<Option<Message>> {
        self.messages().get(message_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users().list().await
    }

    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.chats().list().await
    }

    pub async fn count_messages_by_sender(&self, user_id: i64) -> Result<i64> {
        self.messages().count_by_sender(user_id).await
    }

    /// Row counts for every table
    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.users().count().await?,
            chats: self.chats().count().await?,
            participants: self.chats().count_participants().await?,
            messages: self.messages().count().await?,
        })
    }

    // ========== Update ==========

    /// Change a user's username and/or email
    ///
    /// Only supplied, non-empty fields are written. Returns the updated user,
    /// or `None` if no user has that id.
    pub async fn update_user(
        &self,
        user_id: i64,
        new_username: Option<&str>,
        new_email: Option<&str>,
    ) -> Result<Option<User>> {
        let changes = UserUpdate {
            username: new_username.map(str::to_string),
            email: new_email.map(str::to_string),
        };

        let updated = self.users().update(user_id, &changes).await?;
        match &updated {
            Some(user) => debug!(user_id, username = %user.username, "Updated user"),
            None => warn!(user_id, "Update skipped: user not found"),
        }
        Ok(updated)
    }

    /// Replace a message's content; `None` if no message has that id
    pub async fn update_message(&self, message_id: i64, new_content: &str) -> Result<Option<Message>> {
        let updated = self.messages().update_content(message_id, new_content).await?;
        if updated.is_none() {
            warn!(message_id, "Update skipped: message not found");
        }
        Ok(updated)
    }

    // ========== Delete ==========

    /// Delete a user after deleting every message they sent
    ///
    /// The two deletes commit separately. Participant rows naming the user are
    /// left in place. Returns the user as it was before deletion, or `None` if
    /// no user has that id.
    pub async fn delete_user(&self, user_id: i64) -> Result<Option<User>> {
        let Some(user) = self.users().get(user_id).await? else {
            warn!(user_id, "Delete skipped: user not found");
            return Ok(None);
        };

        let removed = self.messages().delete_by_sender(user_id).await?;
        self.users().delete(user_id).await?;

        info!(user_id, messages_removed = removed, "Deleted user");
        Ok(Some(user))
    }

    /// Delete one message, returning it; `None` if no message has that id
    pub async fn delete_message(&self, message_id: i64) -> Result<Option<Message>> {
        let Some(message) = self.messages().get(message_id).await? else {
            warn!(message_id, "Delete skipped: message not found");
            return Ok(None);
        };

        self.messages().delete(message_id).await?;
        debug!(message_id, "Deleted message");
        Ok(Some(message))
    }
}
