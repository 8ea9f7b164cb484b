//! Sample data and the scripted demo run
//!
//! `run` populates a store with ten users, three chats and fifteen messages,
//! then performs one update, one delete and one query of each kind. The
//! outcome is collected into a `SeedReport`.
//!
//! Positions in the fixture tables below are 1-based and refer to the order
//! rows are created in; on an empty database they equal the assigned ids.

use crate::commands::{Chat, Message, MessageWithSender, User};
use crate::store::MessagingStore;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// (username, email) for each sample user
pub const USERS: [(&str, &str); 10] = [
    ("ІванКоваль", "ivan.koval@mail.com"),
    ("ОленаШевченко", "olena.shevchenko@mail.com"),
    ("МаксимМельник", "maksym.melnyk@mail.com"),
    ("КатеринаПетренко", "kateryna.petrenko@mail.com"),
    ("ВіталійЛисенко", "vitalii.lysenko@mail.com"),
    ("НаталіяСидоренко", "natalia.sydorenko@mail.com"),
    ("АндрійСавченко", "andrii.savchenko@mail.com"),
    ("МаріяДорошенко", "maria.doroshenko@mail.com"),
    ("ЮрійКовальчук", "yurii.kovalchuk@mail.com"),
    ("ДмитроГречко", "dmytro.hrechko@mail.com"),
];

/// (name, is_group) for each sample chat
pub const CHATS: [(&str, bool); 3] = [
    ("Іван & Олена", false),
    ("Максим & Катерина", false),
    ("Груповий чат", true),
];

/// (chat, user) positions joined together
pub const PARTICIPANTS: [(usize, usize); 11] = [
    (1, 1),
    (1, 2),
    (2, 3),
    (2, 4),
    (3, 1),
    (3, 2),
    (3, 3),
    (3, 4),
    (3, 5),
    (3, 6),
    (3, 7),
];

/// (chat, sender, content) for each sample message
pub const MESSAGES: [(usize, usize, &str); 15] = [
    (1, 1, "Привіт, Олено, як ти?"),
    (1, 2, "Все добре, дякую! А ти?"),
    (2, 3, "Привіт, Катерино! Як справи?"),
    (2, 4, "Вітаю! Все в порядку!"),
    (3, 5, "Привіт усім! Як поживаєте?"),
    (3, 6, "Все супер, дякую за запитання!"),
    (3, 1, "Хлопці, давайте обговоримо наші плани!"),
    (3, 2, "Згоден, вже час щось вирішити!"),
    (3, 3, "Я готовий до змін!"),
    (3, 4, "Я також!"),
    (3, 5, "Давайте зробимо це!"),
    (3, 6, "Збираємося вже завтра?"),
    (3, 7, "Так, давайте!"),
    (2, 1, "Я на зв'язку, чекаю на вашу відповідь!"),
    (2, 4, "Все, що потрібно, вже готово!"),
];

/// User renamed by the script
pub const RENAMED_USER: usize = 1;
pub const RENAMED_USERNAME: &str = "ІванКовальUpdated";

/// Message edited by the script
pub const EDITED_MESSAGE: usize = 1;
pub const EDITED_CONTENT: &str = "Привіт, Олено, як все?";

/// User deleted by the script
pub const DELETED_USER: usize = 6;

/// Message deleted by the script
pub const DELETED_MESSAGE: usize = 3;

/// Chat whose messages are listed
pub const LISTED_CHAT: usize = 3;

/// User whose chats are listed
pub const LISTED_USER: usize = 1;

/// Outcome of the scripted run, in print order
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub updated_user: User,
    pub updated_message: Message,
    pub deleted_user: User,
    pub deleted_message: Message,
    pub group_chat_messages: Vec<MessageWithSender>,
    pub listed_user_id: i64,
    pub user_chats: Vec<Chat>,
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Updated user: {}, {}",
            self.updated_user.username, self.updated_user.email
        )?;
        writeln!(f, "Updated message: {}", self.updated_message.content)?;
        writeln!(f, "Deleted user: {}", self.deleted_user.username)?;
        writeln!(f, "Deleted message: {}", self.deleted_message.content)?;
        writeln!(f, "Group chat messages:")?;
        for message in &self.group_chat_messages {
            writeln!(f, "{}", message.display_line())?;
        }
        writeln!(f, "Chats for user {}:", self.listed_user_id)?;
        for chat in &self.user_chats {
            writeln!(f, "{}", chat.name)?;
        }
        Ok(())
    }
}

/// Resolve a 1-based fixture position to the id created for it
fn id_at(ids: &[i64], position: usize) -> Result<i64> {
    position
        .checked_sub(1)
        .and_then(|index| ids.get(index))
        .copied()
        .ok_or_else(|| Error::InvalidInput(format!("No seeded row at position {}", position)))
}

/// Insert the sample users, chats, participants and messages
///
/// Returns the ids assigned to users, chats and messages, in fixture order.
pub async fn populate(store: &MessagingStore) -> Result<(Vec<i64>, Vec<i64>, Vec<i64>)> {
    let mut user_ids = Vec::with_capacity(USERS.len());
    for (username, email) in USERS {
        user_ids.push(store.create_user(username, email).await?.id);
    }

    let mut chat_ids = Vec::with_capacity(CHATS.len());
    for (name, is_group) in CHATS {
        chat_ids.push(store.create_chat(name, is_group).await?.id);
    }

    for (chat, user) in PARTICIPANTS {
        store
            .add_participant(id_at(&chat_ids, chat)?, id_at(&user_ids, user)?)
            .await?;
    }

    let mut message_ids = Vec::with_capacity(MESSAGES.len());
    for (chat, sender, content) in MESSAGES {
        let message = store
            .send_message(id_at(&chat_ids, chat)?, id_at(&user_ids, sender)?, content)
            .await?;
        message_ids.push(message.id);
    }

    info!(
        users = user_ids.len(),
        chats = chat_ids.len(),
        messages = message_ids.len(),
        "Seeded sample data"
    );
    Ok((user_ids, chat_ids, message_ids))
}

/// Populate the store, then run the scripted updates, deletes and queries
///
/// A target row that has gone missing is reported as the matching
/// not-found error.
pub async fn run(store: &MessagingStore) -> Result<SeedReport> {
    let (user_ids, chat_ids, message_ids) = populate(store).await?;

    let renamed_id = id_at(&user_ids, RENAMED_USER)?;
    let updated_user = store
        .update_user(renamed_id, Some(RENAMED_USERNAME), None)
        .await?
        .ok_or(Error::UserNotFound(renamed_id))?;

    let edited_id = id_at(&message_ids, EDITED_MESSAGE)?;
    let updated_message = store
        .update_message(edited_id, EDITED_CONTENT)
        .await?
        .ok_or(Error::MessageNotFound(edited_id))?;

    let deleted_user_id = id_at(&user_ids, DELETED_USER)?;
    let deleted_user = store
        .delete_user(deleted_user_id)
        .await?
        .ok_or(Error::UserNotFound(deleted_user_id))?;

    let deleted_message_id = id_at(&message_ids, DELETED_MESSAGE)?;
    let deleted_message = store
        .delete_message(deleted_message_id)
        .await?
        .ok_or(Error::MessageNotFound(deleted_message_id))?;

    let group_chat_messages = store
        .get_chat_messages_with_sender(id_at(&chat_ids, LISTED_CHAT)?)
        .await?;

    let listed_user_id = id_at(&user_ids, LISTED_USER)?;
    let user_chats = store.get_user_chats(listed_user_id).await?;

    Ok(SeedReport {
        updated_user,
        updated_message,
        deleted_user,
        deleted_message,
        group_chat_messages,
        listed_user_id,
        user_chats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_store() -> MessagingStore {
        MessagingStore::in_memory()
            .await
            .expect("Failed to create test store")
    }

    #[test]
    fn test_fixture_positions_in_range() {
        for (chat, user) in PARTICIPANTS {
            assert!((1..=CHATS.len()).contains(&chat));
            assert!((1..=USERS.len()).contains(&user));
        }
        for (chat, sender, _) in MESSAGES {
            assert!((1..=CHATS.len()).contains(&chat));
            assert!((1..=USERS.len()).contains(&sender));
        }
    }

    #[test]
    fn test_id_at() {
        let ids = [10, 20, 30];
        assert_eq!(id_at(&ids, 1).unwrap(), 10);
        assert_eq!(id_at(&ids, 3).unwrap(), 30);
        assert!(id_at(&ids, 0).is_err());
        assert!(id_at(&ids, 4).is_err());
    }

    #[tokio::test]
    async fn test_populate_assigns_sequential_ids() {
        let store = create_test_store().await;
        let (users, chats, messages) = populate(&store).await.unwrap();

        assert_eq!(users, (1..=10).collect::<Vec<i64>>());
        assert_eq!(chats, vec![1, 2, 3]);
        assert_eq!(messages, (1..=15).collect::<Vec<i64>>());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.participants, 11);
    }

    #[tokio::test]
    async fn test_run_report() {
        let store = create_test_store().await;
        let report = run(&store).await.expect("Seed run failed");

        assert_eq!(report.updated_user.id, 1);
        assert_eq!(report.updated_user.username, "ІванКовальUpdated");
        assert_eq!(report.updated_user.email, "ivan.koval@mail.com");

        assert_eq!(report.updated_message.content, "Привіт, Олено, як все?");
        assert_eq!(report.deleted_user.username, "НаталіяСидоренко");
        assert_eq!(report.deleted_message.content, "Привіт, Катерино! Як справи?");

        // Group chat had 9 messages, two of them from the deleted user
        assert_eq!(report.group_chat_messages.len(), 7);
        assert!(report.group_chat_messages.iter().all(|m| m.message.sender_id != 6));
        assert!(report.group_chat_messages.iter().all(|m| m.sender_username.is_some()));
        assert_eq!(
            report.group_chat_messages[0].display_line(),
            "ВіталійЛисенко: Привіт усім! Як поживаєте?"
        );
        assert_eq!(
            report.group_chat_messages[1].display_line(),
            "ІванКовальUpdated: Хлопці, давайте обговоримо наші плани!"
        );

        let chat_names: Vec<_> = report.user_chats.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(chat_names, vec!["Іван & Олена", "Груповий чат"]);
    }

    #[tokio::test]
    async fn test_run_report_text() {
        let store = create_test_store().await;
        let report = run(&store).await.unwrap();
        let text = report.to_string();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "Updated user: ІванКовальUpdated, ivan.koval@mail.com");
        assert_eq!(lines[1], "Updated message: Привіт, Олено, як все?");
        assert_eq!(lines[2], "Deleted user: НаталіяСидоренко");
        assert_eq!(lines[3], "Deleted message: Привіт, Катерино! Як справи?");
        assert_eq!(lines[4], "Group chat messages:");
        assert_eq!(lines[12], "Chats for user 1:");
        assert_eq!(&lines[13..], &["Іван & Олена", "Груповий чат"]);
    }

    #[tokio::test]
    async fn test_run_twice_hits_unique_violation() {
        let store = create_test_store().await;
        run(&store).await.unwrap();

        let err = run(&store).await.expect_err("Second run should fail");
        assert!(matches!(err, Error::UniqueViolation(_)));
    }
}
