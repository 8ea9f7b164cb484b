//! Commands module - entity types and their repositories
//!
//! These are used by the `MessagingStore` facade and the CLI.

pub mod chat;
pub mod message;
pub mod user;

pub use chat::{Chat, ChatKind, ChatParticipant, ChatRepository};
pub use message::{Message, MessageRepository, MessageWithSender};
pub use user::{User, UserRepository, UserUpdate};
