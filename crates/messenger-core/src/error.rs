//! Error types for Messenger

use thiserror::Error;

/// Result type alias using Messenger's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Messenger error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("User {0} not found.")]
    UserNotFound(i64),

    #[error("Chat {0} not found.")]
    ChatNotFound(i64),

    #[error("Message {0} not found.")]
    MessageNotFound(i64),

    // Constraint errors (E100-E199)
    #[error("Unique constraint violated: {0} already exists.")]
    UniqueViolation(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        // SQLite reports "UNIQUE constraint failed: users.email"
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let target = db_err
                    .message()
                    .rsplit_once(": ")
                    .map(|(_, columns)| columns.to_string())
                    .unwrap_or_else(|| db_err.message().to_string());
                return Self::UniqueViolation(target);
            }
        }
        Self::DatabaseError(err)
    }
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "E001",
            Self::ChatNotFound(_) => "E002",
            Self::MessageNotFound(_) => "E003",
            Self::UniqueViolation(_) => "E100",
            Self::DatabaseError(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::UserNotFound(_) => {
                Some("Run `messenger users list` to see all users.".to_string())
            }
            Self::ChatNotFound(_) => {
                Some("Run `messenger chats list` to see all chats.".to_string())
            }
            Self::UniqueViolation(target) if target.starts_with("users.") => {
                Some("Choose a different username or email.".to_string())
            }
            Self::UniqueViolation(target) if target.starts_with("chat_participants.") => {
                Some("Run `messenger chats participants <CHAT_ID>` to see who has joined.".to_string())
            }
            Self::ConfigError(_) => {
                Some("Run `messenger config list` to check your settings.".to_string())
            }
            _ => None,
        }
    }

    /// Whether this error is a "row does not exist" condition
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_) | Self::ChatNotFound(_) | Self::MessageNotFound(_)
        )
    }
}
