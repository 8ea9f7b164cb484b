//! Messenger CLI - seed and inspect a local messaging database

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use messenger_core::commands::{Chat, Message, User};
use messenger_core::config::Config;
use messenger_core::{Error, MessagingStore, seed};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "messenger")]
#[command(author, version, about = "Relational messaging store demo", long_about = None)]
struct Cli {
    /// Runs the seed script when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database file (overrides configuration and MESSENGER_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format (defaults to `output.format` from configuration)
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    fn from_config(value: &str) -> Self {
        match value {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Store(StoreCommand),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

/// Commands that operate on the messaging database
#[derive(Subcommand)]
enum StoreCommand {
    /// Insert the sample data, run the scripted updates and deletes, print results
    Seed,

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage chats and their participants
    Chats {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Manage messages
    Messages {
        #[command(subcommand)]
        action: MessageAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user
    Create { username: String, email: String },
    /// List all users
    List,
    /// Show user details
    Show { id: i64 },
    /// Change a user's username and/or email
    Update {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Delete a user and every message they sent
    Delete { id: i64 },
    /// List the chats a user participates in
    Chats { id: i64 },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Create a chat
    Create {
        name: String,
        /// Create a group chat instead of a direct one
        #[arg(short, long)]
        group: bool,
    },
    /// List all chats
    List,
    /// Show chat details
    Show { id: i64 },
    /// Add a user to a chat
    Join { chat_id: i64, user_id: i64 },
    /// List the users in a chat
    Participants { chat_id: i64 },
    /// List the messages in a chat
    Messages { chat_id: i64 },
}

#[derive(Subcommand)]
enum MessageAction {
    /// Send a message to a chat
    Send {
        chat_id: i64,
        sender_id: i64,
        content: String,
    },
    /// Replace a message's content
    Update { id: i64, content: String },
    /// Delete a message
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show configuration file path
    Path,
}

/// Where and how command results are printed
#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    /// Print `value` as JSON, or run `text` to print it for humans
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(),
        }
        Ok(())
    }

    /// Print a confirmation line unless quiet or emitting JSON
    fn note(&self, line: &str) {
        if !self.quiet && self.format == OutputFormat::Text {
            println!("{}", line);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let result = run().await;
    if let Err(err) = &result {
        if let Some(hint) = err.downcast_ref::<Error>().and_then(Error::suggestion) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("messenger=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or(Commands::Store(StoreCommand::Seed));

    // Config commands must work even when the stored configuration is invalid
    let command = match command {
        Commands::Config { action } => return cmd_config(action, cli.quiet),
        Commands::Doctor => None,
        Commands::Store(command) => Some(command),
    };

    let config = Config::load()?;
    let out = Output {
        format: cli
            .format
            .unwrap_or_else(|| OutputFormat::from_config(&config.output.format)),
        quiet: cli.quiet,
    };

    let Some(command) = command else {
        return cmd_doctor(&config, cli.database.as_deref(), out).await;
    };

    let store = open_store(&config, cli.database.as_deref()).await?;
    let result = match command {
        StoreCommand::Seed => cmd_seed(&store, out).await,
        StoreCommand::Users { action } => cmd_users(&store, action, out).await,
        StoreCommand::Chats { action } => cmd_chats(&store, action, out).await,
        StoreCommand::Messages { action } => cmd_messages(&store, action, out).await,
    };
    store.database().close().await;
    result
}

async fn open_store(config: &Config, database: Option<&Path>) -> anyhow::Result<MessagingStore> {
    let db_config = config.database.to_database_config(database)?;
    debug!(path = %db_config.path.display(), "Opening messaging store");
    MessagingStore::open(db_config).await
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_seed(store: &MessagingStore, out: Output) -> anyhow::Result<()> {
    let report = match seed::run(store).await {
        Ok(report) => report,
        Err(err @ Error::UniqueViolation(_)) => {
            return Err(anyhow!(
                "{} The database already holds sample data; pass --database with a new file.",
                err
            ));
        }
        Err(err) => return Err(err.into()),
    };

    out.emit(&report, || print!("{}", report))
}

async fn cmd_users(store: &MessagingStore, action: UserAction, out: Output) -> anyhow::Result<()> {
    match action {
        UserAction::Create { username, email } => {
            let user = store.create_user(&username, &email).await?;
            out.emit(&user, || print_user(&user))?;
        }
        UserAction::List => {
            let users = store.list_users().await?;
            out.emit(&users, || {
                if users.is_empty() {
                    if !out.quiet {
                        println!("No users found.");
                    }
                } else {
                    users.iter().for_each(print_user);
                }
            })?;
        }
        UserAction::Show { id } => match store.get_user(id).await? {
            Some(user) => out.emit(&user, || print_user(&user))?,
            None => report_missing(Error::UserNotFound(id), out)?,
        },
        UserAction::Update { id, name, email } => {
            if name.is_none() && email.is_none() {
                return Err(Error::InvalidInput("Supply --name and/or --email".to_string()).into());
            }
            let user = store
                .update_user(id, name.as_deref(), email.as_deref())
                .await?
                .ok_or(Error::UserNotFound(id))?;
            out.emit(&user, || println!("Updated user: {}, {}", user.username, user.email))?;
        }
        UserAction::Delete { id } => {
            let user = store.delete_user(id).await?.ok_or(Error::UserNotFound(id))?;
            out.emit(&user, || println!("Deleted user: {}", user.username))?;
        }
        UserAction::Chats { id } => {
            let chats = store.get_user_chats(id).await?;
            out.emit(&chats, || {
                out.note(&format!("Chats for user {}:", id));
                for chat in &chats {
                    println!("{}", chat.name);
                }
            })?;
        }
    }
    Ok(())
}

async fn cmd_chats(store: &MessagingStore, action: ChatAction, out: Output) -> anyhow::Result<()> {
    match action {
        ChatAction::Create { name, group } => {
            let chat = store.create_chat(&name, group).await?;
            out.emit(&chat, || print_chat(&chat))?;
        }
        ChatAction::List => {
            let chats = store.list_chats().await?;
            out.emit(&chats, || {
                if chats.is_empty() {
                    if !out.quiet {
                        println!("No chats found.");
                    }
                } else {
                    chats.iter().for_each(print_chat);
                }
            })?;
        }
        ChatAction::Show { id } => match store.get_chat(id).await? {
            Some(chat) => out.emit(&chat, || print_chat(&chat))?,
            None => report_missing(Error::ChatNotFound(id), out)?,
        },
        ChatAction::Join { chat_id, user_id } => {
            let participant = store.add_participant(chat_id, user_id).await?;
            out.emit(&participant, || {
                println!("Added user {} to chat {}", user_id, chat_id)
            })?;
        }
        ChatAction::Participants { chat_id } => {
            let users = store.get_chat_participants(chat_id).await?;
            out.emit(&users, || users.iter().for_each(print_user))?;
        }
        ChatAction::Messages { chat_id } => {
            let messages = store.get_chat_messages_with_sender(chat_id).await?;
            out.emit(&messages, || {
                for message in &messages {
                    println!("{}", message.display_line());
                }
            })?;
        }
    }
    Ok(())
}

async fn cmd_messages(
    store: &MessagingStore,
    action: MessageAction,
    out: Output,
) -> anyhow::Result<()> {
    match action {
        MessageAction::Send {
            chat_id,
            sender_id,
            content,
        } => {
            let message = store.send_message(chat_id, sender_id, &content).await?;
            out.emit(&message, || print_message(&message))?;
        }
        MessageAction::Update { id, content } => {
            let message = store
                .update_message(id, &content)
                .await?
                .ok_or(Error::MessageNotFound(id))?;
            out.emit(&message, || println!("Updated message: {}", message.content))?;
        }
        MessageAction::Delete { id } => {
            let message = store
                .delete_message(id)
                .await?
                .ok_or(Error::MessageNotFound(id))?;
            out.emit(&message, || println!("Deleted message: {}", message.content))?;
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(config: &Config, database: Option<&Path>, out: Output) -> anyhow::Result<()> {
    let quiet = out.quiet;
    if !quiet {
        println!("Messenger Health Check");
        println!("======================");
        println!();
        println!("[OK] Configuration: Valid");
    }

    let store = match open_store(config, database).await {
        Ok(store) => store,
        Err(e) => {
            if !quiet {
                println!("[!!] Database: Error - {:#}", e);
            }
            return Err(anyhow!("Health check failed"));
        }
    };

    let mut all_ok = true;
    if !quiet {
        println!("[OK] Database: {}", store.database().path().display());
        let enforced = store.database().config().enforce_foreign_keys;
        println!(
            "[OK] Foreign keys: {}",
            if enforced { "enforced" } else { "not enforced" }
        );
    }

    match store.database().health_check().await {
        Ok(()) => {
            if !quiet {
                println!("[OK] Connection: Healthy");
            }
        }
        Err(e) => {
            all_ok = false;
            warn!(error = %e, "Database health check failed");
            if !quiet {
                println!("[!!] Connection: Error - {}", e);
            }
        }
    }

    let status = store.database().migration_status().await?;
    if !quiet {
        let marker = if status.needs_migration { "[!!]" } else { "[OK]" };
        println!(
            "{} Schema: version {} of {}",
            marker, status.current_version, status.target_version
        );
    }
    all_ok &= !status.needs_migration;

    let stats = store.stats().await?;
    if !quiet {
        println!(
            "[OK] Rows: {} users, {} chats, {} participants, {} messages",
            stats.users, stats.chats, stats.participants, stats.messages
        );
    }
    store.database().close().await;

    if all_ok {
        if !quiet {
            println!();
            println!("All checks passed.");
        }
        Ok(())
    } else {
        Err(anyhow!("Health check found problems"))
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Report a missing row on a read command; not an error
fn report_missing(err: Error, out: Output) -> anyhow::Result<()> {
    if !err.is_not_found() {
        return Err(err.into());
    }
    out.emit(&serde_json::Value::Null, || {
        if !out.quiet {
            println!("{}", err);
        }
    })
}

fn print_user(user: &User) {
    println!("[{}] {} <{}>", user.id, user.username, user.email);
}

fn print_chat(chat: &Chat) {
    println!(
        "[{}] {} ({}, created {})",
        chat.id,
        chat.name,
        chat.kind.as_str(),
        chat.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_message(message: &Message) {
    println!(
        "[{}] chat {} from user {} at {}: {}",
        message.id,
        message.chat_id,
        message.sender_id,
        message.timestamp.format("%Y-%m-%d %H:%M:%S"),
        message.content
    );
}
