//! CharChat CLI: the main entry point.
//!
//! Commands:
//! - `onboard`         Write a starter config
//! - `status`          Show config, schema and contacts
//! - `migrate`         Bring stored state up to the current schema
//! - `chat`            Talk to a character or a group chat
//! - `create-contact`  Generate a character from a description
//! - `create-group`    Start a group chat between characters

use clap::{Parser, Subcommand};

mod app_store;
mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "charchat",
    about = "CharChat: chat with AI-generated characters",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Show config, stored schema version and contacts
    Status,

    /// Migrate stored state to the current schema
    Migrate {
        /// Delete all stored state instead
        #[arg(long)]
        delete: bool,
    },

    /// Chat with a character or move a group chat forward
    Chat {
        /// Contact id (a character or a group chat)
        #[arg(short, long)]
        contact: String,

        /// Message to send; without it a character's history is printed
        #[arg(short, long)]
        message: Option<String>,

        /// In a group chat, which character speaks next
        #[arg(short, long)]
        bot: Option<String>,
    },

    /// Generate a new character from a free-form description
    CreateContact {
        description: String,
    },

    /// Create a group chat from existing characters
    CreateGroup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Character ids to include
        #[arg(required = true)]
        contacts: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Migrate { delete } => commands::migrate::run(delete).await?,
        Commands::Chat {
            contact,
            message,
            bot,
        } => commands::chat::run(contact, message, bot).await?,
        Commands::CreateContact { description } => {
            commands::create_contact::run(description).await?
        }
        Commands::CreateGroup {
            name,
            description,
            contacts,
        } => commands::create_group::run(name, description, contacts).await?,
    }

    Ok(())
}
