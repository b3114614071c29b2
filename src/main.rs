mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memchat::config::MemchatConfig;

#[derive(Parser)]
#[command(name = "memchat", version, about = "Chat with a hosted LLM that remembers you")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the web chat UI
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat in the terminal
    Chat {
        /// User whose memories are used (defaults to storage.default_user)
        #[arg(long)]
        user: Option<String>,
    },
    /// Test the memory backend and language model connections
    Status,
    /// Inspect or clear stored memories
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Search a user's memories
    Search {
        query: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// List all of a user's memories
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete all of a user's memories
    Clear {
        #[arg(long)]
        user: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MemchatConfig::load()?;

    // Log to stderr so stdout stays clean for the terminal chat and reports.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let default_user = config.storage.default_user.clone();
    let user_or_default = |user: Option<String>| user.unwrap_or_else(|| default_user.clone());

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            memchat::server::serve(config).await?;
        }
        Command::Chat { user } => {
            cli::chat::chat(&config, &user_or_default(user)).await?;
        }
        Command::Status => {
            cli::status::status(&config).await?;
        }
        Command::Memory { action } => match action {
            MemoryAction::Search { query, user } => {
                cli::memory::search(&config, &user_or_default(user), &query).await?;
            }
            MemoryAction::List { user } => {
                cli::memory::list(&config, &user_or_default(user)).await?;
            }
            MemoryAction::Clear { user, yes } => {
                cli::memory::clear(&config, &user_or_default(user), yes).await?;
            }
        },
    }

    Ok(())
}
