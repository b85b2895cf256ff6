//! Tasksmith CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Initialize config & library directory
//! - `chat`: Interactive chat or single-message mode
//! - `library`: Inspect and prune generated functions
//! - `history`: Inspect and clear the conversation log
//! - `status`: Show resolved configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tasksmith",
    about = "Tasksmith — an assistant that writes, runs and repairs its own automation code",
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
    /// Initialize configuration and the function library
    Onboard,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Manage the function library
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// Manage the conversation history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show system status
    Status,
}

#[derive(Subcommand)]
enum LibraryAction {
    /// List saved functions and their parameters
    List,

    /// Print a function's source and parameter docs
    Show { name: String },

    /// Delete a function
    Remove { name: String },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print recent records
    Show {
        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Delete every record
    Clear,

    /// Count records by kind
    Summary,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Library { action } => match action {
            LibraryAction::List => commands::library::list().await?,
            LibraryAction::Show { name } => commands::library::show(&name).await?,
            LibraryAction::Remove { name } => commands::library::remove(&name).await?,
        },
        Commands::History { action } => match action {
            HistoryAction::Show { count } => commands::history::show(count).await?,
            HistoryAction::Clear => commands::history::clear().await?,
            HistoryAction::Summary => commands::history::summary().await?,
        },
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
