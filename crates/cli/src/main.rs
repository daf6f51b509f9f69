//! Door Renaissance CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! dr-cli migrate
//!
//! # Delete rate-limit counters whose window has expired
//! dr-cli ratelimits prune
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `ratelimits prune` - Sweep expired rate-limit counters

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dr-cli")]
#[command(author, version, about = "Door Renaissance CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Maintain rate-limit counters
    Ratelimits {
        #[command(subcommand)]
        action: RateLimitAction,
    },
}

#[derive(Subcommand)]
enum RateLimitAction {
    /// Delete counters whose expiry has passed
    Prune,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Ratelimits { action } => match action {
            RateLimitAction::Prune => {
                commands::ratelimits::prune().await?;
            }
        },
    }
    Ok(())
}
