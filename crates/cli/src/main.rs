//! EcoFinds CLI - database migrations and marketplace inspection.
//!
//! # Usage
//!
//! ```bash
//! # Apply the marketplace schema
//! ecofinds migrate
//!
//! # Print a user's profile figures (sales, purchases, rating, badge)
//! ecofinds stats --user 0190f5c2-...
//!
//! # Run the list/cart/checkout/review walkthrough against the in-memory store
//! ecofinds demo --seed 7
//! ```
//!
//! `migrate` and `stats` read `DATABASE_URL` and `ECOFINDS_DB_MAX_CONNECTIONS`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use ecofinds_core::UserId;

mod commands;

#[derive(Parser)]
#[command(name = "ecofinds")]
#[command(author, version, about = "EcoFinds marketplace tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print profile statistics for a user as JSON
    Stats {
        /// User id (UUID)
        #[arg(short, long)]
        user: UserId,
    },
    /// Walk through a sale end to end on the in-memory store
    Demo {
        /// Seed for the impact-estimate jitter; random when omitted
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    ecofinds_observability::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("command failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Stats { user } => commands::stats::run(user).await?,
        Commands::Demo { seed } => commands::demo::run(seed).await?,
    }
    Ok(())
}
