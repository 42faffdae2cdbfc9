//! Charity Yeti CLI - Database migrations and manual replies.
//!
//! # Usage
//!
//! ```bash
//! # Run relay database migrations
//! yeti-cli migrate
//!
//! # Preview the reply for a mention (nothing is posted)
//! yeti-cli reply --username alice --honorary hankgreen --post-id 1500
//!
//! # Post it for real
//! yeti-cli reply --username alice --honorary hankgreen --post-id 1500 --live
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `reply` - Respond to a single mention

#![cfg_attr(not(test), forbid(unsafe_code))]

use charity_yeti_core::PostId;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "yeti-cli")]
#[command(author, version, about = "Charity Yeti CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run relay database migrations
    Migrate,
    /// Reply to a mention with a donation link
    Reply {
        /// Screen name of the user who mentioned the bot
        #[arg(short, long)]
        username: String,

        /// Screen name the donation is made on behalf of
        #[arg(long)]
        honorary: String,

        /// Post to reply to
        #[arg(short, long)]
        post_id: PostId,

        /// Actually post the reply (default is a dry run)
        #[arg(long)]
        live: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Reply {
            username,
            honorary,
            post_id,
            live,
        } => {
            commands::reply::run(&username, &honorary, post_id, live).await?;
        }
    }
    Ok(())
}
