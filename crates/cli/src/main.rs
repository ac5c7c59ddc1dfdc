//! Zeytin CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! zt-cli migrate
//!
//! # Create an admin or representative account
//! zt-cli admin create -u ayse -n "Ayse Yilmaz" -p s3cretpass -r representative
//!
//! # Insert default accounts, settings and the sample catalog
//! zt-cli seed
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin users
//! - `seed` - Seed default data (idempotent)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "zt-cli")]
#[command(author, version, about = "Zeytin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Insert default accounts, settings and the sample catalog
    Seed,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new user
    Create {
        /// Login name (stored lowercased)
        #[arg(short, long)]
        username: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin` or `representative`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

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
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                name,
                password,
                role,
            } => {
                commands::admin::create_user(&username, &name, password, &role).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}
