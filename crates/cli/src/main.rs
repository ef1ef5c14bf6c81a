//! Storedesk CLI - migrations, seeding and client administration.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sd-cli migrate
//!
//! # Seed cities from a YAML file
//! sd-cli seed cities data/cities.yaml
//!
//! # Register a client from a JSON payload
//! sd-cli client create new-client.json
//!
//! # List clients, newest page first by name
//! sd-cli client page --page 0 --size 20 --direction DESC --order-by name
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed cities` - Insert missing cities
//! - `client` - Show, list, register, update, delete and authenticate clients
//!
//! Configuration comes from the environment (see `storedesk_admin::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use storedesk_admin::config::{AdminConfig, LogFormat};
use storedesk_admin::telemetry::init_tracing;

mod commands;

#[derive(Parser)]
#[command(name = "sd-cli")]
#[command(author, version, about = "Storedesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage clients
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert cities listed in a YAML file
    Cities {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum ClientAction {
    /// Show one client
    Show {
        /// Client id
        id: i32,
    },
    /// List every client
    List,
    /// Show one page of clients
    Page {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Clients per page
        #[arg(long, default_value_t = 24)]
        size: u32,

        /// `ASC` or `DESC`
        #[arg(long, default_value = "ASC")]
        direction: String,

        /// Sort field (`id`, `name`, `email`, `taxId`, `type`)
        #[arg(long, default_value = "name")]
        order_by: String,
    },
    /// Register a client from a JSON payload
    Create {
        /// Path to the JSON file
        file: String,
    },
    /// Change a client's name and email
    Update {
        /// Client id
        id: i32,

        /// New name
        #[arg(short, long)]
        name: String,

        /// New email
        #[arg(short, long)]
        email: String,
    },
    /// Delete a client
    Delete {
        /// Client id
        id: i32,
    },
    /// Check a client's password (read from standard input)
    Login {
        /// Login email
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AdminConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::default());
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &AdminConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run(config).await?,
        Commands::Seed { target } => match target {
            SeedTarget::Cities { file } => commands::seed::cities(config, &file).await?,
        },
        Commands::Client { action } => {
            let clients = commands::client::ClientCommands::connect(config).await?;
            match action {
                ClientAction::Show { id } => clients.show(id).await?,
                ClientAction::List => clients.list().await?,
                ClientAction::Page {
                    page,
                    size,
                    direction,
                    order_by,
                } => clients.page(page, size, &direction, &order_by).await?,
                ClientAction::Create { file } => clients.create(&file).await?,
                ClientAction::Update { id, name, email } => {
                    clients.update(id, name, email).await?;
                }
                ClientAction::Delete { id } => clients.delete(id).await?,
                ClientAction::Login { email } => clients.login(email).await?,
            }
        }
    }
    Ok(())
}
