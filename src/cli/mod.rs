pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseManager, Stores};

#[derive(Parser)]
#[command(name = "practice-admin")]
#[command(about = "Operator tooling for the practice API: migrations, admin accounts, impersonation sessions")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Admin portal accounts")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    #[command(about = "Impersonation sessions")]
    Sessions {
        #[command(subcommand)]
        cmd: commands::sessions::SessionCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Admin { cmd } => commands::admin::handle(cmd, config, output_format).await,
        Commands::Sessions { cmd } => commands::sessions::handle(cmd, config, output_format).await,
    }
}

/// Operator commands always act on the persistent database
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<Stores> {
    if config.database.backend == StoreBackend::Memory {
        anyhow::bail!("practice-admin needs the postgres backend; unset DATABASE_BACKEND=memory");
    }
    let pool = DatabaseManager::service_pool(&config.database).await?;
    Ok(Stores::postgres(pool))
}
