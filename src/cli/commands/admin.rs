use clap::Subcommand;
use serde_json::json;

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create an admin portal account")]
    Create {
        #[arg(help = "Login email")]
        email: String,

        #[arg(long, help = "Display name")]
        name: String,

        #[arg(long, env = "ADMIN_PASSWORD", help = "Initial password (or ADMIN_PASSWORD)")]
        password: String,
    },
}

pub async fn handle(cmd: AdminCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Create { email, name, password } => {
            if password.len() < 12 {
                anyhow::bail!("admin passwords must be at least 12 characters");
            }

            let stores = connect(config).await?;
            if stores.admins.find_by_email(&email).await?.is_some() {
                anyhow::bail!("an admin with email '{}' already exists", email);
            }

            let hash = hash_password(&password)?;
            let account = stores.admins.create(&email, &name, &hash).await?;

            output_success(
                output_format,
                &format!("Created admin {} ({})", account.email, account.id),
                Some(json!({ "admin": account })),
            )
        }
    }
}
