use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::services::{AuditLogger, ImpersonationService};

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "List impersonation sessions that have not ended")]
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    #[command(about = "End an impersonation session (recorded as a system action)")]
    End {
        #[arg(help = "Session ID")]
        id: Uuid,

        #[arg(long, default_value = "ended by operator")]
        reason: String,
    },
}

pub async fn handle(cmd: SessionCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let stores = connect(config).await?;
    let service = ImpersonationService::new(&stores, AuditLogger::new(stores.audit.clone()));

    match cmd {
        SessionCommands::List { limit } => {
            let sessions = service.active_sessions(limit).await?;
            if sessions.is_empty() {
                return output_empty_collection(output_format, "sessions", "No active impersonation sessions");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "sessions": sessions }))?);
                }
                OutputFormat::Text => {
                    println!("{:<38} {:<38} {:<38} {}", "SESSION", "ADMIN", "PRACTITIONER", "STARTED");
                    println!("{}", "-".repeat(132));
                    for session in &sessions {
                        println!(
                            "{:<38} {:<38} {:<38} {}",
                            session.id,
                            session.admin_id,
                            session.practitioner_id,
                            session.started_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
        SessionCommands::End { id, reason } => {
            let ended = service.end_as_system(id, &reason).await?;
            let message = if ended {
                format!("Ended impersonation session {}", id)
            } else {
                format!("Impersonation session {} was already ended", id)
            };
            output_success(output_format, &message, Some(json!({ "ended": ended })))
        }
    }
}
