// PingPanda provisioning tool
//
// Design Decision: Accounts and categories are created out-of-band; this tool
// writes them straight to the database so operators and tests can set up
// senders without a dashboard.
//
// Usage:
//   provision account --email owner@example.com --discord-id 1234 --plan pro
//   provision category --account <uuid> --name sale --color "#00ff00" --emoji 💰

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pingpanda_control_plane::services::account::parse_hex_color;
use pingpanda_control_plane::{storage::StorageBackend, ProvisioningService};
use pingpanda_core::telemetry::{init_telemetry, TelemetryConfig};
use pingpanda_core::Plan;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "provision")]
#[command(about = "PingPanda provisioning - create accounts and event categories")]
#[command(version)]
struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json"])]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and print its API key (shown only once)
    Account {
        /// Contact email, unique per account
        #[arg(long)]
        email: String,

        /// Discord user id that notifications are sent to
        #[arg(long)]
        discord_id: Option<String>,

        /// Plan tier
        #[arg(long, default_value = "free", value_parser = ["free", "pro"])]
        plan: String,
    },

    /// Create an event category for an account
    Category {
        /// Owning account id
        #[arg(long)]
        account: Uuid,

        /// Category name (letters, numbers and hyphens)
        #[arg(long)]
        name: String,

        /// Embed colour as hex, e.g. "#00ff00"
        #[arg(long)]
        color: Option<String>,

        /// Emoji shown in the notification title
        #[arg(long)]
        emoji: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let telemetry_config = TelemetryConfig::from_env()
        .with_default_service_name("pingpanda-provision")
        .with_default_filter("warn");
    let _telemetry_guard = init_telemetry(telemetry_config);

    let storage = StorageBackend::postgres(&cli.database_url, 2)
        .await
        .context("Failed to connect to database")?;
    let service = ProvisioningService::new(Arc::new(storage));
    let json_output = cli.output == "json";

    match cli.command {
        Command::Account {
            email,
            discord_id,
            plan,
        } => {
            let (account, key) = service
                .create_account(&email, discord_id, Plan::from(plan.as_str()))
                .await?;

            if json_output {
                let value = json!({ "account": account, "api_key": key.key });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{:<14} {}", "Account:", account.id);
                println!("{:<14} {}", "Email:", account.email);
                println!("{:<14} {}", "Plan:", account.plan);
                println!("{:<14} {}", "API key:", key.key);
                println!();
                println!("Store the API key now, it cannot be shown again.");
            }
        }
        Command::Category {
            account,
            name,
            color,
            emoji,
        } => {
            let color = color.as_deref().map(parse_hex_color).transpose()?;
            let category = service.create_category(account, &name, color, emoji).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&category)?);
            } else {
                println!("{:<14} {}", "Category:", category.id);
                println!("{:<14} {}", "Name:", category.name);
            }
        }
    }

    Ok(())
}
