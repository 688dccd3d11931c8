use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use migration::MigratorTrait;
use sea_orm::Database;
use std::collections::HashMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use narada::config::Config;
use narada::workflows::nodes::registry::validate_required_nodes;
use narada::workflows::{Engine, WorkflowDefinition};

/// The CLI surface itself is out of scope (spec §1); this is a thin
/// invocation shim, not a designed UX.
#[derive(Parser)]
#[command(name = "narada")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Applies pending database migrations and exits.
    Migrate,
    /// Runs a workflow definition file to completion.
    RunWorkflow {
        path: String,
        #[arg(long, value_parser = parse_key_val)]
        param: Vec<(String, String)>,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw.split_once('=').context("--param expects KEY=VALUE")?;
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "narada=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Migrate => {
            let db = Database::connect(&config.database_url).await?;
            migration::Migrator::up(&db, None).await?;
            tracing::info!("migrations applied");
        }
        Command::RunWorkflow { path, param } => {
            let db = Database::connect(&config.database_url).await?;
            migration::Migrator::up(&db, None).await?;
            narada::workflows::services::Services::init(config).await?;
            validate_required_nodes()?;

            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading workflow file {path}"))?;
            let definition = WorkflowDefinition::parse(&raw)?;

            let parameters: HashMap<String, serde_json::Value> = param.into_iter().map(|(k, v)| (k, serde_json::Value::String(v))).collect();

            let mut on_event = |event: narada::workflows::WorkflowEvent| {
                tracing::info!(event = event.event_type, task_id = ?event.task_id, error = ?event.error, "{}", event.event_type);
            };
            Engine::run(&definition, parameters, Some(&mut on_event)).await?;
            tracing::info!(workflow = definition.id, "workflow completed");
        }
    }

    Ok(())
}
