//! Lifestyle Risk - Main Entry Point
//!
//! Train, query and serve the disease risk model.

use clap::Parser;
use lifestyle_risk::cli::{cmd_predict, cmd_schema, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lifestyle_risk=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => {
            cmd_train(&args)?;
        }
        Commands::Predict { model, record, set, json } => {
            cmd_predict(&model, record.as_deref(), &set, json)?;
        }
        Commands::Serve { host, port, model, schema } => {
            cmd_serve(&host, port, &model, &schema).await?;
        }
        Commands::Schema { name } => {
            cmd_schema(&name)?;
        }
    }

    Ok(())
}
