mod commands;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use commands::{PermissionCommand, PriceCommand};
use matrix_core::services::MatrixSession;
use matrix_infrastructure::{PermissionGateway, PriceGateway};
use matrix_shared::config::AppConfig;

#[derive(Parser)]
#[command(name = "matrix-admin")]
#[command(about = "Maintain the package price matrix and the level access matrix")]
struct Cli {
    /// Configuration environment (config/{env}.toml)
    #[arg(long, env = "APP_ENV")]
    env: Option<String>,

    #[command(subcommand)]
    matrix: MatrixKind,
}

#[derive(Subcommand)]
enum MatrixKind {
    /// Package x duration prices
    Price {
        #[command(subcommand)]
        command: PriceCommand,
    },
    /// Level x menu permissions
    Permission {
        #[command(subcommand)]
        command: PermissionCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.env {
        Some(env) => AppConfig::load_for_env(env),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    matrix_shared::telemetry::init_telemetry(&config.logging)?;
    info!("{} ({}) against {}", config.app.name, config.app.env, config.api.base_url);

    let result = match cli.matrix {
        MatrixKind::Price { command } => {
            let gateway = PriceGateway::new(&config.api, config.pricing.clone())?;
            let session = MatrixSession::new(Arc::new(gateway));
            commands::price::run(&session, command).await
        }
        MatrixKind::Permission { command } => {
            let gateway = PermissionGateway::new(&config.api, config.permissions.clone())?;
            let session = MatrixSession::new(Arc::new(gateway));
            commands::permission::run(&session, command).await
        }
    };

    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }
    result
}
