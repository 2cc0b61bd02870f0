use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use agency_api::auth::{generate_jwt, Claims};
use agency_api::config::AppConfig;
use agency_api::database::DatabaseManager;
use agency_api::identity::HttpIdentityProvider;
use agency_api::{app, AppState};

#[derive(Parser)]
#[command(name = "agency-api")]
#[command(about = "Owner-scoped records API for agents, profiles, accounts and verification requests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Apply pending migrations before serving")]
        migrate: bool,
    },

    #[command(about = "Apply pending migrations and exit")]
    Migrate,

    #[command(about = "Mint a signed access token for local testing")]
    Token {
        #[arg(long, help = "Subject (owner id); random when omitted")]
        sub: Option<Uuid>,

        #[arg(long = "group", help = "Group membership, repeatable")]
        groups: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agency_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Command::Serve { migrate: false }) {
        Command::Serve { migrate } => serve(config, migrate).await,
        Command::Migrate => {
            let database = DatabaseManager::connect(&config.database).await?;
            database.migrate().await?;
            database.close().await;
            Ok(())
        }
        Command::Token { sub, groups } => {
            let claims = Claims::new(sub.unwrap_or_else(Uuid::new_v4), groups, &config.security);
            println!("{}", generate_jwt(&claims, &config.security)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, migrate: bool) -> anyhow::Result<()> {
    tracing::info!("Starting agency API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set");
    }

    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if migrate {
        database.migrate().await?;
    }

    let identity = HttpIdentityProvider::new(&config.identity)?;
    if config.identity.base_url.is_none() {
        tracing::warn!("IDENTITY_BASE_URL is not set; agent mutations will fail with 503");
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(config, database.pool().clone(), Arc::new(identity));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
