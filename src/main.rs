use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use arbitrage_api::{
    config::AppConfig,
    database::{DatabaseManager, MemoryUserRepository, PgUserRepository, UserRepository},
    router, AppState,
};

#[derive(Parser)]
#[command(name = "arbitrage-api")]
#[command(about = "User account REST API")]
#[command(version)]
struct Args {
    #[arg(long, help = "Address to bind (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Directory served for unmatched paths (overrides STATIC_DIR)")]
    static_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("arbitrage_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(static_dir) = args.static_dir {
        config.server.static_dir = static_dir;
    }
    tracing::info!("Starting Arbitrage API in {:?} mode", config.environment);

    let users = user_repository(&config).await?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, users).context("JWT_SECRET must be set")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn user_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn UserRepository>> {
    if config.database.url.is_none() {
        tracing::warn!("DATABASE_URL not set; users are kept in memory");
        return Ok(Arc::new(MemoryUserRepository::new()));
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    DatabaseManager::health_check(&pool)
        .await
        .context("database did not answer health check")?;
    DatabaseManager::ensure_schema(&pool)
        .await
        .context("failed to prepare users table")?;

    Ok(Arc::new(PgUserRepository::new(pool)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
