use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dcim_api_rust::config::AppConfig;
use dcim_api_rust::routes;
use dcim_api_rust::state::AppState;
use dcim_api_rust::store::Db;

#[derive(Debug, Parser)]
#[command(name = "dcim-api", version, about = "Data-center infrastructure console API")]
struct Cli {
    /// Port to listen on (overrides PORT and the config default)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides BIND_ADDR and the config default)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    if config.is_production() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in production");
    }

    tracing::info!("Starting dcim-api in {:?} mode", config.environment);

    let state = if std::env::var("DATABASE_URL").is_ok() {
        let db = Db::connect(&config.database)
            .await
            .context("database connection failed")?;
        AppState::new(config.clone(), db)
    } else {
        tracing::warn!("DATABASE_URL not set; serving the seeded in-memory fixture");
        AppState::in_memory(config.clone()).context("fixture setup failed")?
    };
    let db = state.db.clone();

    let bind_addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("dcim-api listening on http://{}", bind_addr);

    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(db) = db {
        db.close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("shutdown signal received");
}
