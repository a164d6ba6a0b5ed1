//! Tally API Server
//!
//! Main entry point for the balance ledger service.

use std::sync::Arc;

use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::balance::{AccountService, RetryPolicy};
use tally_db::{AccountRepository, connect, migration::Migrator};
use tally_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect(&config.database.url, &config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    if config.database.auto_migrate {
        Migrator::up(&db, None).await?;
        info!("Database migrations applied");
    }

    let policy = RetryPolicy::from(&config.ledger);
    info!(
        max_attempts = policy.max_attempts,
        max_backoff = ?policy.max_backoff,
        deadline = ?policy.deadline,
        "Balance update retry policy"
    );

    // Create application state
    let store = Arc::new(AccountRepository::new(db));
    let state = AppState {
        service: AccountService::new(store, policy),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
