//! Orderflux Server binary.

use std::sync::Arc;

use orderflux_server::config::Config;
use orderflux_server::db::{self, SqliteOrderStore};
use orderflux_server::remote::RestRemoteSource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "orderflux_server=debug,orderflux_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Orderflux Server on {}:{}", config.host, config.port);

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let remote = RestRemoteSource::from_config(&config)?;
    tracing::info!(
        base_url = %config.remote_base_url,
        page_size = remote.page_size(),
        "Remote order API configured"
    );

    let services = orderflux_server::start(
        SqliteOrderStore::new(pool),
        Arc::new(remote),
        config.sync_config(),
    );
    let app = orderflux_server::app(services.state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
