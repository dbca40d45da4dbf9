use anyhow::Result;
use cas_gateway::{cas::TicketValidator, web, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CAS gateway");

    // Load configuration from environment
    let config = cas_gateway::config::Config::load()?;
    tracing::info!(
        environment = ?config.environment,
        cas_server = %config.cas_server_url,
        production_url = %config.production_url,
        public_paths = ?config.public_path_prefixes,
        "Configuration loaded"
    );

    let validator = Arc::new(
        TicketValidator::from_config(&config)
            .map_err(|e| anyhow::anyhow!("Failed to initialize ticket validator: {}", e))?,
    );

    let bind_address = config.bind_address();
    let state = Arc::new(AppState {
        config: Arc::new(config),
        validator,
    });

    let app = web::create_router(state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("CAS gateway listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
