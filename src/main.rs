use std::net::SocketAddr;
use std::sync::Arc;

use autoverif_api::api::{self, AppState};
use autoverif_api::config::Config;
use autoverif_api::db::{create_pool, run_migrations};
use autoverif_api::services::NhtsaVinDecoder;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoverif_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting AutoVerif QC API server...");
    tracing::info!("Connecting to database...");

    // Create database pool and bring the schema up to date
    let pool = create_pool(&config).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database connection established");

    // Wire services; the decoder is the only outbound dependency
    let decoder = Arc::new(NhtsaVinDecoder::new(config.nhtsa_base.clone()));
    let state = AppState::new(pool, &config, decoder);
    state.photos.ensure_dir().await?;

    // Parse server address
    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        api::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
