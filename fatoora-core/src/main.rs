use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fatoora_core::auth::JwtVerifier;
use fatoora_core::config::Config;
use fatoora_core::invoice::InvoiceService;
use fatoora_core::store::PgStore;
use fatoora_core::{create_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting Fatoora Core Server...");

    let config = Config::from_env()?;

    // Initialize database connection pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool));

    // Create application state
    let app_state = AppState {
        invoices: InvoiceService::new(store.clone(), store.clone(), config.upload_dir.clone()),
        identity: store,
        auth: JwtVerifier::new(&config.jwt_secret),
    };

    let app = create_router(app_state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("Server listening on {}", addr);

    // Start the server
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
