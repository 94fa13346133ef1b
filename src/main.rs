use std::sync::Arc;

use dotenvy::dotenv;
use stock_ledger::{
    api::{self, AppState},
    collaborators::{HeaderAuth, LogNotifier, StaticCatalogTokens},
    config::{self, database},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration (file, then env overrides)
    let app_config = config::app::load_app_configuration()?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&app_config.database)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Serve
    let catalog = StaticCatalogTokens::from(&app_config.catalog);
    let state = AppState {
        db,
        config: Arc::new(app_config),
        auth: Arc::new(HeaderAuth),
        notifier: Arc::new(LogNotifier),
        catalog: Arc::new(catalog),
    };
    api::serve(state).await
}
