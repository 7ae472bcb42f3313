use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use trip_auditor::config::{AppConfig, StoreBackend};
use trip_auditor::db::{init_pool, migrate};
use trip_auditor::error::AppError;
use trip_auditor::routes::create_router;
use trip_auditor::services::{
    sqlite::SqliteTripStore,
    storage::{CsvTripStore, TripStore},
};
use trip_auditor::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn TripStore> = match config.backend {
        StoreBackend::Csv => {
            let store = CsvTripStore::new(config.data_file.clone());
            store.ensure_file().await?;
            info!("using trip table {}", store.path().display());
            Arc::new(store)
        }
        StoreBackend::Sqlite => {
            let db = init_pool(&config.database_url).await?;
            migrate(&db).await?;
            info!("using trip database {}", config.database_url);
            Arc::new(SqliteTripStore::new(db))
        }
    };

    let state = AppState::new(config.clone(), store);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,trip_auditor=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
