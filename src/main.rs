use std::sync::Arc;

use course_payments_api::app::build_router;
use course_payments_api::config::AppConfig;
use course_payments_api::database::connection::get_db_client;
use course_payments_api::database::indexes::ensure_indexes;
use course_payments_api::database::mongo_store::MongoStore;
use course_payments_api::database::StoreRef;
use course_payments_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("🔧 Configuration loaded: {}", config.get_config_info());

    let db = get_db_client(&config).await?;
    ensure_indexes(&db).await?;

    let store: StoreRef = Arc::new(MongoStore::new(db));
    let app_state = AppState::new(store, config.jwt_secret.clone());

    let dispatcher = app_state
        .outbox
        .clone()
        .spawn(config.outbox_interval, config.outbox_batch_size);
    tracing::info!(
        "📬 Notification outbox running every {}s",
        config.outbox_interval.as_secs()
    );

    let app = build_router(app_state);
    let result = start_server(app, &config).await;

    dispatcher.abort();
    result
}

async fn start_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 Server starting on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
