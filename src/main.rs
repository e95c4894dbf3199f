use axum::extract::DefaultBodyLimit;
use recruitment_workflow::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    routes,
    services::object_store::LocalObjectStore,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_DB_CONNECTIONS: u32 = 20;
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let pool = create_pool(&config.database_url, MAX_DB_CONNECTIONS).await?;
    run_migrations(&pool).await?;

    info!(root = %config.object_store_root, "Using local object store");
    let object_store = Arc::new(LocalObjectStore::new(&config.object_store_root));
    let app_state = AppState::new(pool, config, object_store);

    if !app_state.notification_service.is_enabled() {
        warn!("NOTIFICATION_WEBHOOK_URL is not set; interview notifications are disabled");
    }

    let shutdown = CancellationToken::new();
    let dispatcher = tokio::spawn(
        app_state
            .notification_service
            .clone()
            .run(shutdown.child_token()),
    );

    let app = routes::router(app_state, config.api_rps, config.public_rps)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "Notification dispatcher ended abnormally");
    }
    Ok(())
}
