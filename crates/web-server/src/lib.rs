use analyzer::AnalyticsFacade;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::Config;
use database::DbRepository;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
// Note: Tracing is handled by the binary that calls `run_server`.

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub facade: AnalyticsFacade,
}

/// Builds the analytics router around an already-wired facade.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/analytics/anomaly-detection",
            post(handlers::detect_anomalies),
        )
        .route(
            "/api/v1/analytics/predict-maintenance",
            post(handlers::predict_maintenance),
        )
        .route("/api/v1/analytics/quality-report", post(handlers::quality_report))
        .route("/api/v1/analytics/summary", get(handlers::summary))
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

/// Connects to the measurement store and serves the analytics API until shutdown.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;

    let db_pool = database::connect(&config.database).await?;
    let db_repo = DbRepository::new(db_pool);
    let facade = AnalyticsFacade::new(Arc::new(db_repo), &config.analytics);
    let app = router(Arc::new(AppState { facade }));

    tracing::info!(%addr, "Analytics service listening.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
