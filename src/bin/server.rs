use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parcel_glance::{
    Config, LocalPackageStore, PackageSummary, StdoutNavigator, TrackError, Tracker, UpsClient,
};

/// Application state shared across all requests
#[derive(Clone)]
struct AppState {
    tracker: Arc<Tracker>,
    metrics: Arc<Metrics>,
}

/// Server metrics
struct Metrics {
    total_requests: AtomicU64,
    requests_in_flight: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    fn begin(&self) -> RequestGuard<'_> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
        RequestGuard(&self.requests_in_flight)
    }
}

/// RAII guard for tracking in-flight requests
struct RequestGuard<'a>(&'a AtomicU64);

impl<'a> Drop for RequestGuard<'a> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,parcel_glance=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to read configuration")?;

    let client = UpsClient::new(&config.client).context("Failed to build HTTP client")?;
    let store = LocalPackageStore::new(&config.store_path);
    tracing::info!(store = %store.path().display(), api = %config.client.api_base, "starting");

    let tracker = Arc::new(
        Tracker::new(Arc::new(client), Arc::new(store), Arc::new(StdoutNavigator))
            .with_view_wait(config.view_wait),
    );
    let app = build_app(tracker.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracker.shutdown();
    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn build_app(tracker: Arc<Tracker>) -> Router {
    let metrics = Arc::new(Metrics {
        total_requests: AtomicU64::new(0),
        requests_in_flight: AtomicU64::new(0),
        start_time: Instant::now(),
    });

    let state = AppState { tracker, metrics };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/packages", get(list_packages).post(add_package))
        .route(
            "/api/packages/:name",
            get(package_summary).delete(remove_package),
        )
        .route("/api/packages/:name/logs", get(package_logs))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Deserialize)]
struct AddPackageRequest {
    package_name: String,
    tracking_number: String,
}

#[derive(Serialize)]
struct SummaryResponse {
    success: bool,
    data: PackageSummary,
}

#[derive(Serialize)]
struct ListResponse {
    success: bool,
    data: Vec<PackageSummary>,
    /// Packages whose status could not be fetched
    unavailable: Vec<String>,
}

#[derive(Serialize)]
struct LogsResponse {
    success: bool,
    data: Vec<String>,
}

async fn add_package(
    State(state): State<AppState>,
    Json(request): Json<AddPackageRequest>,
) -> Result<(StatusCode, Json<SummaryResponse>), ApiError> {
    let _guard = state.metrics.begin();

    if request.package_name.trim().is_empty() || request.tracking_number.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "package_name and tracking_number are required".to_string(),
        ));
    }

    let summary = state
        .tracker
        .add_package(&request.package_name, &request.tracking_number)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SummaryResponse {
            success: true,
            data: summary,
        }),
    ))
}

async fn list_packages(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    let _guard = state.metrics.begin();

    let report = state.tracker.restore().await?;
    Ok(Json(ListResponse {
        success: true,
        data: report.summaries,
        unavailable: report.unavailable,
    }))
}

async fn package_summary(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let _guard = state.metrics.begin();

    Ok(Json(SummaryResponse {
        success: true,
        data: state.tracker.summary(&name).await?,
    }))
}

async fn package_logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LogsResponse>, ApiError> {
    let _guard = state.metrics.begin();

    Ok(Json(LogsResponse {
        success: true,
        data: state.tracker.show_logs(&name).await?,
    }))
}

async fn remove_package(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.metrics.begin();

    state.tracker.remove_package(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        total_requests: state.metrics.total_requests.load(Ordering::Relaxed),
        requests_in_flight: state.metrics.requests_in_flight.load(Ordering::Relaxed),
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    total_requests: u64,
    requests_in_flight: u64,
    uptime_seconds: u64,
}

/// API error types
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
    InternalError(String),
}

impl From<TrackError> for ApiError {
    fn from(e: TrackError) -> Self {
        match e {
            TrackError::NotFound { .. } | TrackError::UnknownPackage(_) => {
                ApiError::NotFound(e.to_string())
            }
            TrackError::Carrier { .. }
            | TrackError::UnexpectedStatus { .. }
            | TrackError::Http(_)
            | TrackError::Deserialize { .. } => {
                tracing::error!("Carrier error: {}", e);
                ApiError::Upstream(e.to_string())
            }
            _ => {
                tracing::error!("Internal error: {}", e);
                ApiError::InternalError(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
