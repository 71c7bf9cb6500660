use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tower_http::trace::TraceLayer;

use crate::api::{account_count, ApiAnalyzeRequest, ApiAnalyzeResponse, ApiQualityRejection};
use trend_reporter::config::ReportConfig;
use trend_reporter::{analyze, validate_fetch_quality, ReportError};

#[derive(Clone)]
struct AppState {
    config: Arc<ReportConfig>,
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub async fn serve(args: crate::ServeArgs, config: ReportConfig) -> Result<(), ReportError> {
    let app = router(config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|err| ReportError::Server(format!("invalid bind address: {}", err)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .await
        .map_err(|err| ReportError::Server(err.to_string()))?;

    Ok(())
}

fn router(config: ReportConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiAnalyzeRequest>,
) -> Result<Json<ApiAnalyzeResponse>, Response> {
    let request_id = request
        .request_id
        .clone()
        .unwrap_or_else(generate_request_id);
    let (batch, config) = request
        .into_parts(&state.config)
        .map_err(|err| (StatusCode::BAD_REQUEST, err).into_response())?;

    let quality = validate_fetch_quality(&batch.posts, account_count(&batch));
    if !quality.valid {
        tracing::warn!(%request_id, summary = %quality.summary(), "rejected batch");
        let rejection = ApiQualityRejection::from_report(quality, request_id);
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(rejection)).into_response());
    }

    let result = analyze(&batch, &config);
    tracing::info!(%request_id, posts = result.total_posts, "analysis served");
    Ok(Json(ApiAnalyzeResponse {
        request_id,
        quality,
        result,
    }))
}

fn generate_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("req-{}-{}", now_ms(), counter)
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
