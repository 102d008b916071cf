//! HTTP prediction service.
//!
//! Routes:
//!
//! - `GET /`: liveness check
//! - `POST /predict`: score one raw loan application
//!
//! The `Scorer` is loaded once before binding and shared read-only by every
//! request. CORS is fully permissive so a browser front-end on any origin can
//! call the API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::{LoanApplication, ScoreResponse, ServeConfig, StatusResponse};
use crate::error::AppError;
use crate::scoring::Scorer;

pub const STATUS_MESSAGE: &str = "Farmer Credit API running";

pub fn router(scorer: Arc<Scorer>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(scorer)
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: STATUS_MESSAGE.to_string(),
    })
}

async fn predict(
    State(scorer): State<Arc<Scorer>>,
    Json(loan): Json<LoanApplication>,
) -> Result<Json<ScoreResponse>, AppError> {
    let response = scorer.score(&loan)?;
    tracing::debug!(
        country = %loan.country,
        credit_score = response.credit_score,
        decision = ?response.decision,
        "scored application"
    );
    Ok(Json(response))
}

/// Load artifacts, bind, and serve until Ctrl-C.
///
/// Missing or unreadable artifacts fail before the listener is bound.
pub async fn serve(config: &ServeConfig) -> Result<(), AppError> {
    let scorer = Scorer::load(&config.model_path, &config.mappings_path)?;
    let app = router(Arc::new(scorer));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::new(5, format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::new(5, format!("Server error: {e}")))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
