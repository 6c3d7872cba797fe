use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::{DataSourceError, StateDataSource};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Ready once the ownership index and the storage root both respond.
#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let message = match timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => {
            let msg = serde_json::json!({"status": "ok"});
            return (StatusCode::OK, Json(msg)).into_response();
        }
        Ok(Err(DataSourceError::DependencyFailure)) => "one or more dependencies aren't available",
        Ok(Err(DataSourceError::ShuttingDown)) => "service is shutting down",
        Err(_) => "health check timed out",
    };

    tracing::warn!("readiness check failed: {}", message);
    let msg = serde_json::json!({"status": "failure", "message": message});
    (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
}
