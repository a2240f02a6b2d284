use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness probe. Does not touch the database.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "OK" })))
}
