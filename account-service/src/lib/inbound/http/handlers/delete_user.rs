use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;

use crate::domain::user::models::UserId;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::handlers::ApiSuccess;
use crate::inbound::http::router::AppState;

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiSuccess<()>, ApiError> {
    let user_id = UserId::from_string(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .account_service
        .delete_user(&user_id)
        .await
        .map_err(|e| ApiError::for_route(e, StatusCode::INTERNAL_SERVER_ERROR))
        .map(|_| ApiSuccess::empty(StatusCode::OK))
}
