use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use super::UserResponseData;
use super::UserWithTokenResponseData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<ApiSuccess<UserWithTokenResponseData>, ApiError> {
    // An address that cannot be valid cannot match an account either.
    let email = EmailAddress::new(body.email)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let logged_in = state
        .account_service
        .login(LoginCommand {
            email,
            password: body.password,
        })
        .await
        .map_err(|e| ApiError::for_route(e, StatusCode::UNAUTHORIZED))?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        UserWithTokenResponseData {
            user: UserResponseData::from(&logged_in.user),
            token: logged_in.token,
        },
    ))
}

/// HTTP request body for login (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}
