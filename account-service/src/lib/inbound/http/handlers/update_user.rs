use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::decode_avatar;
use super::non_blank;
use crate::domain::user::models::Country;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PersonName;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::UserId;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::handlers::ApiJson;
use crate::inbound::http::handlers::ApiSuccess;
use crate::inbound::http::handlers::UserResponseData;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// HTTP request body for updating a user (raw JSON)
///
/// Absent, null and blank fields all leave the stored value untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Base64-encoded image bytes.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl UpdateUserRequest {
    fn try_into_command(self) -> Result<UpdateUserCommand, ApiError> {
        let to_bad_request = |e: UserError| ApiError::BadRequest(e.to_string());

        let first_name = non_blank(self.first_name)
            .map(PersonName::new)
            .transpose()
            .map_err(|e| to_bad_request(e.into()))?;
        let last_name = non_blank(self.last_name)
            .map(PersonName::new)
            .transpose()
            .map_err(|e| to_bad_request(e.into()))?;
        let email = non_blank(self.email)
            .map(EmailAddress::new)
            .transpose()
            .map_err(|e| to_bad_request(e.into()))?;
        let country = non_blank(self.country)
            .map(Country::new)
            .transpose()
            .map_err(|e| to_bad_request(e.into()))?;
        let avatar = decode_avatar(self.avatar)
            .map_err(|e| ApiError::BadRequest(format!("Invalid avatar encoding: {}", e)))?;

        Ok(UpdateUserCommand {
            first_name,
            last_name,
            email,
            avatar,
            country,
        })
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<ApiSuccess<UserResponseData>, ApiError> {
    let user_id = UserId::from_string(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let command = req.try_into_command()?;

    state
        .account_service
        .update_user(&user_id, command)
        .await
        .map_err(|e| ApiError::for_route(e, StatusCode::INTERNAL_SERVER_ERROR))
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}
