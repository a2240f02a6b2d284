use axum::http::StatusCode;
use axum::Extension;

use super::ApiSuccess;
use super::UserResponseData;
use crate::inbound::http::middleware::CurrentUser;

/// Profile of the caller identified by the bearer token.
pub async fn get_me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiSuccess<UserResponseData> {
    ApiSuccess::new(StatusCode::OK, UserResponseData::from(&user))
}
