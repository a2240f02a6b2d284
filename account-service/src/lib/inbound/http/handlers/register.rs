use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use super::decode_avatar;
use super::non_blank;
use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use super::UserResponseData;
use super::UserWithTokenResponseData;
use crate::domain::user::models::Country;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::domain::user::models::PersonName;
use crate::domain::user::models::RegisterUserCommand;
use crate::inbound::http::router::AppState;
use crate::user::errors::CountryError;
use crate::user::errors::EmailError;
use crate::user::errors::NameError;
use crate::user::errors::PasswordPolicyError;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<ApiSuccess<UserWithTokenResponseData>, ApiError> {
    state
        .account_service
        .register(body.try_into_command()?)
        .await
        .map_err(|e| ApiError::for_route(e, StatusCode::INTERNAL_SERVER_ERROR))
        .map(|registered| {
            ApiSuccess::new(
                StatusCode::CREATED,
                UserWithTokenResponseData {
                    user: UserResponseData::from(&registered.user),
                    token: registered.token,
                },
            )
        })
}

/// HTTP request body for registering an account (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    /// Base64-encoded image bytes.
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid name: {0}")]
    Name(#[from] NameError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),

    #[error("Invalid country: {0}")]
    Country(#[from] CountryError),

    #[error("Invalid avatar encoding: {0}")]
    Avatar(#[from] base64::DecodeError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterUserCommand, ParseRegisterRequestError> {
        Ok(RegisterUserCommand {
            first_name: PersonName::new(self.first_name)?,
            last_name: PersonName::new(self.last_name)?,
            email: EmailAddress::new(self.email)?,
            password: Password::new(self.password)?,
            avatar: decode_avatar(self.avatar)?,
            country: non_blank(self.country).map(Country::new).transpose()?,
        })
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
