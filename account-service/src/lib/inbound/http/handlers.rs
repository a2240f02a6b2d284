use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::DateTime;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::user::models::User;
use crate::user::errors::UserError;

pub mod delete_user;
pub mod get_me;
pub mod get_user;
pub mod health;
pub mod login;
pub mod register;
pub mod update_user;

const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(Some(data))))
    }
}

impl ApiSuccess<()> {
    /// Success envelope without a `data` member.
    pub fn empty(status: StatusCode) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(None)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
}

impl ApiError {
    /// Map a domain failure onto the status a route uses for failures.
    ///
    /// Input validation is always 400, infrastructure failures always 500
    /// and failed credentials always 401; everything else takes the route's
    /// `failure_status` with a fixed message.
    pub fn for_route(err: UserError, failure_status: StatusCode) -> Self {
        if err.is_validation() {
            return ApiError::BadRequest(err.to_string());
        }
        if err.is_internal() {
            return ApiError::InternalServerError(err.to_string());
        }

        match err {
            UserError::InvalidCredentials | UserError::NotFoundByEmail(_) => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            _ => match failure_status {
                StatusCode::BAD_REQUEST => ApiError::BadRequest(err.to_string()),
                StatusCode::NOT_FOUND => ApiError::NotFound("User not found".to_string()),
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized("Unauthorized".to_string()),
                _ => ApiError::InternalServerError(err.to_string()),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Detail of a 5xx failure, kept out of the body and picked up by the
/// request logger.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ApiError::InternalServerError(detail) => {
                let mut response = (
                    status,
                    Json(ApiErrorBody::new(status, INTERNAL_ERROR_MESSAGE.to_string())),
                )
                    .into_response();
                response
                    .extensions_mut()
                    .insert(InternalErrorDetail(detail));
                response
            }
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Unauthorized(msg) => {
                (status, Json(ApiErrorBody::new(status, msg))).into_response()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(data: Option<T>) -> Self {
        Self {
            status: ResponseStatus::Success,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    status: ResponseStatus,
    error: ApiErrorData,
}

impl ApiErrorBody {
    pub fn new(status_code: StatusCode, message: String) -> Self {
        Self {
            status: ResponseStatus::Error,
            error: ApiErrorData {
                code: status_code.as_u16(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub code: u16,
    pub message: String,
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "Rejected request body");
            ApiError::from(e)
        })?;

        Ok(ApiJson(value))
    }
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponseData {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub login_date: DateTime<Utc>,
}

impl From<&User> for UserResponseData {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            email: user.email.as_str().to_string(),
            avatar: user.avatar.as_ref().map(|bytes| BASE64.encode(bytes)),
            country: user.country.as_ref().map(|c| c.as_str().to_string()),
            created_at: user.created_at,
            updated_at: user.updated_at,
            login_date: user.login_date,
        }
    }
}

/// A user together with the session token just issued for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithTokenResponseData {
    pub user: UserResponseData,
    pub token: String,
}

/// Decode an optional base64 avatar, treating blank input as absent.
pub(crate) fn decode_avatar(
    avatar: Option<String>,
) -> Result<Option<Vec<u8>>, base64::DecodeError> {
    match avatar.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(encoded) => BASE64.decode(encoded).map(Some),
    }
}

/// Drop blank optional strings so they count as "not provided".
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::errors::EmailError;

    #[test]
    fn test_validation_errors_are_bad_request() {
        let err = UserError::from(EmailError::InvalidFormat("x".to_string()));
        assert!(matches!(
            ApiError::for_route(err, StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn test_credential_errors_are_unauthorized() {
        for err in [
            UserError::InvalidCredentials,
            UserError::NotFoundByEmail("a@b.com".to_string()),
        ] {
            assert_eq!(
                ApiError::for_route(err, StatusCode::INTERNAL_SERVER_ERROR),
                ApiError::Unauthorized("Invalid credentials".to_string())
            );
        }
    }

    #[test]
    fn test_route_failure_status_is_used() {
        let not_found = UserError::NotFound("id".to_string());
        assert!(matches!(
            ApiError::for_route(not_found.clone(), StatusCode::NOT_FOUND),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::for_route(not_found, StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::InternalServerError(_)
        ));
    }

    #[test]
    fn test_infrastructure_errors_are_internal_on_every_route() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            for err in [
                UserError::Hashing("malformed hash".to_string()),
                UserError::Token("empty secret".to_string()),
                UserError::DatabaseError("users.find_by_email: refused".to_string()),
                UserError::Unknown("boom".to_string()),
            ] {
                let detail = err.to_string();
                assert_eq!(
                    ApiError::for_route(err, status),
                    ApiError::InternalServerError(detail)
                );
            }
        }
    }

    #[test]
    fn test_route_failures_use_fixed_messages() {
        let not_found = UserError::NotFound("3f2b0c1e-0000-0000-0000-000000000000".to_string());
        assert_eq!(
            ApiError::for_route(not_found.clone(), StatusCode::NOT_FOUND),
            ApiError::NotFound("User not found".to_string())
        );
        assert_eq!(
            ApiError::for_route(not_found, StatusCode::UNAUTHORIZED),
            ApiError::Unauthorized("Unauthorized".to_string())
        );
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let response =
            ApiError::InternalServerError("users.create: connection reset".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalErrorDetail>().unwrap();
        assert_eq!(detail.0, "users.create: connection reset");
    }

    #[test]
    fn test_envelopes_serialize() {
        let success = serde_json::to_value(ApiResponseBody::new(Some("x"))).unwrap();
        assert_eq!(success, serde_json::json!({"status": "success", "data": "x"}));

        let empty = serde_json::to_value(ApiResponseBody::<()>::new(None)).unwrap();
        assert_eq!(empty, serde_json::json!({"status": "success"}));

        let error =
            serde_json::to_value(ApiErrorBody::new(StatusCode::NOT_FOUND, "gone".to_string()))
                .unwrap();
        assert_eq!(
            error,
            serde_json::json!({"status": "error", "error": {"code": 404, "message": "gone"}})
        );
    }

    #[test]
    fn test_decode_avatar() {
        assert_eq!(decode_avatar(None).unwrap(), None);
        assert_eq!(decode_avatar(Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            decode_avatar(Some("AQID".to_string())).unwrap(),
            Some(vec![1, 2, 3])
        );
        assert!(decode_avatar(Some("***".to_string())).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("x".to_string())), Some("x".to_string()));
    }
}
