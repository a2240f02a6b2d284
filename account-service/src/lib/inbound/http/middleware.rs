use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use thiserror::Error;

use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum BearerError {
    #[error("missing Authorization header")]
    Missing,

    #[error("Authorization header is not valid ASCII")]
    NotAscii,

    #[error("Authorization header is not of the form 'Bearer <token>'")]
    Malformed,
}

/// Middleware that validates the session token and adds the caller to
/// request extensions.
///
/// Every failure is answered with the same 401; the cause is only logged.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = bearer_token(req.headers()).map_err(|e| {
        tracing::warn!(error = %e, "Rejected credentials");
        unauthorized()
    })?;

    let claims = state.authenticator.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
        unauthorized()
    })?;

    let user_id = claims.subject_id().map(UserId).map_err(|e| {
        tracing::warn!(error = %e, "Invalid token subject");
        unauthorized()
    })?;

    let user = state
        .account_service
        .get_user(&user_id)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "Token subject could not be resolved");
            unauthorized()
        })?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

fn unauthorized() -> Response {
    ApiError::Unauthorized("Unauthorized".to_string()).into_response()
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The header must split into exactly two space-separated parts; the
/// scheme is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, BearerError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::NotAscii)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(BearerError::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Ok("abc"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(BearerError::Missing));
    }

    #[test]
    fn test_malformed_headers() {
        for value in ["Bearer", "Bearer ", "Basic abc", "Bearer a b", "Bearer  abc", "abc"] {
            assert_eq!(
                bearer_token(&headers(value)),
                Err(BearerError::Malformed),
                "{value}"
            );
        }
    }
}
