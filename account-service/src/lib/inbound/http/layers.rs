use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use http::HeaderName;

use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::handlers::InternalErrorDetail;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

fn request_id(request: &Request) -> String {
    request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Middleware that logs one line per HTTP request.
///
/// 5xx responses are logged at ERROR together with the internal detail the
/// handler attached; the detail never reaches the client.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request_id(&request);
    let client_ip = client_ip(&request);

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = start.elapsed().as_millis();

    if let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>() {
        tracing::error!(
            request_id = %request_id,
            client_ip = %client_ip,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            latency_ms = latency_ms,
            error = %detail,
            "HTTP request failed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            request_id = %request_id,
            client_ip = %client_ip,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            latency_ms = latency_ms,
            "HTTP request rejected"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            client_ip = %client_ip,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            latency_ms = latency_ms,
            "HTTP request"
        );
    }

    response
}

/// Middleware that dumps request headers and body at DEBUG.
///
/// Buffers the whole body, so it is only installed when `server.debug` is on.
pub async fn debug_dump(request: Request, next: Next) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to buffer request body");
        ApiError::BadRequest("failed to read request body".to_string())
    })?;

    tracing::debug!(
        method = %parts.method,
        uri = %parts.uri,
        headers = ?parts.headers,
        body = %String::from_utf8_lossy(&bytes),
        "Request dump"
    );

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Turn a handler panic into an enveloped 500.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Handler panicked");

    ApiError::InternalServerError(format!("panic: {}", detail)).into_response()
}
