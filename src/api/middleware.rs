//! API middleware
//!
//! Request-user extraction and request logging. Authentication itself
//! (tokens, passcodes) happens upstream of this service; by the time a
//! request arrives, the authenticated user id travels in a header.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the authenticated user's id
pub const REQUEST_USER_HEADER: &str = "x-request-user-id";

/// The authenticated user for the current request
#[derive(Debug, Clone, Copy)]
pub struct RequestUser(pub Uuid);

/// Extract `X-Request-User-Id` into a `RequestUser` extension.
pub async fn request_user_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(REQUEST_USER_HEADER)
        .ok_or_else(|| AppError::MissingHeader(REQUEST_USER_HEADER.to_string()))?;

    let user_id: Uuid = header
        .to_str()
        .ok()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| {
            AppError::InvalidRequest(format!("{} must be a UUID", REQUEST_USER_HEADER))
        })?;

    request.extensions_mut().insert(RequestUser(user_id));
    Ok(next.run(request).await)
}

/// Log method, path, status and latency for every request.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );

    response
}
