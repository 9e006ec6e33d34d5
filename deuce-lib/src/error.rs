//! Error taxonomy shared by every service, and its HTTP mapping.
//!
//! Services translate backend-specific failures into this enum at their
//! boundary (see spec §7). `Gone` is special: it is produced by
//! `BlockService` after it notices metadata/storage divergence, and the
//! block is marked invalid in metadata as a side effect before the error
//! is returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("gone: {0}")]
    Gone(String),

    #[error("hash mismatch: {0}")]
    HashMismatch(String),

    #[error("length mismatch: {0}")]
    LengthMismatch(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("bad gateway: {0}")]
    BadGateway(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    title: &'a str,
    description: String,
}

impl Error {
    fn title(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "Bad Request",
            Error::Unauthorized(_) => "Unauthorized",
            Error::NotFound(_) => "Not Found",
            Error::MethodNotAllowed(_) => "Method Not Allowed",
            Error::Conflict(_) => "Conflict",
            Error::Gone(_) => "Gone",
            Error::HashMismatch(_) => "Hash Mismatch",
            Error::LengthMismatch(_) => "Length Mismatch",
            Error::Internal(_) => "Internal Error",
            Error::BadGateway(_) => "Bad Gateway",
            Error::ServiceUnavailable(_) => "Service Unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Gone(_) => StatusCode::GONE,
            Error::HashMismatch(_) | Error::LengthMismatch(_) => {
                StatusCode::PRECONDITION_FAILED
            }
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Error::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let title = self.title();
        let description = self.to_string();

        tracing::error!(status = %status, %description, "request failed");

        let body = Json(ErrorBody { title, description });
        (status, body).into_response()
    }
}
