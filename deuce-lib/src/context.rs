//! Per-request context (spec §2 "RequestContext"), extracted once at the
//! HTTP boundary and threaded through to the services.
//!
//! Grounded in the teacher's habit of pulling cross-cutting request state
//! out via an `axum` `FromRequestParts` impl (see its `User` extractor in
//! `services/auth`) rather than passing raw `HeaderMap`s into handlers. The
//! deadline below follows the same `Services: FromRef<S>` bound that
//! extractor uses to reach shared state from within `from_request_parts`.

use std::future::Future;
use std::time::Duration;

use axum::extract::{FromRef, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tokio::time::Instant;
use uuid::Uuid;

use crate::constants::headers::{PROJECT_ID, TRANSACTION_ID};
use crate::error::Error;
use crate::services::Services;

/// Ensures every request carries a `Transaction-Id` header (generating one
/// if the client didn't send one) and echoes the same value back on the
/// response (spec §6 "Responses carry `Transaction-Id`"). Runs as an axum
/// middleware ahead of routing so `RequestContext::from_request_parts` can
/// simply read the header rather than generate its own, keeping the value
/// on the request and the value on the response consistent.
pub async fn transaction_id_middleware(mut request: Request, next: Next) -> Response {
    let transaction_id = request
        .headers()
        .get(TRANSACTION_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header_value = HeaderValue::from_str(&transaction_id).expect("uuid/ascii is a valid header value");
    request.headers_mut().insert(TRANSACTION_ID, header_value.clone());

    let mut response = next.run(request).await;
    response.headers_mut().insert(TRANSACTION_ID, header_value);
    response
}

/// Tenant and tracing identity for one request. `project_id` scopes every
/// backend call; `transaction_id` is echoed back on every response and
/// threaded into tracing spans. `deadline` bounds how long this request's
/// backend calls are allowed to run (spec §5 "Cancellation and timeouts").
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub project_id: String,
    pub transaction_id: String,
    pub deadline: Instant,
}

impl RequestContext {
    /// The key services pass to `MetadataBackend`/`BlockBackend`: vaults
    /// are scoped by `(project_id, vault_id)` in the data model (spec §3),
    /// but the backend contracts of §4.1/§4.2 take a single `vault`
    /// argument, so the project is folded into that key here.
    pub fn vault_key(&self, vault_id: &str) -> String {
        format!("{}:{}", self.project_id, vault_id)
    }

    /// Runs a backend/service call under this request's deadline. An
    /// elapsed deadline surfaces as `ServiceUnavailable` (spec §7), the
    /// same mapping a transient backend failure gets, since to the caller
    /// both look like "the backend didn't answer in time."
    pub async fn with_timeout<F, T>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        match tokio::time::timeout_at(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::ServiceUnavailable("request deadline exceeded".to_string())),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    Services: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let services = Services::from_ref(state);

        let project_id = parts
            .headers
            .get(PROJECT_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Unauthorized(format!("missing required {PROJECT_ID} header")))?
            .to_string();

        let transaction_id = parts
            .headers
            .get(TRANSACTION_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let deadline = Instant::now() + Duration::from_secs(services.request_timeout_secs);

        Ok(RequestContext { project_id, transaction_id, deadline })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_key_folds_project_into_vault_id() {
        let ctx = RequestContext {
            project_id: "p1".to_string(),
            transaction_id: "t1".to_string(),
            deadline: Instant::now() + Duration::from_secs(30),
        };
        assert_eq!(ctx.vault_key("vault_A"), "p1:vault_A");
    }

    #[tokio::test]
    async fn with_timeout_surfaces_service_unavailable_once_elapsed() {
        let ctx = RequestContext {
            project_id: "p1".to_string(),
            transaction_id: "t1".to_string(),
            deadline: Instant::now(),
        };
        let result: Result<(), Error> = ctx
            .with_timeout(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::ServiceUnavailable(_))));
    }
}
