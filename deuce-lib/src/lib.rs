//! # Deuce
//!
//! Core library for the Deuce block storage backend: the vault/file/block
//! object model, the metadata-vs-storage consistency protocol, and the
//! HTTP surface that exposes both (spec §1–§6).

pub mod api;
pub mod backends;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod log;
pub mod model;
pub mod services;

pub use api::create_app;
pub use config::Config;
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{create_app, services::Services};

    fn test_app() -> axum::Router {
        create_app(Services::mocks())
    }

    #[tokio::test]
    async fn ping_responds_no_content() {
        let server = TestServer::new(test_app()).unwrap();
        let response = server.get("/v1.0/ping").await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn health_lists_both_backends() {
        let server = TestServer::new(test_app()).unwrap();
        let response = server.get("/v1.0/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let statuses: Vec<String> = response.json();
        assert_eq!(statuses.len(), 2);
    }

    #[tokio::test]
    async fn every_non_diagnostic_route_requires_project_id() {
        let server = TestServer::new(test_app()).unwrap();
        let response = server.get("/v1.0/vaults").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn response_echoes_a_generated_transaction_id() {
        let server = TestServer::new(test_app()).unwrap();
        let response = server.get("/v1.0/vaults").add_header("x-project-id", "p1").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(!response.header("transaction-id").to_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn response_echoes_a_client_supplied_transaction_id() {
        let server = TestServer::new(test_app()).unwrap();
        let response = server
            .get("/v1.0/vaults")
            .add_header("x-project-id", "p1")
            .add_header("transaction-id", "client-chosen-id")
            .await;
        assert_eq!(response.header("transaction-id"), "client-chosen-id");
    }
}
