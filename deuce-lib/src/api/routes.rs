//! Route table (spec §6 "HTTP surface (v1.0)").

use axum::routing::{get, post, put};
use axum::Router;

use super::handlers::{blocks, files, home, storage_blocks, vaults};
use crate::services::Services;

pub fn routes(services: Services) -> Router {
    Router::new()
        .route("/v1.0/", get(home::home))
        .route("/v1.0/ping", get(home::ping))
        .route("/v1.0/health", get(home::health))
        .route("/v1.0/vaults", get(vaults::list_vaults))
        .route(
            "/v1.0/vaults/{vault_id}",
            put(vaults::create_vault)
                .head(vaults::head_vault)
                .get(vaults::get_vault)
                .delete(vaults::delete_vault),
        )
        .route(
            "/v1.0/vaults/{vault_id}/blocks",
            get(blocks::list_blocks).post(blocks::post_blocks_batch),
        )
        .route(
            "/v1.0/vaults/{vault_id}/blocks/{block_id}",
            put(blocks::put_block)
                .get(blocks::get_block)
                .head(blocks::head_block)
                .delete(blocks::delete_block),
        )
        .route(
            "/v1.0/vaults/{vault_id}/files",
            post(files::create_file).get(files::list_files),
        )
        .route(
            "/v1.0/vaults/{vault_id}/files/{file_id}",
            get(files::get_file).post(files::post_file).delete(files::delete_file),
        )
        .route(
            "/v1.0/vaults/{vault_id}/files/{file_id}/blocks",
            get(files::list_file_blocks).post(files::assign_file_blocks),
        )
        .route(
            "/v1.0/vaults/{vault_id}/storage/blocks",
            get(storage_blocks::list_storage_blocks),
        )
        .route(
            "/v1.0/vaults/{vault_id}/storage/blocks/{storage_id}",
            get(storage_blocks::get_storage_block)
                .head(storage_blocks::head_storage_block)
                .put(storage_blocks::put_storage_block)
                .delete(storage_blocks::delete_storage_block),
        )
        .with_state(services)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use super::*;

    fn test_app() -> axum::Router {
        routes(Services::mocks())
    }

    #[tokio::test]
    async fn vault_lifecycle_round_trips() {
        let server = TestServer::new(test_app()).unwrap();

        let response = server.put("/v1.0/vaults/vault_A").add_header("x-project-id", "p1").await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = server.head("/v1.0/vaults/vault_A").add_header("x-project-id", "p1").await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

        let response = server.delete("/v1.0/vaults/vault_A").add_header("x-project-id", "p1").await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

        let response = server.head("/v1.0/vaults/vault_A").add_header("x-project-id", "p1").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
