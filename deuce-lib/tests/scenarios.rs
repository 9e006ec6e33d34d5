//! End-to-end HTTP scenarios from spec §8, driven through the real route
//! table against the in-memory backend pair (spec §8 "Concrete end-to-end
//! scenarios").

use axum::http::StatusCode;
use axum_test::TestServer;
use bytes::Bytes;
use deuce_lib::model::block::sha1_hex;
use deuce_lib::services::Services;

const PROJECT: &str = "p1";
const VAULT: &str = "vault_A";

fn app() -> TestServer {
    let services = Services::mocks();
    TestServer::new(deuce_lib::create_app(services)).unwrap()
}

async fn create_vault(server: &TestServer, vault: &str) {
    let response = server.put(&format!("/v1.0/vaults/{vault}")).add_header("x-project-id", PROJECT).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
}

async fn put_block(server: &TestServer, vault: &str, bytes: &[u8]) -> axum_test::TestResponse {
    let block_id = sha1_hex(bytes);
    server
        .put(&format!("/v1.0/vaults/{vault}/blocks/{block_id}"))
        .add_header("x-project-id", PROJECT)
        .bytes(Bytes::copy_from_slice(bytes))
        .await
}

#[tokio::test]
async fn scenario_1_happy_path() {
    let server = app();
    create_vault(&server, VAULT).await;

    let response = put_block(&server, VAULT, b"hello").await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let block_id = sha1_hex(b"hello");
    let response = server
        .get(&format!("/v1.0/vaults/{VAULT}/blocks/{block_id}"))
        .add_header("x-project-id", PROJECT)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.as_bytes(), &Bytes::from_static(b"hello"));
    assert_eq!(response.header("x-block-reference-count"), "0");
}

#[tokio::test]
async fn scenario_2_dedup_produces_an_orphan() {
    let server = app();
    create_vault(&server, VAULT).await;

    let first = put_block(&server, VAULT, b"hello").await;
    let second = put_block(&server, VAULT, b"hello").await;
    assert_eq!(first.status_code(), StatusCode::CREATED);
    assert_eq!(second.status_code(), StatusCode::CREATED);

    let sid1 = first.header("x-storage-id").to_str().unwrap().to_string();
    let sid2 = second.header("x-storage-id").to_str().unwrap().to_string();
    assert_ne!(sid1, sid2);

    let response = server
        .head(&format!("/v1.0/vaults/{VAULT}/storage/blocks/{sid2}"))
        .add_header("x-project-id", PROJECT)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(response.header("x-block-orphaned"), "true");
    assert_eq!(response.header("x-block-reference-count"), "0");
}

#[tokio::test]
async fn scenario_3_assembles_a_finalized_file() {
    let server = app();
    create_vault(&server, VAULT).await;

    let b1 = vec![b'a'; 100];
    let b2 = vec![b'b'; 100];
    let b3 = vec![b'c'; 100];
    for bytes in [&b1, &b2, &b3] {
        assert_eq!(put_block(&server, VAULT, bytes).await.status_code(), StatusCode::CREATED);
    }

    let response = server
        .post(&format!("/v1.0/vaults/{VAULT}/files"))
        .add_header("x-project-id", PROJECT)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let file_id = response.json::<serde_json::Value>()["file_id"].as_str().unwrap().to_string();

    let assignments = serde_json::json!([
        [sha1_hex(&b1), 0],
        [sha1_hex(&b2), 100],
        [sha1_hex(&b3), 200],
    ]);
    let response = server
        .post(&format!("/v1.0/vaults/{VAULT}/files/{file_id}/blocks"))
        .add_header("x-project-id", PROJECT)
        .json(&assignments)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .post(&format!("/v1.0/vaults/{VAULT}/files/{file_id}"))
        .add_header("x-project-id", PROJECT)
        .add_header("x-file-length", "300")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .get(&format!("/v1.0/vaults/{VAULT}/files/{file_id}"))
        .add_header("x-project-id", PROJECT)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-length"), "300");
    let mut expected = b1.clone();
    expected.extend_from_slice(&b2);
    expected.extend_from_slice(&b3);
    assert_eq!(response.as_bytes(), &Bytes::from(expected));
}

#[tokio::test]
async fn scenario_4_gap_fails_finalization() {
    let server = app();
    create_vault(&server, VAULT).await;

    let b1 = vec![b'a'; 100];
    let b3 = vec![b'c'; 100];
    put_block(&server, VAULT, &b1).await;
    put_block(&server, VAULT, &b3).await;

    let response = server
        .post(&format!("/v1.0/vaults/{VAULT}/files"))
        .add_header("x-project-id", PROJECT)
        .await;
    let file_id = response.json::<serde_json::Value>()["file_id"].as_str().unwrap().to_string();

    let assignments = serde_json::json!([[sha1_hex(&b1), 0], [sha1_hex(&b3), 200]]);
    server
        .post(&format!("/v1.0/vaults/{VAULT}/files/{file_id}/blocks"))
        .add_header("x-project-id", PROJECT)
        .json(&assignments)
        .await;

    let response = server
        .post(&format!("/v1.0/vaults/{VAULT}/files/{file_id}"))
        .add_header("x-project-id", PROJECT)
        .add_header("x-file-length", "300")
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert!(body["description"].as_str().unwrap().contains("gap"));
}

#[tokio::test]
async fn scenario_5_referenced_block_delete_is_refused() {
    let server = app();
    create_vault(&server, VAULT).await;

    let b1 = vec![b'a'; 100];
    let b2 = vec![b'b'; 100];
    let b3 = vec![b'c'; 100];
    for bytes in [&b1, &b2, &b3] {
        put_block(&server, VAULT, bytes).await;
    }

    let response = server
        .post(&format!("/v1.0/vaults/{VAULT}/files"))
        .add_header("x-project-id", PROJECT)
        .await;
    let file_id = response.json::<serde_json::Value>()["file_id"].as_str().unwrap().to_string();

    let assignments = serde_json::json!([
        [sha1_hex(&b1), 0],
        [sha1_hex(&b2), 100],
        [sha1_hex(&b3), 200],
    ]);
    server
        .post(&format!("/v1.0/vaults/{VAULT}/files/{file_id}/blocks"))
        .add_header("x-project-id", PROJECT)
        .json(&assignments)
        .await;
    server
        .post(&format!("/v1.0/vaults/{VAULT}/files/{file_id}"))
        .add_header("x-project-id", PROJECT)
        .add_header("x-file-length", "300")
        .await;

    let block_id = sha1_hex(&b2);
    let response = server
        .delete(&format!("/v1.0/vaults/{VAULT}/blocks/{block_id}"))
        .add_header("x-project-id", PROJECT)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.header("x-block-reference-count"), "1");
}

#[tokio::test]
async fn scenario_6_orphan_reclaim_then_refused_on_live_binding() {
    let server = app();
    create_vault(&server, VAULT).await;

    let first = put_block(&server, VAULT, b"hello").await;
    let second = put_block(&server, VAULT, b"hello").await;
    let sid1 = first.header("x-storage-id").to_str().unwrap().to_string();
    let sid2 = second.header("x-storage-id").to_str().unwrap().to_string();

    let response = server
        .delete(&format!("/v1.0/vaults/{VAULT}/storage/blocks/{sid2}"))
        .add_header("x-project-id", PROJECT)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server
        .delete(&format!("/v1.0/vaults/{VAULT}/storage/blocks/{sid1}"))
        .add_header("x-project-id", PROJECT)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}
