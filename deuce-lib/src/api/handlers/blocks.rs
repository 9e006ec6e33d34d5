//! `/v1.0/vaults/{v}/blocks`, `/v1.0/vaults/{v}/blocks/{id}` (spec §4.3, §6).

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::header_map;
use super::pagination::{next_batch_url, PaginationQuery};
use crate::api::validation::{content_length, decode_msgpack_batch};
use crate::constants::headers::{BLOCK_ID, BLOCK_REF_COUNT, NEXT_BATCH, REF_MODIFIED, STORAGE_ID};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::model::block::validate_block_id;
use crate::model::page::Page;
use crate::services::block_service::{BlockDelete, BlockHeaders, BlockRead};
use crate::services::Services;

fn block_header_pairs(headers: &BlockHeaders) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        (BLOCK_ID, headers.block_id.clone()),
        (STORAGE_ID, headers.storage_id.clone()),
        (BLOCK_REF_COUNT, headers.ref_count.to_string()),
    ];
    if let Some(ref_modified) = headers.ref_modified {
        pairs.push((REF_MODIFIED, ref_modified.to_string()));
    }
    pairs
}

pub async fn list_blocks(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let limit = pagination.resolve_limit(services.default_page_limit, services.max_page_limit);
    let fetched = ctx
        .with_timeout(services.blocks.list(&ctx.vault_key(&vault_id), pagination.marker.as_deref(), limit))
        .await?;
    let page = Page::from_fetch(fetched, limit, |id| id.clone());

    let mut headers = Vec::new();
    if let Some(marker) = &page.next_marker {
        let path = format!("/v1.0/vaults/{vault_id}/blocks");
        headers.push((NEXT_BATCH, next_batch_url(&path, marker, limit)));
    }

    Ok((StatusCode::OK, header_map(&headers)?, Json(page.items)))
}

pub async fn put_block(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, block_id)): Path<(String, String)>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    validate_block_id(&block_id)?;
    let declared_length = content_length(&request_headers);
    let outcome =
        ctx.with_timeout(services.blocks.put(&ctx.vault_key(&vault_id), &block_id, body, declared_length)).await?;
    Ok((StatusCode::CREATED, header_map(&block_header_pairs(&outcome))?))
}

pub async fn post_blocks_batch(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let blocks = decode_msgpack_batch(&body)?;
    let outcomes = ctx.with_timeout(services.blocks.put_batch(&ctx.vault_key(&vault_id), blocks)).await?;
    let block_ids: Vec<String> = outcomes.into_iter().map(|h| h.block_id).collect();
    Ok((StatusCode::CREATED, Json(block_ids)))
}

pub async fn get_block(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, block_id)): Path<(String, String)>,
) -> Result<axum::response::Response> {
    match ctx.with_timeout(services.blocks.get(&ctx.vault_key(&vault_id), &block_id)).await? {
        BlockRead::Found { headers, data } => {
            Ok((StatusCode::OK, header_map(&block_header_pairs(&headers))?, data).into_response())
        }
        BlockRead::Gone { headers, reason } => {
            let response_headers = header_map(&block_header_pairs(&headers))?;
            let mut response = Error::Gone(reason).into_response();
            for (name, value) in response_headers.iter() {
                response.headers_mut().insert(name.clone(), value.clone());
            }
            Ok(response)
        }
    }
}

pub async fn head_block(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, block_id)): Path<(String, String)>,
) -> Result<axum::response::Response> {
    match ctx.with_timeout(services.blocks.get(&ctx.vault_key(&vault_id), &block_id)).await? {
        BlockRead::Found { headers, .. } => {
            Ok((StatusCode::NO_CONTENT, header_map(&block_header_pairs(&headers))?).into_response())
        }
        BlockRead::Gone { headers, reason } => {
            let response_headers = header_map(&block_header_pairs(&headers))?;
            let mut response = Error::Gone(reason).into_response();
            for (name, value) in response_headers.iter() {
                response.headers_mut().insert(name.clone(), value.clone());
            }
            Ok(response)
        }
    }
}

pub async fn delete_block(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, block_id)): Path<(String, String)>,
) -> Result<axum::response::Response> {
    match ctx.with_timeout(services.blocks.delete(&ctx.vault_key(&vault_id), &block_id)).await? {
        BlockDelete::Deleted => Ok(StatusCode::NO_CONTENT.into_response()),
        BlockDelete::Referenced { headers } => {
            let response_headers = header_map(&block_header_pairs(&headers))?;
            let mut response = Error::Conflict(format!(
                "block {block_id:?} is still referenced by {} file(s)",
                headers.ref_count
            ))
            .into_response();
            for (name, value) in response_headers.iter() {
                response.headers_mut().insert(name.clone(), value.clone());
            }
            Ok(response)
        }
    }
}
