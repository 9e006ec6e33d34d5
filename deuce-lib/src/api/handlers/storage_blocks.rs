//! `/v1.0/vaults/{v}/storage/blocks`, `/v1.0/vaults/{v}/storage/blocks/{s}`
//! (spec §4.5, §6).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::header_map;
use super::pagination::{next_batch_url, PaginationQuery};
use crate::constants::headers::{
    BLOCK_LOCATION, BLOCK_ORPHANED, BLOCK_SIZE, BLOCK_REF_COUNT, NEXT_BATCH, REF_MODIFIED, STORAGE_ID,
};
use crate::context::RequestContext;
use crate::error::Result;
use crate::model::block::StorageBlockInfo;
use crate::model::page::Page;
use crate::services::Services;

fn storage_block_header_pairs(info: &StorageBlockInfo) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        (STORAGE_ID, info.storage_id.clone()),
        (BLOCK_REF_COUNT, info.ref_count.to_string()),
        (BLOCK_SIZE, info.size.to_string()),
        (BLOCK_ORPHANED, info.orphan.to_string()),
    ];
    if let Some(ref_modified) = info.ref_modified {
        pairs.push((REF_MODIFIED, ref_modified.to_string()));
    }
    pairs
}

pub async fn list_storage_blocks(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let limit = pagination.resolve_limit(services.default_page_limit, services.max_page_limit);
    let fetched = ctx
        .with_timeout(services.storage_blocks.list(&ctx.vault_key(&vault_id), pagination.marker.as_deref(), limit))
        .await?;
    let page = Page::from_fetch(fetched, limit, |id| id.clone());

    let mut headers = Vec::new();
    if let Some(marker) = &page.next_marker {
        let path = format!("/v1.0/vaults/{vault_id}/storage/blocks");
        headers.push((NEXT_BATCH, next_batch_url(&path, marker, limit)));
    }

    Ok((StatusCode::OK, header_map(&headers)?, Json(page.items)))
}

pub async fn head_storage_block(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, storage_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let info = ctx.with_timeout(services.storage_blocks.head(&ctx.vault_key(&vault_id), &storage_id)).await?;
    Ok((StatusCode::NO_CONTENT, header_map(&storage_block_header_pairs(&info))?))
}

pub async fn get_storage_block(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, storage_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let (info, data) = ctx.with_timeout(services.storage_blocks.get(&ctx.vault_key(&vault_id), &storage_id)).await?;
    Ok((StatusCode::OK, header_map(&storage_block_header_pairs(&info))?, data))
}

pub async fn delete_storage_block(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, storage_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    ctx.with_timeout(services.storage_blocks.delete(&ctx.vault_key(&vault_id), &storage_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Storage objects are never created directly; this route exists only to
/// answer with where to PUT the content instead (spec §4.5).
pub async fn put_storage_block(Path((vault_id, _storage_id)): Path<(String, String)>) -> Result<impl IntoResponse> {
    let location = format!("/v1.0/vaults/{vault_id}/blocks/{{block_id}}");
    Ok((
        StatusCode::METHOD_NOT_ALLOWED,
        header_map(&[(BLOCK_LOCATION, location)])?,
    ))
}
