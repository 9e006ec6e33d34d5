//! `/v1.0/vaults/{v}/files`, `/v1.0/vaults/{v}/files/{f}`,
//! `/v1.0/vaults/{v}/files/{f}/blocks` (spec §4.4, §6).

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::header_map;
use super::pagination::{next_batch_url, PaginationQuery};
use crate::api::validation::file_length;
use crate::constants::headers::NEXT_BATCH;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::model::block::validate_block_id;
use crate::model::file::validate_file_id;
use crate::model::page::Page;
use crate::services::Services;

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub finalized: Option<bool>,
}

pub async fn create_file(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
) -> Result<impl IntoResponse> {
    let file_id = ctx.with_timeout(services.files.create(&ctx.vault_key(&vault_id))).await?;
    let location = format!("/v1.0/vaults/{vault_id}/files/{file_id}");
    Ok((
        StatusCode::CREATED,
        header_map(&[("location", location)])?,
        Json(json!({ "file_id": file_id })),
    ))
}

pub async fn list_files(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<ListFilesQuery>,
) -> Result<impl IntoResponse> {
    let limit = pagination.resolve_limit(services.default_page_limit, services.max_page_limit);
    let finalized = filter.finalized.or(Some(true));

    let fetched = ctx
        .with_timeout(services.files.list(&ctx.vault_key(&vault_id), finalized, pagination.marker.as_deref(), limit))
        .await?;
    let page = Page::from_fetch(fetched, limit, |f| f.file_id.clone());

    let mut headers = Vec::new();
    if let Some(marker) = &page.next_marker {
        let path = format!("/v1.0/vaults/{vault_id}/files");
        headers.push((NEXT_BATCH, next_batch_url(&path, marker, limit)));
    }

    Ok((StatusCode::OK, header_map(&headers)?, Json(page.items)))
}

/// `POST` on a file is either a finalization (empty body plus
/// `X-File-Length`) or an assignment (non-empty body); spec §6.
pub async fn post_file(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, file_id)): Path<(String, String)>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    validate_file_id(&file_id)?;
    let vault = ctx.vault_key(&vault_id);

    if body.is_empty() {
        let declared_size = file_length(&request_headers)?
            .ok_or_else(|| Error::BadRequest(format!("finalization requires an {} header", crate::constants::headers::FILE_LENGTH)))?;
        ctx.with_timeout(services.files.finalize(&vault, &file_id, declared_size)).await?;
        Ok(StatusCode::OK)
    } else {
        let assignments: Vec<(String, u64)> = serde_json::from_slice(&body)
            .map_err(|e| Error::BadRequest(format!("invalid assignment body: {e}")))?;
        for (block_id, _) in &assignments {
            validate_block_id(block_id)?;
        }
        ctx.with_timeout(services.files.assign_blocks(&vault, &file_id, assignments)).await?;
        Ok(StatusCode::OK)
    }
}

pub async fn get_file(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, file_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    validate_file_id(&file_id)?;
    let (size, stream) = ctx.with_timeout(services.files.stream(&ctx.vault_key(&vault_id), &file_id)).await?;
    let body = axum::body::Body::from_stream(stream);
    Ok((StatusCode::OK, header_map(&[("content-length", size.to_string())])?, body))
}

pub async fn delete_file(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, file_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    validate_file_id(&file_id)?;
    ctx.with_timeout(services.files.delete(&ctx.vault_key(&vault_id), &file_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_file_blocks(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, file_id)): Path<(String, String)>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    validate_file_id(&file_id)?;
    let limit = pagination.resolve_limit(services.default_page_limit, services.max_page_limit);
    let fetched = ctx
        .with_timeout(services.files.list_blocks(&ctx.vault_key(&vault_id), &file_id, pagination.marker.as_deref(), limit))
        .await?;
    let page = Page::from_fetch(fetched, limit, |b| b.offset.to_string());

    let mut headers = Vec::new();
    if let Some(marker) = &page.next_marker {
        let path = format!("/v1.0/vaults/{vault_id}/files/{file_id}/blocks");
        headers.push((NEXT_BATCH, next_batch_url(&path, marker, limit)));
    }

    Ok((StatusCode::OK, header_map(&headers)?, Json(page.items)))
}

pub async fn assign_file_blocks(
    State(services): State<Services>,
    ctx: RequestContext,
    Path((vault_id, file_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    validate_file_id(&file_id)?;
    let assignments: Vec<(String, u64)> = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("invalid assignment body: {e}")))?;
    for (block_id, _) in &assignments {
        validate_block_id(block_id)?;
    }
    ctx.with_timeout(services.files.assign_blocks(&ctx.vault_key(&vault_id), &file_id, assignments)).await?;
    Ok(StatusCode::OK)
}
