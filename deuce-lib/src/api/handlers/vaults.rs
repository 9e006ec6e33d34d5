//! `/v1.0/vaults`, `/v1.0/vaults/{v}` (spec §4.6, §6).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::header_map;
use super::pagination::{next_batch_url, PaginationQuery};
use crate::constants::headers::NEXT_BATCH;
use crate::context::RequestContext;
use crate::error::Result;
use crate::model::page::Page;
use crate::model::vault::validate_vault_id;
use crate::services::Services;

pub async fn list_vaults(
    State(services): State<Services>,
    ctx: RequestContext,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse> {
    let limit = pagination.resolve_limit(services.default_page_limit, services.max_page_limit);
    let fetched = ctx.with_timeout(services.vaults.list(&ctx.project_id, pagination.marker.as_deref(), limit)).await?;
    let page = Page::from_fetch(fetched, limit, |id| id.clone());

    let mut headers = Vec::new();
    if let Some(marker) = &page.next_marker {
        headers.push((NEXT_BATCH, next_batch_url("/v1.0/vaults", marker, limit)));
    }

    Ok((StatusCode::OK, header_map(&headers)?, Json(page.items)))
}

pub async fn create_vault(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
) -> Result<impl IntoResponse> {
    validate_vault_id(&vault_id)?;
    ctx.with_timeout(services.vaults.create(&ctx.vault_key(&vault_id))).await?;
    Ok(StatusCode::CREATED)
}

pub async fn head_vault(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
) -> Result<impl IntoResponse> {
    validate_vault_id(&vault_id)?;
    let exists = ctx.with_timeout(services.vaults.exists(&ctx.vault_key(&vault_id))).await?;
    Ok(if exists { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND })
}

pub async fn get_vault(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
) -> Result<impl IntoResponse> {
    validate_vault_id(&vault_id)?;
    let (metadata_stats, storage_stats) = ctx.with_timeout(services.vaults.stats(&ctx.vault_key(&vault_id))).await?;

    Ok(Json(json!({
        "files": metadata_stats.files,
        "blocks": metadata_stats.blocks,
        "total_size": storage_stats.total_size,
        "block_count": storage_stats.block_count,
        "last_modification_time": storage_stats.last_modification_time,
    })))
}

pub async fn delete_vault(
    State(services): State<Services>,
    ctx: RequestContext,
    Path(vault_id): Path<String>,
) -> Result<impl IntoResponse> {
    validate_vault_id(&vault_id)?;
    ctx.with_timeout(services.vaults.delete(&ctx.vault_key(&vault_id))).await?;
    Ok(StatusCode::NO_CONTENT)
}
