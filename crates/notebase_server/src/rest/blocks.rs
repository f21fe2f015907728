use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use notebase_core::{
    Block, BlockPatch, BlockService, BlockType, FieldUpdate, NewBlock, SqliteBlockRepository,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{deleted, double_option, parse_id, with_conn, ApiError, ApiResult};
use crate::state::AppState;

fn block_service(conn: &Connection) -> ApiResult<BlockService<SqliteBlockRepository<'_>>> {
    Ok(BlockService::new(SqliteBlockRepository::try_new(conn)?))
}

fn parse_block_type(raw: &str) -> ApiResult<BlockType> {
    BlockType::parse(raw)
        .map_err(|err| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateBlockRequest {
    page_id: Uuid,
    #[serde(rename = "type", alias = "block_type")]
    block_type: String,
    content: Option<String>,
    order: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateBlockRequest {
    #[serde(default, rename = "type", alias = "block_type")]
    block_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    content: Option<Option<String>>,
    order: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReorderBlockRequest {
    block_id: Uuid,
    new_order: f64,
}

pub(crate) async fn list_page_blocks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Block>>> {
    let page_id = parse_id(&id, "page id")?;
    with_conn(&state, move |conn, _| Ok(block_service(conn)?.list_blocks(page_id)?))
        .await
        .map(Json)
}

pub(crate) async fn rebalance_page_blocks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Block>>> {
    let page_id = parse_id(&id, "page id")?;
    with_conn(&state, move |conn, _| {
        Ok(block_service(conn)?.rebalance_page(page_id)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn create_block(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBlockRequest>,
) -> ApiResult<Json<Block>> {
    let new_block = NewBlock {
        page_id: body.page_id,
        block_type: parse_block_type(&body.block_type)?,
        content: body.content,
        order: body.order,
    };
    with_conn(&state, move |conn, _| {
        Ok(block_service(conn)?.create_block(new_block)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn update_block(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBlockRequest>,
) -> ApiResult<Json<Block>> {
    let block_id = parse_id(&id, "block id")?;
    let patch = BlockPatch {
        block_type: body.block_type.as_deref().map(parse_block_type).transpose()?,
        content: FieldUpdate::from_patch(body.content),
        order: body.order,
    };
    with_conn(&state, move |conn, _| {
        Ok(block_service(conn)?.update_block(block_id, patch)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn reorder_block(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReorderBlockRequest>,
) -> ApiResult<Json<Block>> {
    with_conn(&state, move |conn, _| {
        Ok(block_service(conn)?.reorder_block(body.block_id, body.new_order)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn delete_block(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let block_id = parse_id(&id, "block id")?;
    with_conn(&state, move |conn, _| {
        block_service(conn)?.delete_block(block_id)?;
        Ok(())
    })
    .await?;
    Ok(deleted("Block deleted successfully"))
}
