use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use notebase_core::{Memo, MemoPatch, MemoService, MemoServiceError, NewMemo, SqliteMemoRepository};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use super::{deleted, parse_id, with_conn, without_conn, ApiResult};
use crate::state::AppState;

fn memo_service<'a>(
    conn: &'a Connection,
    state: &'a AppState,
) -> ApiResult<MemoService<'a, SqliteMemoRepository<'a>>> {
    Ok(MemoService::new(
        SqliteMemoRepository::try_new(conn)?,
        state.enricher.as_deref(),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MemoListParams {
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MemoSearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateMemoRequest {
    title: String,
    content: String,
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateMemoRequest {
    title: Option<String>,
    content: Option<String>,
}

pub(crate) async fn list_memos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MemoListParams>,
) -> ApiResult<Json<Vec<Memo>>> {
    with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.list_memos(params.skip, params.limit)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn search_memos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MemoSearchParams>,
) -> ApiResult<Json<Vec<Memo>>> {
    with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.search_memos(&params.q)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn get_memo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Memo>> {
    let memo_id = parse_id(&id, "memo id")?;
    with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.get_memo(memo_id)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn create_memo(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMemoRequest>,
) -> ApiResult<Json<Memo>> {
    let new_memo = NewMemo {
        title: body.title,
        content: body.content,
        user_id: body.user_id,
    };
    let memo = with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.store_memo(new_memo)?)
    })
    .await?;

    let Some(enricher) = state.enricher.clone() else {
        log::warn!(
            "event=memo_enrich module=server status=skipped memo_id={} reason=not_configured",
            memo.id
        );
        return Ok(Json(memo));
    };
    let content = memo.content.clone();
    let outcome = without_conn(move || enricher.enrich(&content)).await?;
    with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.attach_enrichment(memo, outcome))
    })
    .await
    .map(Json)
}

pub(crate) async fn update_memo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateMemoRequest>,
) -> ApiResult<Json<Memo>> {
    let memo_id = parse_id(&id, "memo id")?;
    let patch = MemoPatch {
        title: body.title,
        content: body.content,
    };
    with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.update_memo(memo_id, patch)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn delete_memo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let memo_id = parse_id(&id, "memo id")?;
    with_conn(&state, move |conn, state| {
        memo_service(conn, state)?.delete_memo(memo_id)?;
        Ok(())
    })
    .await?;
    Ok(deleted("Memo deleted successfully"))
}

pub(crate) async fn regenerate_ai(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Memo>> {
    let memo_id = parse_id(&id, "memo id")?;
    let memo = with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.get_memo(memo_id)?)
    })
    .await?;
    let enricher = state
        .enricher
        .clone()
        .ok_or(MemoServiceError::AiUnavailable)?;

    let content = memo.content;
    let enrichment = without_conn(move || enricher.enrich(&content))
        .await?
        .map_err(MemoServiceError::AiFailed)?;
    with_conn(&state, move |conn, state| {
        Ok(memo_service(conn, state)?.save_enrichment(memo_id, &enrichment)?)
    })
    .await
    .map(Json)
}
