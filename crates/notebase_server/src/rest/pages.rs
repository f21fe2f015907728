use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use notebase_core::{
    FieldUpdate, NewPage, Page, PageFilter, PagePatch, PageService, PageWithBlocks,
    SqliteBlockRepository, SqlitePageRepository,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{deleted, double_option, parse_id, with_conn, ApiError, ApiResult};
use crate::state::AppState;

type Pages<'conn> = PageService<SqlitePageRepository<'conn>, SqliteBlockRepository<'conn>>;

fn page_service(conn: &Connection) -> ApiResult<Pages<'_>> {
    Ok(PageService::new(
        SqlitePageRepository::try_new(conn)?,
        SqliteBlockRepository::try_new(conn)?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageListParams {
    parent_id: Option<Uuid>,
    /// Only root pages; ignored when `parent_id` is given.
    #[serde(default)]
    roots: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatePageRequest {
    title: Option<String>,
    icon: Option<String>,
    parent_id: Option<Uuid>,
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdatePageRequest {
    /// Explicit `null` is rejected; pages always carry a title.
    #[serde(default, deserialize_with = "double_option")]
    title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    parent_id: Option<Option<Uuid>>,
}

pub(crate) async fn list_pages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageListParams>,
) -> ApiResult<Json<Vec<Page>>> {
    let filter = match (params.parent_id, params.roots) {
        (Some(parent_id), _) => PageFilter::ChildrenOf(parent_id),
        (None, true) => PageFilter::Roots,
        (None, false) => PageFilter::All,
    };
    with_conn(&state, move |conn, _| Ok(page_service(conn)?.list_pages(filter)?))
        .await
        .map(Json)
}

pub(crate) async fn get_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PageWithBlocks>> {
    let page_id = parse_id(&id, "page id")?;
    with_conn(&state, move |conn, _| {
        Ok(page_service(conn)?.get_page_with_blocks(page_id)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn create_page(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePageRequest>,
) -> ApiResult<Json<Page>> {
    let new_page = NewPage {
        title: body.title,
        icon: body.icon,
        parent_id: body.parent_id,
        user_id: body.user_id,
    };
    with_conn(&state, move |conn, _| Ok(page_service(conn)?.create_page(new_page)?))
        .await
        .map(Json)
}

pub(crate) async fn update_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePageRequest>,
) -> ApiResult<Json<Page>> {
    let page_id = parse_id(&id, "page id")?;
    let title = match body.title {
        Some(None) => {
            return Err(ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "page title must not be null",
            ))
        }
        Some(Some(title)) => Some(title),
        None => None,
    };
    let patch = PagePatch {
        title,
        icon: FieldUpdate::from_patch(body.icon),
        parent_id: FieldUpdate::from_patch(body.parent_id),
    };
    with_conn(&state, move |conn, _| {
        Ok(page_service(conn)?.update_page(page_id, patch)?)
    })
    .await
    .map(Json)
}

pub(crate) async fn delete_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let page_id = parse_id(&id, "page id")?;
    with_conn(&state, move |conn, _| {
        page_service(conn)?.delete_page(page_id)?;
        Ok(())
    })
    .await?;
    Ok(deleted("Page deleted successfully"))
}
