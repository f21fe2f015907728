use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use notebase_core::{
    ImportFetcher, ImportOutcome, ImportRequest, ImportService, SqlitePageRepository,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{with_conn, without_conn, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct ImportPageRequest {
    #[serde(alias = "notion_page_id")]
    external_page_id: String,
    parent_id: Option<Uuid>,
}

pub(crate) async fn import_page(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportPageRequest>,
) -> ApiResult<(StatusCode, Json<ImportOutcome>)> {
    let request = ImportRequest {
        external_page_id: body.external_page_id,
        parent_id: body.parent_id,
    };
    let source = state.source.clone();
    ImportFetcher::new(source.as_deref()).validate(&request)?;

    let parent_id = request.parent_id;
    with_conn(&state, move |conn, _| {
        ImportService::new(SqlitePageRepository::try_new(conn)?).check_parent(parent_id)?;
        Ok(())
    })
    .await?;

    // Upstream calls run without the connection lock.
    let fetched = without_conn(move || ImportFetcher::new(source.as_deref()).fetch(&request))
        .await??;

    let outcome = with_conn(&state, move |conn, _| {
        Ok(ImportService::new(SqlitePageRepository::try_new(conn)?).store(fetched)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
