//! Router, error mapping and shared handler plumbing.

mod blocks;
mod import;
mod memos;
mod pages;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use notebase_core::{
    BlockServiceError, ErrorKind, ImportError, MemoServiceError, PageServiceError, RepoError,
};
use rusqlite::Connection;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::state::AppState;

/// Builds the `/api` router with the given CORS allow-list.
pub fn create_router(state: Arc<AppState>, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/pages", get(pages::list_pages).post(pages::create_page))
        .route(
            "/api/pages/:id",
            get(pages::get_page)
                .patch(pages::update_page)
                .delete(pages::delete_page),
        )
        .route("/api/pages/:id/blocks", get(blocks::list_page_blocks))
        .route(
            "/api/pages/:id/blocks/rebalance",
            post(blocks::rebalance_page_blocks),
        )
        .route("/api/blocks", post(blocks::create_block))
        .route("/api/blocks/reorder", post(blocks::reorder_block))
        .route(
            "/api/blocks/:id",
            patch(blocks::update_block).delete(blocks::delete_block),
        )
        .route("/api/memos", get(memos::list_memos).post(memos::create_memo))
        .route("/api/memos/search", get(memos::search_memos))
        .route(
            "/api/memos/:id",
            get(memos::get_memo)
                .patch(memos::update_memo)
                .delete(memos::delete_memo),
        )
        .route("/api/memos/:id/regenerate-ai", post(memos::regenerate_ai))
        .route("/api/mcp/import", post(import::import_page))
        .layer(build_cors_layer(cors_allowed_origins))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": notebase_core::core_version() }))
}

fn build_cors_layer(cors_allowed_origins: &[String]) -> CorsLayer {
    let mut parsed = Vec::new();
    for origin in cors_allowed_origins {
        match HeaderValue::from_str(origin) {
            Ok(value) => parsed.push(value),
            Err(err) => {
                log::warn!("event=cors_origin module=server status=ignored origin={origin} reason={err}")
            }
        }
    }

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_origin(parsed)
}

/// JSON error body `{"detail": "..."}` with a mapped status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn from_kind(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::new(status_for(kind), detail)
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound | ErrorKind::UpstreamNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidReference => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::UpstreamAuthMissing => StatusCode::UNAUTHORIZED,
        ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!(
                "event=request_failed module=server status={} detail={}",
                self.status.as_u16(),
                self.detail
            );
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

macro_rules! impl_from_service_error {
    ($($error:ty),+ $(,)?) => {
        $(
            impl From<$error> for ApiError {
                fn from(err: $error) -> Self {
                    Self::from_kind(err.kind(), err.to_string())
                }
            }
        )+
    };
}

impl_from_service_error!(PageServiceError, BlockServiceError, MemoServiceError, ImportError);

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        Self::internal(err.to_string())
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Runs storage work on the blocking pool while holding the connection lock.
pub(crate) async fn with_conn<T, F>(state: &Arc<AppState>, work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection, &AppState) -> ApiResult<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let conn = state
            .conn
            .lock()
            .map_err(|_| ApiError::internal("database connection lock poisoned"))?;
        work(&*conn, state.as_ref())
    })
    .await
    .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?
}

/// Runs blocking work, such as upstream HTTP calls, without the connection lock.
pub(crate) async fn without_conn<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))
}

/// Parses a path id; malformed ids are a validation failure.
pub(crate) fn parse_id(raw: &str, label: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("invalid {label}: {raw}"),
        )
    })
}

pub(crate) fn deleted(message: &str) -> Json<Value> {
    Json(json!({ "message": message }))
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in patch bodies. Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_documented_status() {
        let cases = [
            (ErrorKind::NotFound, 404),
            (ErrorKind::InvalidReference, 400),
            (ErrorKind::InvalidInput, 422),
            (ErrorKind::UpstreamAuthMissing, 401),
            (ErrorKind::UpstreamNotFound, 404),
            (ErrorKind::UpstreamFailure, 502),
            (ErrorKind::AiUnavailable, 503),
            (ErrorKind::Unexpected, 500),
        ];
        for (kind, status) in cases {
            assert_eq!(status_for(kind).as_u16(), status, "{kind:?}");
        }
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid", "page id").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "page id").unwrap(), id);
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        icon: Option<Option<String>>,
    }

    #[test]
    fn double_option_separates_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"icon":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"icon":"x"}"#).unwrap();
        assert_eq!(absent.icon, None);
        assert_eq!(null.icon, Some(None));
        assert_eq!(set.icon, Some(Some("x".to_string())));
    }
}
