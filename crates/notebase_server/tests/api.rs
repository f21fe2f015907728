//! End-to-end HTTP tests: router, JSON shapes and status mapping over an
//! in-memory database. External services are replaced by fakes.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use notebase_core::db::open_db_in_memory;
use notebase_core::{AiError, MemoEnricher, SourceError, SourcePage, WorkspaceSource};
use notebase_server::{create_router, AppState};
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt; // for `.oneshot()`

const UPSTREAM_DELAY: Duration = Duration::from_millis(1500);

struct FailingEnricher;

impl MemoEnricher for FailingEnricher {
    fn summarize(&self, _content: &str) -> Result<String, AiError> {
        Err(AiError::Transport("connection refused".to_string()))
    }

    fn generate_tags(&self, _content: &str) -> Result<Vec<String>, AiError> {
        Err(AiError::Transport("connection refused".to_string()))
    }
}

struct StaticEnricher;

impl MemoEnricher for StaticEnricher {
    fn summarize(&self, _content: &str) -> Result<String, AiError> {
        Ok("short summary".to_string())
    }

    fn generate_tags(&self, _content: &str) -> Result<Vec<String>, AiError> {
        Ok(vec!["errands".to_string()])
    }
}

/// Signals when the AI call starts, then blocks like a slow upstream.
struct SlowEnricher {
    started: Arc<Notify>,
}

impl MemoEnricher for SlowEnricher {
    fn summarize(&self, _content: &str) -> Result<String, AiError> {
        self.started.notify_one();
        std::thread::sleep(UPSTREAM_DELAY);
        Ok("slow summary".to_string())
    }

    fn generate_tags(&self, _content: &str) -> Result<Vec<String>, AiError> {
        Ok(vec!["slow".to_string()])
    }
}

struct SlowSource {
    started: Arc<Notify>,
}

impl WorkspaceSource for SlowSource {
    fn fetch_page(&self, page_id: &str) -> Result<SourcePage, SourceError> {
        StaticSource.fetch_page(page_id)
    }

    fn fetch_child_blocks(&self, page_id: &str) -> Result<Vec<Value>, SourceError> {
        self.started.notify_one();
        std::thread::sleep(UPSTREAM_DELAY);
        StaticSource.fetch_child_blocks(page_id)
    }
}

struct StaticSource;

impl WorkspaceSource for StaticSource {
    fn fetch_page(&self, page_id: &str) -> Result<SourcePage, SourceError> {
        if page_id.starts_with("ffff") {
            return Err(SourceError::NotFound(page_id.to_string()));
        }
        Ok(SourcePage {
            id: page_id.to_string(),
            title: "Imported".to_string(),
            icon: None,
        })
    }

    fn fetch_child_blocks(&self, _page_id: &str) -> Result<Vec<Value>, SourceError> {
        Ok(vec![
            json!({ "type": "paragraph", "paragraph": { "rich_text": [{ "plain_text": "hello" }] } }),
            json!({ "type": "divider", "divider": {} }),
        ])
    }
}

fn router_with(
    enricher: Option<Arc<dyn MemoEnricher>>,
    source: Option<Arc<dyn WorkspaceSource>>,
) -> axum::Router {
    let conn = open_db_in_memory().expect("in-memory db");
    let state = Arc::new(AppState::new(conn, enricher, source));
    create_router(state, &["http://localhost:3000".to_string()])
}

fn setup() -> axum::Router {
    router_with(None, None)
}

fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
    (status, body)
}

async fn create_page(router: &axum::Router, title: &str, parent: Option<&str>) -> String {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/api/pages",
            Some(json!({ "title": title, "parent_id": parent })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let router = setup();
    let (status, body) = send(&router, json_request(Method::GET, "/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn page_lifecycle_and_cycle_rejection() {
    let router = setup();
    let a = create_page(&router, "A", None).await;
    let b = create_page(&router, "B", Some(&a)).await;
    let c = create_page(&router, "C", Some(&b)).await;

    let (status, body) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/pages/{a}"),
            Some(json!({ "parent_id": c })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, _) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/pages/{a}"),
            Some(json!({ "parent_id": a })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/pages/{c}"),
            Some(json!({ "parent_id": null })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["parent_id"], Value::Null);
    assert_eq!(body["title"], "C");

    let (status, body) = send(
        &router,
        json_request(Method::GET, &format!("/api/pages?parent_id={a}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], b.as_str());

    let (status, body) = send(&router, json_request(Method::GET, "/api/pages?roots=true", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(
        &router,
        json_request(Method::DELETE, &format!("/api/pages/{a}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Page deleted successfully");

    let (status, _) = send(&router, json_request(Method::GET, &format!("/api/pages/{b}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, json_request(Method::GET, &format!("/api/pages/{c}"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn page_errors_map_to_statuses() {
    let router = setup();
    let ghost = uuid::Uuid::new_v4();

    let (status, body) = send(&router, json_request(Method::GET, &format!("/api/pages/{ghost}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains(&ghost.to_string()));

    let (status, _) = send(
        &router,
        json_request(Method::POST, "/api/pages", Some(json!({ "parent_id": ghost }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, json_request(Method::GET, "/api/pages/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let a = create_page(&router, "A", None).await;
    let (status, _) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/pages/{a}"),
            Some(json!({ "title": "x".repeat(501) })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn page_title_null_is_rejected() {
    let router = setup();
    let a = create_page(&router, "Keep me", None).await;

    let (status, body) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/pages/{a}"),
            Some(json!({ "title": null })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "page title must not be null");

    let (status, body) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/pages/{a}"),
            Some(json!({ "icon": "📌" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Keep me");
    assert_eq!(body["icon"], "📌");
}

#[tokio::test]
async fn blocks_are_listed_by_order_and_reorderable() {
    let router = setup();
    let page = create_page(&router, "Doc", None).await;

    let mut ids = Vec::new();
    for (content, order) in [("X", 1.0), ("Y", 2.0), ("Z", 1.5)] {
        let (status, body) = send(
            &router,
            json_request(
                Method::POST,
                "/api/blocks",
                Some(json!({ "page_id": page, "type": "text", "content": content, "order": order })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["type"], "text");
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (_, body) = send(
        &router,
        json_request(Method::GET, &format!("/api/pages/{page}/blocks"), None),
    )
    .await;
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|block| block["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["X", "Z", "Y"]);

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/blocks/reorder",
            Some(json!({ "block_id": ids[1], "new_order": 0.5 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], 0.5);

    let (_, body) = send(&router, json_request(Method::GET, &format!("/api/pages/{page}"), None)).await;
    assert_eq!(body["title"], "Doc");
    assert_eq!(body["blocks"][0]["content"], "Y");

    let (status, body) = send(
        &router,
        json_request(Method::POST, &format!("/api/pages/{page}/blocks/rebalance"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|block| block["order"].as_f64().unwrap())
        .collect();
    assert_eq!(orders, vec![1.0, 2.0, 3.0]);

    let (status, body) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/blocks/{}", ids[0]),
            Some(json!({ "content": null })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], Value::Null);

    let (status, body) = send(
        &router,
        json_request(Method::DELETE, &format!("/api/blocks/{}", ids[0]), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Block deleted successfully");

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/api/blocks",
            Some(json!({ "page_id": uuid::Uuid::new_v4(), "type": "text" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn memo_create_survives_ai_failure() {
    let router = router_with(Some(Arc::new(FailingEnricher)), None);

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/memos",
            Some(json!({ "title": "Groceries", "content": "milk and eggs" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ai_summary"], Value::Null);
    assert_eq!(body["tags"], Value::Null);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &router,
        json_request(Method::POST, &format!("/api/memos/{id}/regenerate-ai"), None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn memo_routes_cover_search_pagination_and_delete() {
    let router = router_with(Some(Arc::new(StaticEnricher)), None);

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/memos",
            Some(json!({ "title": "Shopping", "content": "milk" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ai_summary"], "short summary");
    assert_eq!(body["tags"], json!(["errands"]));
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(&router, json_request(Method::GET, "/api/memos/search?q=ERRAND", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], id.as_str());

    let (status, _) = send(&router, json_request(Method::GET, "/api/memos/search?q=", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send(&router, json_request(Method::GET, "/api/memos?limit=0", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &router,
        json_request(
            Method::PATCH,
            &format!("/api/memos/{id}"),
            Some(json!({ "title": "Market" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Market");
    assert_eq!(body["content"], "milk");

    let (status, body) = send(&router, json_request(Method::DELETE, &format!("/api/memos/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Memo deleted successfully");

    let (status, _) = send(&router, json_request(Method::GET, &format!("/api/memos/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&router, json_request(Method::GET, "/api/memos", None)).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn import_without_key_is_unauthorized() {
    let router = setup();
    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/mcp/import",
            Some(json!({ "external_page_id": "0123456789abcdef0123456789abcdef" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/api/mcp/import",
            Some(json!({ "external_page_id": "short" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn import_creates_page_and_maps_upstream_errors() {
    let router = router_with(None, Some(Arc::new(StaticSource)));

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/mcp/import",
            Some(json!({ "notion_page_id": "0123456789abcdef0123456789abcdef" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["blocks_count"], 2);
    assert_eq!(body["title"], "Imported");
    let page_id = body["page_id"].as_str().unwrap().to_string();

    let (_, body) = send(&router, json_request(Method::GET, &format!("/api/pages/{page_id}"), None)).await;
    assert_eq!(body["blocks"][0]["content"], "hello");
    assert_eq!(body["blocks"][1]["type"], "divider");

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/api/mcp/import",
            Some(json!({ "external_page_id": "ffff456789abcdef0123456789abcdef" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/api/mcp/import",
            Some(json!({ "external_page_id": "short" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_ai_call_does_not_hold_up_other_requests() {
    let started = Arc::new(Notify::new());
    let enricher = SlowEnricher {
        started: Arc::clone(&started),
    };
    let router = router_with(Some(Arc::new(enricher)), None);

    let create = tokio::spawn({
        let router = router.clone();
        async move {
            send(
                &router,
                json_request(
                    Method::POST,
                    "/api/memos",
                    Some(json!({ "title": "Slow", "content": "body" })),
                ),
            )
            .await
        }
    });
    started.notified().await;

    let listed = tokio::time::timeout(
        Duration::from_millis(500),
        send(&router, json_request(Method::GET, "/api/memos", None)),
    )
    .await
    .expect("listing waited for the AI call");
    assert_eq!(listed.0, StatusCode::OK);
    assert_eq!(listed.1[0]["title"], "Slow");
    assert!(listed.1[0]["ai_summary"].is_null());

    let (status, memo) = create.await.unwrap();
    assert_eq!(status, StatusCode::OK, "{memo}");
    assert_eq!(memo["ai_summary"], "slow summary");
    assert_eq!(memo["tags"], json!(["slow"]));

    let memo_id = memo["id"].as_str().unwrap().to_string();
    let regenerate = tokio::spawn({
        let router = router.clone();
        async move {
            send(
                &router,
                json_request(
                    Method::POST,
                    &format!("/api/memos/{memo_id}/regenerate-ai"),
                    None,
                ),
            )
            .await
        }
    });
    started.notified().await;

    let pages = tokio::time::timeout(
        Duration::from_millis(500),
        send(&router, json_request(Method::GET, "/api/pages", None)),
    )
    .await
    .expect("page listing waited for the AI call");
    assert_eq!(pages.0, StatusCode::OK);

    let (status, _) = regenerate.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_import_fetch_does_not_hold_up_other_requests() {
    let started = Arc::new(Notify::new());
    let source = SlowSource {
        started: Arc::clone(&started),
    };
    let router = router_with(None, Some(Arc::new(source)));
    let parent = create_page(&router, "Inbox", None).await;

    let import = tokio::spawn({
        let router = router.clone();
        async move {
            send(
                &router,
                json_request(
                    Method::POST,
                    "/api/mcp/import",
                    Some(json!({
                        "external_page_id": "0123456789abcdef0123456789abcdef",
                        "parent_id": parent,
                    })),
                ),
            )
            .await
        }
    });
    started.notified().await;

    let listed = tokio::time::timeout(
        Duration::from_millis(500),
        send(&router, json_request(Method::GET, "/api/pages", None)),
    )
    .await
    .expect("page listing waited for the import fetch");
    assert_eq!(listed.0, StatusCode::OK);
    assert_eq!(listed.1.as_array().unwrap().len(), 1);

    let (status, body) = import.await.unwrap();
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["blocks_count"], 2);
}
