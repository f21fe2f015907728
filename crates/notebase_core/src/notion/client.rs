//! Blocking Notion REST client.

use super::{SourceError, SourcePage, WorkspaceSource};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// Notion API client authenticated with an integration token.
pub struct NotionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NotionClient {
    /// Builds a client; a blank or missing key is rejected up front.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, SourceError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(SourceError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SourceError::Transport(format!("http client error: {err}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/v1/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn send_json(&self, request: RequestBuilder, object_id: &str) -> Result<Value, SourceError> {
        let response = request
            .send()
            .map_err(|err| SourceError::Transport(err.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|err| SourceError::InvalidResponse(err.to_string()))?;
        if status.is_success() {
            return Ok(body);
        }
        Err(api_error(status.as_u16(), &body, object_id))
    }
}

impl WorkspaceSource for NotionClient {
    fn fetch_page(&self, page_id: &str) -> Result<SourcePage, SourceError> {
        let page = self.send_json(self.get(&format!("pages/{page_id}")), page_id)?;
        Ok(SourcePage::from_json(&page))
    }

    fn fetch_child_blocks(&self, page_id: &str) -> Result<Vec<Value>, SourceError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self
                .get(&format!("blocks/{page_id}/children"))
                .query(&[("page_size", PAGE_SIZE.to_string())]);
            if let Some(start_cursor) = &cursor {
                request = request.query(&[("start_cursor", start_cursor)]);
            }

            let body = self.send_json(request, page_id)?;
            let page: ChildrenPage = serde_json::from_value(body)
                .map_err(|err| SourceError::InvalidResponse(err.to_string()))?;
            blocks.extend(page.results);

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(blocks)
    }
}

#[derive(Debug, Deserialize)]
struct ChildrenPage {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Maps a Notion error payload; `object_not_found` becomes [`SourceError::NotFound`].
fn api_error(status: u16, body: &Value, object_id: &str) -> SourceError {
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    if code == "object_not_found" {
        return SourceError::NotFound(object_id.to_string());
    }
    SourceError::Api {
        status,
        code,
        message: body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}
