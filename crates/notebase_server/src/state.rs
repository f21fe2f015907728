use std::sync::{Arc, Mutex};

use notebase_core::{AnthropicEnricher, MemoEnricher, NotionClient, Settings, WorkspaceSource};
use rusqlite::Connection;

/// Shared application state.
pub struct AppState {
    /// Single SQLite connection; writers are serialized through the lock.
    pub conn: Mutex<Connection>,
    /// `None` when no AI key is configured; memo creation then skips enrichment.
    pub enricher: Option<Arc<dyn MemoEnricher>>,
    /// `None` when no Notion key is configured; imports then fail with 401.
    pub source: Option<Arc<dyn WorkspaceSource>>,
}

impl AppState {
    pub fn new(
        conn: Connection,
        enricher: Option<Arc<dyn MemoEnricher>>,
        source: Option<Arc<dyn WorkspaceSource>>,
    ) -> Self {
        Self {
            conn: Mutex::new(conn),
            enricher,
            source,
        }
    }

    /// Builds state from settings, wiring outbound clients for configured keys.
    ///
    /// Must be called outside an async runtime: the outbound clients are
    /// blocking.
    pub fn from_settings(conn: Connection, settings: &Settings) -> Self {
        let enricher = match AnthropicEnricher::new(
            settings.anthropic_api_key.clone(),
            settings.ai_model.clone(),
            settings.http_timeout,
        ) {
            Ok(enricher) => {
                log::info!(
                    "event=ai_client_init module=server status=ok model={}",
                    enricher.model()
                );
                Some(Arc::new(enricher) as Arc<dyn MemoEnricher>)
            }
            Err(err) => {
                log::warn!("event=ai_client_init module=server status=disabled reason={err}");
                None
            }
        };

        let source = match NotionClient::new(settings.notion_api_key.clone(), settings.http_timeout)
        {
            Ok(client) => {
                log::info!("event=notion_client_init module=server status=ok");
                Some(Arc::new(client) as Arc<dyn WorkspaceSource>)
            }
            Err(err) => {
                log::warn!("event=notion_client_init module=server status=disabled reason={err}");
                None
            }
        };

        Self::new(conn, enricher, source)
    }
}
