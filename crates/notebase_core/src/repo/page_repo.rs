//! Page repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist page rows and answer parent-pointer lookups for tree checks.
//! - Own the explicit subtree delete and the page-with-blocks bulk insert.
//!
//! # Invariants
//! - Listing is deterministic: `created_at ASC, rowid ASC`.
//! - Subtree deletes remove blocks before pages inside one transaction.
//! - Cycle checks are the service's job; this layer writes what it is given.
//!   [`PageRepository::in_write_transaction`] lets the service run its checks
//!   and the write as one unit.

use super::block_repo::{insert_block_row, page_row_exists};
use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::block::BlockSeed;
use crate::model::page::{NewPage, Page, PageId, PagePatch, DEFAULT_PAGE_TITLE};
use crate::model::FieldUpdate;
use crate::service::tree_integrity::ParentLookup;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

const PAGE_SELECT_SQL: &str = "SELECT
    page_uuid,
    title,
    icon,
    parent_uuid,
    user_id,
    created_at,
    updated_at
FROM pages";

/// Listing scope for pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFilter {
    #[default]
    All,
    /// Pages without a parent.
    Roots,
    /// Direct children of one page.
    ChildrenOf(PageId),
}

/// Rows removed by a subtree delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeDeleteReport {
    pub pages: usize,
    pub blocks: usize,
}

/// Repository interface for page operations.
pub trait PageRepository: ParentLookup<Error = RepoError> {
    fn create_page(&self, page: &NewPage) -> RepoResult<Page>;
    fn get_page(&self, page_id: PageId) -> RepoResult<Option<Page>>;
    fn page_exists(&self, page_id: PageId) -> RepoResult<bool>;
    fn list_pages(&self, filter: PageFilter) -> RepoResult<Vec<Page>>;
    /// Applies a partial update and returns the stored row.
    fn update_page(&self, page_id: PageId, patch: &PagePatch) -> RepoResult<Page>;
    /// Deletes a page, all its descendants and all their blocks.
    fn delete_page_cascade(&self, page_id: PageId) -> RepoResult<CascadeDeleteReport>;
    /// Inserts one page plus its blocks atomically.
    fn create_page_with_blocks(&self, page: &NewPage, blocks: &[BlockSeed]) -> RepoResult<Page>;
    /// Runs `work` in one write transaction. `Ok` commits; `Err` rolls back.
    ///
    /// `work` must not call the methods above that open their own transaction.
    fn in_write_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce() -> Result<T, E>;
}

/// SQLite-backed page repository.
pub struct SqlitePageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePageRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "pages",
            &[
                "page_uuid",
                "title",
                "icon",
                "parent_uuid",
                "user_id",
                "created_at",
                "updated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ParentLookup for SqlitePageRepository<'_> {
    type Error = RepoError;

    fn parent_of(&self, page_id: PageId) -> RepoResult<Option<PageId>> {
        let parent: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT parent_uuid FROM pages WHERE page_uuid = ?1;",
                [page_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        parent
            .flatten()
            .map(|value| parse_uuid(&value, "pages.parent_uuid"))
            .transpose()
    }
}

impl PageRepository for SqlitePageRepository<'_> {
    fn create_page(&self, page: &NewPage) -> RepoResult<Page> {
        let page_id = Uuid::new_v4();
        insert_page_row(self.conn, page_id, page)?;
        load_required_page(self.conn, page_id)
    }

    fn get_page(&self, page_id: PageId) -> RepoResult<Option<Page>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PAGE_SELECT_SQL} WHERE page_uuid = ?1;"))?;
        let mut rows = stmt.query([page_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_page_row(row)?));
        }
        Ok(None)
    }

    fn page_exists(&self, page_id: PageId) -> RepoResult<bool> {
        page_row_exists(self.conn, page_id)
    }

    fn list_pages(&self, filter: PageFilter) -> RepoResult<Vec<Page>> {
        let (where_clause, bind_values) = match filter {
            PageFilter::All => ("", Vec::new()),
            PageFilter::Roots => ("WHERE parent_uuid IS NULL", Vec::new()),
            PageFilter::ChildrenOf(parent_id) => (
                "WHERE parent_uuid = ?1",
                vec![Value::Text(parent_id.to_string())],
            ),
        };
        let mut stmt = self.conn.prepare(&format!(
            "{PAGE_SELECT_SQL}
             {where_clause}
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut pages = Vec::new();
        while let Some(row) = rows.next()? {
            pages.push(parse_page_row(row)?);
        }
        Ok(pages)
    }

    fn update_page(&self, page_id: PageId, patch: &PagePatch) -> RepoResult<Page> {
        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(icon) = patch.icon.as_change() {
            assignments.push("icon = ?");
            bind_values.push(icon.map_or(Value::Null, |value| Value::Text(value.clone())));
        }
        match patch.parent_id {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => {
                assignments.push("parent_uuid = ?");
                bind_values.push(Value::Null);
            }
            FieldUpdate::Set(parent_id) => {
                assignments.push("parent_uuid = ?");
                bind_values.push(Value::Text(parent_id.to_string()));
            }
        }

        if assignments.is_empty() {
            return load_required_page(self.conn, page_id);
        }

        let sql = format!(
            "UPDATE pages
             SET {},
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE page_uuid = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(page_id.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::PageNotFound(page_id));
        }
        load_required_page(self.conn, page_id)
    }

    fn delete_page_cascade(&self, page_id: PageId) -> RepoResult<CascadeDeleteReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !page_row_exists(&tx, page_id)? {
            return Err(RepoError::PageNotFound(page_id));
        }

        let subtree = collect_subtree_ids(&tx, page_id)?;
        let mut report = CascadeDeleteReport::default();
        for id in &subtree {
            report.blocks += tx.execute(
                "DELETE FROM blocks WHERE page_uuid = ?1;",
                [id.to_string()],
            )?;
        }
        // Deepest pages first so no row ever points at a deleted parent.
        for id in subtree.iter().rev() {
            report.pages += tx.execute(
                "DELETE FROM pages WHERE page_uuid = ?1;",
                [id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(report)
    }

    fn create_page_with_blocks(&self, page: &NewPage, blocks: &[BlockSeed]) -> RepoResult<Page> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let page_id = Uuid::new_v4();
        insert_page_row(&tx, page_id, page)?;
        for seed in blocks {
            insert_block_row(&tx, Uuid::new_v4(), page_id, seed)?;
        }
        tx.commit()?;
        load_required_page(self.conn, page_id)
    }

    fn in_write_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce() -> Result<T, E>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(|err| E::from(RepoError::from(err)))?;
        let value = work()?;
        tx.commit().map_err(|err| E::from(RepoError::from(err)))?;
        Ok(value)
    }
}

fn insert_page_row(conn: &Connection, page_id: PageId, page: &NewPage) -> RepoResult<()> {
    if let Some(parent_id) = page.parent_id {
        if !page_row_exists(conn, parent_id)? {
            return Err(RepoError::PageNotFound(parent_id));
        }
    }
    conn.execute(
        "INSERT INTO pages (
            page_uuid,
            title,
            icon,
            parent_uuid,
            user_id
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            page_id.to_string(),
            page.title.as_deref().unwrap_or(DEFAULT_PAGE_TITLE),
            page.icon.as_deref(),
            page.parent_id.map(|value| value.to_string()),
            page.user_id,
        ],
    )?;
    Ok(())
}

/// Breadth-first list of `root_id` and all its descendants, root first.
fn collect_subtree_ids(conn: &Connection, root_id: PageId) -> RepoResult<Vec<PageId>> {
    let mut stmt = conn.prepare(
        "SELECT page_uuid
         FROM pages
         WHERE parent_uuid = ?1
         ORDER BY rowid ASC;",
    )?;

    let mut ordered = Vec::new();
    let mut visited = HashSet::from([root_id]);
    let mut queue = VecDeque::from([root_id]);
    while let Some(current) = queue.pop_front() {
        ordered.push(current);
        let mut rows = stmt.query([current.to_string()])?;
        while let Some(row) = rows.next()? {
            let child_text: String = row.get(0)?;
            let child_id = parse_uuid(&child_text, "pages.page_uuid")?;
            if visited.insert(child_id) {
                queue.push_back(child_id);
            }
        }
    }
    Ok(ordered)
}

fn load_required_page(conn: &Connection, page_id: PageId) -> RepoResult<Page> {
    let mut stmt = conn.prepare(&format!("{PAGE_SELECT_SQL} WHERE page_uuid = ?1;"))?;
    let mut rows = stmt.query([page_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_page_row(row);
    }
    Err(RepoError::PageNotFound(page_id))
}

fn parse_page_row(row: &Row<'_>) -> RepoResult<Page> {
    let id_text: String = row.get("page_uuid")?;
    let parent_text: Option<String> = row.get("parent_uuid")?;
    let parent_id = parent_text
        .map(|value| parse_uuid(&value, "pages.parent_uuid"))
        .transpose()?;

    Ok(Page {
        id: parse_uuid(&id_text, "pages.page_uuid")?,
        title: row.get("title")?,
        icon: row.get("icon")?,
        parent_id,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
