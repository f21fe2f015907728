//! Memo repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Listing and search are newest first: `created_at DESC, rowid DESC`.
//! - `tags_json` is either NULL or a JSON array of strings.

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::memo::{Memo, MemoId, MemoPatch, NewMemo};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const MEMO_SELECT_SQL: &str = "SELECT
    memo_uuid,
    title,
    content,
    ai_summary,
    tags_json,
    user_id,
    created_at,
    updated_at
FROM memos";

/// Offset pagination for memo listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoListQuery {
    pub skip: u32,
    pub limit: u32,
}

/// Repository interface for memo operations.
pub trait MemoRepository {
    fn create_memo(&self, memo: &NewMemo) -> RepoResult<Memo>;
    fn get_memo(&self, memo_id: MemoId) -> RepoResult<Option<Memo>>;
    fn list_memos(&self, query: MemoListQuery) -> RepoResult<Vec<Memo>>;
    /// Case-insensitive substring match over title, content, summary and
    /// decoded tags. Wildcard characters match literally.
    fn search_memos(&self, needle: &str) -> RepoResult<Vec<Memo>>;
    fn update_memo(&self, memo_id: MemoId, patch: &MemoPatch) -> RepoResult<Memo>;
    /// Overwrites both AI-derived fields.
    fn set_ai_fields(
        &self,
        memo_id: MemoId,
        summary: Option<&str>,
        tags: Option<&[String]>,
    ) -> RepoResult<Memo>;
    fn delete_memo(&self, memo_id: MemoId) -> RepoResult<()>;
}

/// SQLite-backed memo repository.
pub struct SqliteMemoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemoRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "memos",
            &[
                "memo_uuid",
                "title",
                "content",
                "ai_summary",
                "tags_json",
                "user_id",
                "created_at",
                "updated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl MemoRepository for SqliteMemoRepository<'_> {
    fn create_memo(&self, memo: &NewMemo) -> RepoResult<Memo> {
        let memo_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO memos (
                memo_uuid,
                title,
                content,
                user_id
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                memo_id.to_string(),
                memo.title.as_str(),
                memo.content.as_str(),
                memo.user_id,
            ],
        )?;
        load_required_memo(self.conn, memo_id)
    }

    fn get_memo(&self, memo_id: MemoId) -> RepoResult<Option<Memo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMO_SELECT_SQL} WHERE memo_uuid = ?1;"))?;
        let mut rows = stmt.query([memo_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_memo_row(row)?));
        }
        Ok(None)
    }

    fn list_memos(&self, query: MemoListQuery) -> RepoResult<Vec<Memo>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMO_SELECT_SQL}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![query.limit, query.skip])?;
        let mut memos = Vec::new();
        while let Some(row) = rows.next()? {
            memos.push(parse_memo_row(row)?);
        }
        Ok(memos)
    }

    fn search_memos(&self, needle: &str) -> RepoResult<Vec<Memo>> {
        // SQLite `lower` and `LIKE` fold ASCII only, so matching runs on decoded rows.
        let needle_lower = needle.to_lowercase();
        let mut stmt = self.conn.prepare(&format!(
            "{MEMO_SELECT_SQL}
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut memos = Vec::new();
        while let Some(row) = rows.next()? {
            let memo = parse_memo_row(row)?;
            if memo.matches_text(&needle_lower) {
                memos.push(memo);
            }
        }
        Ok(memos)
    }

    fn update_memo(&self, memo_id: MemoId, patch: &MemoPatch) -> RepoResult<Memo> {
        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(content) = &patch.content {
            assignments.push("content = ?");
            bind_values.push(Value::Text(content.clone()));
        }

        if assignments.is_empty() {
            return load_required_memo(self.conn, memo_id);
        }

        let sql = format!(
            "UPDATE memos
             SET {},
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE memo_uuid = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(memo_id.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::MemoNotFound(memo_id));
        }
        load_required_memo(self.conn, memo_id)
    }

    fn set_ai_fields(
        &self,
        memo_id: MemoId,
        summary: Option<&str>,
        tags: Option<&[String]>,
    ) -> RepoResult<Memo> {
        let tags_json = tags
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| RepoError::InvalidData(format!("cannot encode memo tags: {err}")))?;
        let changed = self.conn.execute(
            "UPDATE memos
             SET ai_summary = ?2,
                 tags_json = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE memo_uuid = ?1;",
            params![memo_id.to_string(), summary, tags_json],
        )?;
        if changed == 0 {
            return Err(RepoError::MemoNotFound(memo_id));
        }
        load_required_memo(self.conn, memo_id)
    }

    fn delete_memo(&self, memo_id: MemoId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM memos WHERE memo_uuid = ?1;",
            [memo_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::MemoNotFound(memo_id));
        }
        Ok(())
    }
}

fn load_required_memo(conn: &Connection, memo_id: MemoId) -> RepoResult<Memo> {
    let mut stmt = conn.prepare(&format!("{MEMO_SELECT_SQL} WHERE memo_uuid = ?1;"))?;
    let mut rows = stmt.query([memo_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_memo_row(row);
    }
    Err(RepoError::MemoNotFound(memo_id))
}

fn parse_memo_row(row: &Row<'_>) -> RepoResult<Memo> {
    let id_text: String = row.get("memo_uuid")?;
    let tags_text: Option<String> = row.get("tags_json")?;
    let tags = tags_text
        .map(|value| {
            serde_json::from_str::<Vec<String>>(&value).map_err(|_| {
                RepoError::InvalidData(format!("invalid tag list `{value}` in memos.tags_json"))
            })
        })
        .transpose()?;

    Ok(Memo {
        id: parse_uuid(&id_text, "memos.memo_uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        ai_summary: row.get("ai_summary")?,
        tags,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
