//! Block repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Listing is deterministic: `sort_order ASC, rowid ASC`, so blocks sharing
//!   an order key keep their insertion sequence.
//! - `page_uuid` is never rewritten after insert.

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::block::{
    Block, BlockId, BlockPatch, BlockSeed, BlockType, NewBlock, DEFAULT_BLOCK_ORDER,
};
use crate::model::page::PageId;
use crate::model::FieldUpdate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const BLOCK_SELECT_SQL: &str = "SELECT
    block_uuid,
    page_uuid,
    block_type,
    content,
    sort_order,
    created_at,
    updated_at
FROM blocks";

/// Repository interface for block operations.
pub trait BlockRepository {
    /// Inserts one block; the owning page must exist.
    fn create_block(&self, block: &NewBlock) -> RepoResult<Block>;
    fn get_block(&self, block_id: BlockId) -> RepoResult<Option<Block>>;
    /// Lists a page's blocks in display order.
    fn list_blocks(&self, page_id: PageId) -> RepoResult<Vec<Block>>;
    fn page_exists(&self, page_id: PageId) -> RepoResult<bool>;
    /// Applies a partial update and returns the stored row.
    fn update_block(&self, block_id: BlockId, patch: &BlockPatch) -> RepoResult<Block>;
    /// Single-field write of the order key.
    fn set_block_order(&self, block_id: BlockId, order: f64) -> RepoResult<Block>;
    fn delete_block(&self, block_id: BlockId) -> RepoResult<()>;
    /// Rewrites order keys of several blocks of one page atomically.
    fn rewrite_orders(&self, page_id: PageId, orders: &[(BlockId, f64)]) -> RepoResult<()>;
}

/// SQLite-backed block repository.
pub struct SqliteBlockRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlockRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "blocks",
            &[
                "block_uuid",
                "page_uuid",
                "block_type",
                "content",
                "sort_order",
                "created_at",
                "updated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl BlockRepository for SqliteBlockRepository<'_> {
    fn create_block(&self, block: &NewBlock) -> RepoResult<Block> {
        if !page_row_exists(self.conn, block.page_id)? {
            return Err(RepoError::PageNotFound(block.page_id));
        }

        let block_id = Uuid::new_v4();
        let seed = BlockSeed {
            block_type: block.block_type.clone(),
            content: block.content.clone(),
            order: block.order.unwrap_or(DEFAULT_BLOCK_ORDER),
        };
        insert_block_row(self.conn, block_id, block.page_id, &seed)?;
        load_required_block(self.conn, block_id)
    }

    fn get_block(&self, block_id: BlockId) -> RepoResult<Option<Block>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BLOCK_SELECT_SQL} WHERE block_uuid = ?1;"))?;
        let mut rows = stmt.query([block_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_block_row(row)?));
        }
        Ok(None)
    }

    fn list_blocks(&self, page_id: PageId) -> RepoResult<Vec<Block>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BLOCK_SELECT_SQL}
             WHERE page_uuid = ?1
             ORDER BY sort_order ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([page_id.to_string()])?;
        let mut blocks = Vec::new();
        while let Some(row) = rows.next()? {
            blocks.push(parse_block_row(row)?);
        }
        Ok(blocks)
    }

    fn page_exists(&self, page_id: PageId) -> RepoResult<bool> {
        page_row_exists(self.conn, page_id)
    }

    fn update_block(&self, block_id: BlockId, patch: &BlockPatch) -> RepoResult<Block> {
        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(block_type) = &patch.block_type {
            assignments.push("block_type = ?");
            bind_values.push(Value::Text(block_type.as_str().to_string()));
        }
        match &patch.content {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => {
                assignments.push("content = ?");
                bind_values.push(Value::Null);
            }
            FieldUpdate::Set(content) => {
                assignments.push("content = ?");
                bind_values.push(Value::Text(content.clone()));
            }
        }
        if let Some(order) = patch.order {
            assignments.push("sort_order = ?");
            bind_values.push(Value::Real(order));
        }

        if assignments.is_empty() {
            return load_required_block(self.conn, block_id);
        }

        let sql = format!(
            "UPDATE blocks
             SET {},
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE block_uuid = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(block_id.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::BlockNotFound(block_id));
        }
        load_required_block(self.conn, block_id)
    }

    fn set_block_order(&self, block_id: BlockId, order: f64) -> RepoResult<Block> {
        let changed = self.conn.execute(
            "UPDATE blocks
             SET sort_order = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE block_uuid = ?1;",
            params![block_id.to_string(), order],
        )?;
        if changed == 0 {
            return Err(RepoError::BlockNotFound(block_id));
        }
        load_required_block(self.conn, block_id)
    }

    fn delete_block(&self, block_id: BlockId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM blocks WHERE block_uuid = ?1;",
            [block_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::BlockNotFound(block_id));
        }
        Ok(())
    }

    fn rewrite_orders(&self, page_id: PageId, orders: &[(BlockId, f64)]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (block_id, order) in orders {
            let changed = tx.execute(
                "UPDATE blocks
                 SET sort_order = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE block_uuid = ?1
                   AND page_uuid = ?2;",
                params![block_id.to_string(), page_id.to_string(), order],
            )?;
            if changed == 0 {
                return Err(RepoError::BlockNotFound(*block_id));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

/// Inserts one block row. Callers own existence checks and transactions.
pub(crate) fn insert_block_row(
    conn: &Connection,
    block_id: BlockId,
    page_id: PageId,
    seed: &BlockSeed,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO blocks (
            block_uuid,
            page_uuid,
            block_type,
            content,
            sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            block_id.to_string(),
            page_id.to_string(),
            seed.block_type.as_str(),
            seed.content.as_deref(),
            seed.order,
        ],
    )?;
    Ok(())
}

pub(crate) fn page_row_exists(conn: &Connection, page_id: PageId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pages WHERE page_uuid = ?1);",
        [page_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_required_block(conn: &Connection, block_id: BlockId) -> RepoResult<Block> {
    let mut stmt = conn.prepare(&format!("{BLOCK_SELECT_SQL} WHERE block_uuid = ?1;"))?;
    let mut rows = stmt.query([block_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_block_row(row);
    }
    Err(RepoError::BlockNotFound(block_id))
}

fn parse_block_row(row: &Row<'_>) -> RepoResult<Block> {
    let id_text: String = row.get("block_uuid")?;
    let page_text: String = row.get("page_uuid")?;
    let type_text: String = row.get("block_type")?;
    let block_type = BlockType::parse(&type_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid block type `{type_text}` in blocks.block_type"
        ))
    })?;

    let order: f64 = row.get("sort_order")?;
    if !order.is_finite() {
        return Err(RepoError::InvalidData(format!(
            "non-finite order `{order}` in blocks.sort_order"
        )));
    }

    Ok(Block {
        id: parse_uuid(&id_text, "blocks.block_uuid")?,
        page_id: parse_uuid(&page_text, "blocks.page_uuid")?,
        block_type,
        content: row.get("content")?,
        order,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
