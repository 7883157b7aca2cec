//! Access log database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

/// A stored access-log row. Rows form a hash chain; see [`crate::audit`].
#[derive(Debug, Clone, PartialEq)]
pub struct AccessLogEntry {
    pub seq: i64,
    pub actor_nif: String,
    pub action: String,
    pub detail: Option<String>,
    pub created_at: String,
    pub prev_hash: String,
    pub entry_hash: String,
}

impl Database {
    /// Append an access-log row. The caller supplies the hashes.
    pub fn append_access_row(
        &self,
        actor_nif: &str,
        action: &str,
        detail: Option<&str>,
        created_at: &str,
        prev_hash: &str,
        entry_hash: &str,
    ) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO access_log (
                actor_nif, action, detail, created_at, prev_hash, entry_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![actor_nif, action, detail, created_at, prev_hash, entry_hash],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The most recent access-log row, if any.
    pub fn last_access_row(&self) -> DbResult<Option<AccessLogEntry>> {
        self.conn
            .query_row(
                r#"
                SELECT seq, actor_nif, action, detail, created_at, prev_hash, entry_hash
                FROM access_log
                ORDER BY seq DESC
                LIMIT 1
                "#,
                [],
                map_access_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All access-log rows in chain order.
    pub fn list_access_rows(&self) -> DbResult<Vec<AccessLogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, actor_nif, action, detail, created_at, prev_hash, entry_hash
            FROM access_log
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([], map_access_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Access-log rows for one actor, newest first.
    pub fn list_access_rows_for_actor(&self, actor_nif: &str) -> DbResult<Vec<AccessLogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, actor_nif, action, detail, created_at, prev_hash, entry_hash
            FROM access_log
            WHERE actor_nif = ?
            ORDER BY seq DESC
            "#,
        )?;

        let rows = stmt.query_map([actor_nif], map_access_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn map_access_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessLogEntry> {
    Ok(AccessLogEntry {
        seq: row.get(0)?,
        actor_nif: row.get(1)?,
        action: row.get(2)?,
        detail: row.get(3)?,
        created_at: row.get(4)?,
        prev_hash: row.get(5)?,
        entry_hash: row.get(6)?,
    })
}
