//! Clinical history database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::ClinicalHistory;

impl Database {
    /// Insert a new clinical history.
    pub fn insert_history(&self, history: &ClinicalHistory) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO clinical_histories (
                id, user_id, family_history, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                history.id,
                history.user_id,
                history.family_history,
                history.version,
                history.created_at,
                history.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a history by owning user id.
    pub fn get_history_by_user(&self, user_id: &str) -> DbResult<Option<ClinicalHistory>> {
        self.conn
            .query_row(
                r#"
                SELECT id, user_id, family_history, version, created_at, updated_at
                FROM clinical_histories
                WHERE user_id = ?
                "#,
                [user_id],
                map_history_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a history by id.
    pub fn get_history(&self, id: &str) -> DbResult<Option<ClinicalHistory>> {
        self.conn
            .query_row(
                r#"
                SELECT id, user_id, family_history, version, created_at, updated_at
                FROM clinical_histories
                WHERE id = ?
                "#,
                [id],
                map_history_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Compare-and-swap the family-history blob.
    ///
    /// The write only lands if `expected_version` still matches the stored
    /// row; the version is bumped on success. Returns false when another
    /// writer got there first.
    pub fn update_family_history(
        &self,
        history_id: &str,
        family_history: Option<&str>,
        expected_version: i64,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE clinical_histories
            SET family_history = ?2, version = version + 1, updated_at = datetime('now')
            WHERE id = ?1 AND version = ?3
            "#,
            params![history_id, family_history, expected_version],
        )?;
        Ok(rows_affected > 0)
    }
}

fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClinicalHistory> {
    Ok(ClinicalHistory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        family_history: row.get(2)?,
        version: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
