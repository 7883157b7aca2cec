//! Clinical data entry database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::ClinicalDataEntry;

impl Database {
    /// Insert a single clinical data entry.
    pub fn insert_entry(&self, entry: &ClinicalDataEntry) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO clinical_data_entries (
                id, history_id, kind, value, unit, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.id,
                entry.history_id,
                entry.kind,
                entry.value,
                entry.unit,
                entry.note,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// Insert a batch of entries atomically (all-or-nothing).
    pub fn insert_entries(&mut self, entries: &[ClinicalDataEntry]) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        for entry in entries {
            tx.execute(
                r#"
                INSERT INTO clinical_data_entries (
                    id, history_id, kind, value, unit, note, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    entry.id,
                    entry.history_id,
                    entry.kind,
                    entry.value,
                    entry.unit,
                    entry.note,
                    entry.created_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Get an entry by id.
    pub fn get_entry(&self, id: &str) -> DbResult<Option<ClinicalDataEntry>> {
        self.conn
            .query_row(
                r#"
                SELECT id, history_id, kind, value, unit, note, created_at
                FROM clinical_data_entries
                WHERE id = ?
                "#,
                [id],
                map_entry_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All entries of a history, oldest first.
    pub fn list_entries_for_history(&self, history_id: &str) -> DbResult<Vec<ClinicalDataEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, history_id, kind, value, unit, note, created_at
            FROM clinical_data_entries
            WHERE history_id = ?
            ORDER BY created_at
            "#,
        )?;

        let rows = stmt.query_map([history_id], map_entry_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Entries of a history with the given kind tag, oldest first.
    pub fn list_entries_by_kind(
        &self,
        history_id: &str,
        kind: &str,
    ) -> DbResult<Vec<ClinicalDataEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, history_id, kind, value, unit, note, created_at
            FROM clinical_data_entries
            WHERE history_id = ?1 AND kind = ?2
            ORDER BY created_at
            "#,
        )?;

        let rows = stmt.query_map(params![history_id, kind], map_entry_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete an entry.
    pub fn delete_entry(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM clinical_data_entries WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClinicalDataEntry> {
    Ok(ClinicalDataEntry {
        id: row.get(0)?,
        history_id: row.get(1)?,
        kind: row.get(2)?,
        value: row.get(3)?,
        unit: row.get(4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
    })
}
