//! Physician-patient link database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{LinkStatus, PhysicianPatientLink};

impl Database {
    /// Insert a new link.
    pub fn insert_link(&self, link: &PhysicianPatientLink) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO physician_patient_links (
                id, physician_id, patient_id, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                link.id,
                link.physician_id,
                link.patient_id,
                link.status.as_str(),
                link.created_at,
                link.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a link by id.
    pub fn get_link(&self, id: &str) -> DbResult<Option<PhysicianPatientLink>> {
        self.conn
            .query_row(
                r#"
                SELECT id, physician_id, patient_id, status, created_at, updated_at
                FROM physician_patient_links
                WHERE id = ?
                "#,
                [id],
                map_link_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Active links of a physician.
    pub fn list_active_links_for_physician(
        &self,
        physician_id: &str,
    ) -> DbResult<Vec<PhysicianPatientLink>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, physician_id, patient_id, status, created_at, updated_at
            FROM physician_patient_links
            WHERE physician_id = ? AND status = 'active'
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map([physician_id], map_link_row)?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?.try_into()?);
        }
        Ok(links)
    }

    /// Whether an active link exists between physician and patient.
    pub fn active_link_exists(&self, physician_id: &str, patient_id: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM physician_patient_links
            WHERE physician_id = ?1 AND patient_id = ?2 AND status = 'active'
            "#,
            params![physician_id, patient_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Transition every non-revoked link of a physician to revoked.
    /// Returns the number of links touched.
    pub fn revoke_links_for_physician(&self, physician_id: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE physician_patient_links
            SET status = 'revoked', updated_at = datetime('now')
            WHERE physician_id = ? AND status != 'revoked'
            "#,
            [physician_id],
        )?;
        Ok(rows_affected)
    }
}

/// Intermediate row struct for database mapping.
struct LinkRow {
    id: String,
    physician_id: String,
    patient_id: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn map_link_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkRow> {
    Ok(LinkRow {
        id: row.get(0)?,
        physician_id: row.get(1)?,
        patient_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl TryFrom<LinkRow> for PhysicianPatientLink {
    type Error = DbError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let status = LinkStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown link status: {}", row.status)))?;

        Ok(PhysicianPatientLink {
            id: row.id,
            physician_id: row.physician_id,
            patient_id: row.patient_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn setup() -> (Database, User, User) {
        let db = Database::open_in_memory().unwrap();
        let physician = User::new("11111111A".into(), "Juan".into(), "Pérez".into());
        let patient = User::new("22222222B".into(), "Ana".into(), "García".into());
        db.insert_user(&physician).unwrap();
        db.insert_user(&patient).unwrap();
        (db, physician, patient)
    }

    #[test]
    fn test_insert_and_active_exists() {
        let (db, physician, patient) = setup();

        let link = PhysicianPatientLink::new(physician.id.clone(), patient.id.clone());
        db.insert_link(&link).unwrap();

        assert!(db.active_link_exists(&physician.id, &patient.id).unwrap());
        assert!(!db.active_link_exists(&patient.id, &physician.id).unwrap());
    }

    #[test]
    fn test_revoke_all_for_physician() {
        let (db, physician, patient) = setup();
        let other = User::new("33333333C".into(), "Luis".into(), "Santos".into());
        db.insert_user(&other).unwrap();

        let l1 = PhysicianPatientLink::new(physician.id.clone(), patient.id.clone());
        let l2 = PhysicianPatientLink::new(physician.id.clone(), other.id.clone());
        db.insert_link(&l1).unwrap();
        db.insert_link(&l2).unwrap();

        let touched = db.revoke_links_for_physician(&physician.id).unwrap();
        assert_eq!(touched, 2);
        assert!(!db.active_link_exists(&physician.id, &patient.id).unwrap());

        let active = db.list_active_links_for_physician(&physician.id).unwrap();
        assert!(active.is_empty());

        // Idempotent: nothing left to revoke
        assert_eq!(db.revoke_links_for_physician(&physician.id).unwrap(), 0);
    }
}
