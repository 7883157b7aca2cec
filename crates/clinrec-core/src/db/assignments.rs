//! Assignment request database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{AssignmentRequest, RequestStatus};

impl Database {
    /// Insert a new assignment request.
    pub fn insert_request(&self, request: &AssignmentRequest) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO assignment_requests (
                id, physician_id, physician_nif, patient_id, patient_nif,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                request.id,
                request.physician_id,
                request.physician_nif,
                request.patient_id,
                request.patient_nif,
                request.status.as_str(),
                request.created_at,
                request.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a request by id.
    pub fn get_request(&self, id: &str) -> DbResult<Option<AssignmentRequest>> {
        self.conn
            .query_row(
                r#"
                SELECT id, physician_id, physician_nif, patient_id, patient_nif,
                       status, created_at, updated_at
                FROM assignment_requests
                WHERE id = ?
                "#,
                [id],
                map_request_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Whether a request with the given status exists for the pair.
    pub fn request_exists(
        &self,
        physician_nif: &str,
        patient_nif: &str,
        status: RequestStatus,
    ) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM assignment_requests
            WHERE physician_nif = ?1 AND patient_nif = ?2 AND status = ?3
            "#,
            params![physician_nif, patient_nif, status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Requests initiated by a physician with the given status.
    pub fn list_requests_by_physician_and_status(
        &self,
        physician_nif: &str,
        status: RequestStatus,
    ) -> DbResult<Vec<AssignmentRequest>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, physician_id, physician_nif, patient_id, patient_nif,
                   status, created_at, updated_at
            FROM assignment_requests
            WHERE physician_nif = ?1 AND status = ?2
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map(params![physician_nif, status.as_str()], map_request_row)?;
        collect_requests(rows)
    }

    /// All requests initiated by a physician, newest first.
    pub fn list_requests_by_physician(
        &self,
        physician_nif: &str,
    ) -> DbResult<Vec<AssignmentRequest>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, physician_id, physician_nif, patient_id, patient_nif,
                   status, created_at, updated_at
            FROM assignment_requests
            WHERE physician_nif = ?
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map([physician_nif], map_request_row)?;
        collect_requests(rows)
    }

    /// Requests received by a patient with the given status.
    pub fn list_requests_by_patient_and_status(
        &self,
        patient_nif: &str,
        status: RequestStatus,
    ) -> DbResult<Vec<AssignmentRequest>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, physician_id, physician_nif, patient_id, patient_nif,
                   status, created_at, updated_at
            FROM assignment_requests
            WHERE patient_nif = ?1 AND status = ?2
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map(params![patient_nif, status.as_str()], map_request_row)?;
        collect_requests(rows)
    }

    /// Set the status of a request, stamping the update time.
    pub fn update_request_status(&self, id: &str, status: RequestStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE assignment_requests SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Transition every non-revoked request of a physician to revoked.
    /// Returns the number of requests touched.
    pub fn revoke_requests_for_physician(&self, physician_nif: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE assignment_requests
            SET status = 'revoked', updated_at = datetime('now')
            WHERE physician_nif = ? AND status != 'revoked'
            "#,
            [physician_nif],
        )?;
        Ok(rows_affected)
    }
}

/// Intermediate row struct for database mapping.
struct RequestRow {
    id: String,
    physician_id: String,
    physician_nif: String,
    patient_id: String,
    patient_nif: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn map_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        physician_id: row.get(1)?,
        physician_nif: row.get(2)?,
        patient_id: row.get(3)?,
        patient_nif: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn collect_requests(
    rows: impl Iterator<Item = rusqlite::Result<RequestRow>>,
) -> DbResult<Vec<AssignmentRequest>> {
    let mut requests = Vec::new();
    for row in rows {
        requests.push(row?.try_into()?);
    }
    Ok(requests)
}

impl TryFrom<RequestRow> for AssignmentRequest {
    type Error = DbError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let status = RequestStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown request status: {}", row.status)))?;

        Ok(AssignmentRequest {
            id: row.id,
            physician_id: row.physician_id,
            physician_nif: row.physician_nif,
            patient_id: row.patient_id,
            patient_nif: row.patient_nif,
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
    fn test_insert_and_get() {
        let (db, physician, patient) = setup();

        let request = AssignmentRequest::new(&physician, &patient);
        db.insert_request(&request).unwrap();

        let retrieved = db.get_request(&request.id).unwrap().unwrap();
        assert_eq!(retrieved, request);
    }

    #[test]
    fn test_request_exists() {
        let (db, physician, patient) = setup();

        let request = AssignmentRequest::new(&physician, &patient);
        db.insert_request(&request).unwrap();

        assert!(db
            .request_exists("11111111A", "22222222B", RequestStatus::Pending)
            .unwrap());
        assert!(!db
            .request_exists("11111111A", "22222222B", RequestStatus::Accepted)
            .unwrap());
        assert!(!db
            .request_exists("11111111A", "33333333C", RequestStatus::Pending)
            .unwrap());
    }

    #[test]
    fn test_update_status() {
        let (db, physician, patient) = setup();

        let request = AssignmentRequest::new(&physician, &patient);
        db.insert_request(&request).unwrap();

        assert!(db
            .update_request_status(&request.id, RequestStatus::Accepted)
            .unwrap());
        let retrieved = db.get_request(&request.id).unwrap().unwrap();
        assert_eq!(retrieved.status, RequestStatus::Accepted);

        assert!(!db
            .update_request_status("missing", RequestStatus::Accepted)
            .unwrap());
    }

    #[test]
    fn test_bulk_revoke_skips_already_revoked() {
        let (db, physician, patient) = setup();

        let r1 = AssignmentRequest::new(&physician, &patient);
        db.insert_request(&r1).unwrap();
        let mut r2 = AssignmentRequest::new(&physician, &patient);
        r2.status = RequestStatus::Revoked;
        db.insert_request(&r2).unwrap();

        let touched = db.revoke_requests_for_physician("11111111A").unwrap();
        assert_eq!(touched, 1);

        let retrieved = db.get_request(&r1.id).unwrap().unwrap();
        assert_eq!(retrieved.status, RequestStatus::Revoked);
    }

    #[test]
    fn test_list_by_physician_orders_newest_first() {
        let (db, physician, patient) = setup();

        let mut old = AssignmentRequest::new(&physician, &patient);
        old.created_at = "2024-01-01T00:00:00+00:00".into();
        old.status = RequestStatus::Rejected;
        db.insert_request(&old).unwrap();

        let mut new = AssignmentRequest::new(&physician, &patient);
        new.created_at = "2025-01-01T00:00:00+00:00".into();
        db.insert_request(&new).unwrap();

        let sent = db.list_requests_by_physician("11111111A").unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].id, new.id);
        assert_eq!(sent[1].id, old.id);

        let pending = db
            .list_requests_by_physician_and_status("11111111A", RequestStatus::Pending)
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, new.id);
    }
}
