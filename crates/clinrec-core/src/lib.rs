//! ClinRec Core Library
//!
//! Clinical-records management core: physician-patient assignment
//! workflow, family-antecedent editing, and clinical-data ingestion over
//! a local SQLite store, with a hash-chained access log.
//!
//! # Architecture
//!
//! ```text
//!   Physician ──(assignment request)──▶ Patient decides
//!                                           │
//!                              accepted / rejected / revoked
//!                                           │
//!                              ┌────────────▼────────────┐
//!                              │  physician_patient_link  │
//!                              │  grants record access    │
//!                              └────────────┬────────────┘
//!                                           │
//!            ┌──────────────────────────────┼──────────────────────────┐
//!            ▼                              ▼                          ▼
//!     Antecedent editor             Clinical-data ingestion       Data export
//!   (blank-line delimited blob,   (allergy lists, blood panels)  (JSON / CSV)
//!    optimistic concurrency)
//! ```
//!
//! Every sensitive operation can be recorded in the append-only
//! [`audit`] chain, where each entry hashes its predecessor.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (User, AssignmentRequest, ClinicalHistory, ...)
//! - [`services`]: Assignment workflow, antecedent editor, ingestion
//! - [`audit`]: Hash-chained access log
//! - [`export`]: User data export

pub mod audit;
pub mod db;
pub mod export;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use audit::AuditTrail;
pub use db::Database;
pub use models::{
    AssignmentRequest, ClinicalDataEntry, ClinicalHistory, LinkStatus, Notification,
    PhysicianPatientLink, RequestStatus, Role, User,
};
pub use services::{
    AntecedentEditor, AssignmentService, ClinicalDataService, ServiceError, ServiceResult,
};

use std::sync::{Arc, Mutex};

use export::{UserExport, UserExporter};

/// Top-level error type for the thread-safe core API.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl From<db::DbError> for CoreError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => CoreError::NotFound(what),
            other => CoreError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ServiceError> for CoreError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Database(inner) => inner.into(),
            ServiceError::Json(inner) => CoreError::SerializationError(inner.to_string()),
            ServiceError::NotFound(what) => CoreError::NotFound(what),
            ServiceError::Conflict(what) => CoreError::Conflict(what),
            ServiceError::Validation(what) => CoreError::InvalidInput(what),
            ServiceError::Unauthorized(what) => CoreError::Unauthorized(what),
        }
    }
}

impl From<audit::AuditError> for CoreError {
    fn from(e: audit::AuditError) -> Self {
        CoreError::AuditError(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CoreError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Open or create a database at the given path.
pub fn open_core(path: &str) -> CoreResult<ClinicalCore> {
    let db = Database::open(path)?;
    Ok(ClinicalCore {
        db: Arc::new(Mutex::new(db)),
    })
}

/// Create an in-memory core (for testing).
pub fn open_core_in_memory() -> CoreResult<ClinicalCore> {
    let db = Database::open_in_memory()?;
    Ok(ClinicalCore {
        db: Arc::new(Mutex::new(db)),
    })
}

/// Thread-safe wrapper exposing the whole API behind one lock.
pub struct ClinicalCore {
    db: Arc<Mutex<Database>>,
}

impl ClinicalCore {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Register a new user with the patient role.
    pub fn register_user(
        &self,
        nif: String,
        given_name: String,
        family_name: String,
    ) -> CoreResult<User> {
        if nif.trim().is_empty() {
            return Err(CoreError::InvalidInput("NIF is required".into()));
        }

        let db = self.db.lock()?;
        if db.get_user_by_nif(&nif)?.is_some() {
            return Err(CoreError::Conflict(format!(
                "a user with NIF {nif} already exists"
            )));
        }

        let user = User::new(nif, given_name, family_name);
        db.insert_user(&user)?;
        db.grant_role(&user.id, Role::Patient)?;
        Ok(user)
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: &str) -> CoreResult<Option<User>> {
        let db = self.db.lock()?;
        Ok(db.get_user(user_id)?)
    }

    /// Update a user's mutable profile fields.
    pub fn update_user(&self, user: &User) -> CoreResult<()> {
        let db = self.db.lock()?;
        db.update_user(user)?;
        Ok(())
    }

    /// Physician lookup of a patient by NIF and `YYYY-MM-DD` birth date.
    pub fn find_patient(&self, nif: &str, birth_date: &str) -> CoreResult<User> {
        let db = self.db.lock()?;
        let user = AssignmentService::new(&db).find_patient(nif, birth_date)?;
        Ok(user)
    }

    /// Grant or revoke the physician role. Revoking cascades to the
    /// user's links and open requests.
    pub fn set_medical_role(&self, user_id: &str, grant: bool) -> CoreResult<User> {
        let db = self.db.lock()?;
        let user = AssignmentService::new(&db).set_medical_role(user_id, grant)?;
        Ok(user)
    }

    // =========================================================================
    // Assignment Workflow
    // =========================================================================

    /// Create a pending assignment request toward the patient with the
    /// given NIF.
    pub fn create_assignment_request(
        &self,
        physician_id: &str,
        patient_nif: &str,
    ) -> CoreResult<AssignmentRequest> {
        let db = self.db.lock()?;
        let request = AssignmentService::new(&db).create_request(physician_id, patient_nif)?;
        Ok(request)
    }

    /// Pending requests the physician has open.
    pub fn pending_requests_for_physician(
        &self,
        physician_id: &str,
    ) -> CoreResult<Vec<AssignmentRequest>> {
        let db = self.db.lock()?;
        let requests = AssignmentService::new(&db).list_pending_for_physician(physician_id)?;
        Ok(requests)
    }

    /// Every request the physician has sent, newest first.
    pub fn requests_sent_by_physician(
        &self,
        physician_id: &str,
    ) -> CoreResult<Vec<AssignmentRequest>> {
        let db = self.db.lock()?;
        let requests = AssignmentService::new(&db).list_sent_by_physician(physician_id)?;
        Ok(requests)
    }

    /// Pending requests awaiting the patient's decision.
    pub fn requests_received_by_patient(
        &self,
        patient_id: &str,
    ) -> CoreResult<Vec<AssignmentRequest>> {
        let db = self.db.lock()?;
        let requests = AssignmentService::new(&db).list_received_by_patient(patient_id)?;
        Ok(requests)
    }

    /// Apply the patient's decision ("accepted", "rejected" or "revoked")
    /// to a request.
    pub fn decide_assignment_request(
        &self,
        patient_id: &str,
        request_id: &str,
        new_status: &str,
    ) -> CoreResult<AssignmentRequest> {
        let db = self.db.lock()?;
        let request =
            AssignmentService::new(&db).decide_request(patient_id, request_id, new_status)?;
        Ok(request)
    }

    /// Active links of a physician.
    pub fn active_links_for_physician(
        &self,
        physician_id: &str,
    ) -> CoreResult<Vec<PhysicianPatientLink>> {
        let db = self.db.lock()?;
        Ok(db.list_active_links_for_physician(physician_id)?)
    }

    // =========================================================================
    // Antecedent Operations
    // =========================================================================

    /// The user's clinical history, created empty on first access.
    pub fn get_clinical_history(&self, user_id: &str) -> CoreResult<ClinicalHistory> {
        let db = self.db.lock()?;
        let history = AntecedentEditor::new(&db).get_or_create_history(user_id)?;
        Ok(history)
    }

    /// The antecedent entries of a user, in blob order.
    pub fn list_antecedents(&self, user_id: &str) -> CoreResult<Vec<String>> {
        let db = self.db.lock()?;
        let entries = AntecedentEditor::new(&db).list_antecedents(user_id)?;
        Ok(entries)
    }

    /// Replace the whole family-history blob.
    pub fn replace_family_history(
        &self,
        user_id: &str,
        raw: &str,
    ) -> CoreResult<ClinicalHistory> {
        let db = self.db.lock()?;
        let history = AntecedentEditor::new(&db).replace_family_history(user_id, raw)?;
        Ok(history)
    }

    /// Replace the antecedent at a zero-based position, stamping the
    /// local edit time.
    pub fn edit_antecedent(
        &self,
        user_id: &str,
        index: usize,
        text: &str,
    ) -> CoreResult<ClinicalHistory> {
        let db = self.db.lock()?;
        let history = AntecedentEditor::new(&db).edit_antecedent_at(user_id, index, text)?;
        Ok(history)
    }

    /// Delete the antecedent at a zero-based position.
    pub fn delete_antecedent(&self, user_id: &str, index: usize) -> CoreResult<ClinicalHistory> {
        let db = self.db.lock()?;
        let history = AntecedentEditor::new(&db).delete_antecedent_at(user_id, index)?;
        Ok(history)
    }

    // =========================================================================
    // Clinical Data Ingestion
    // =========================================================================

    /// Record a free-text allergy list, one allergy per line.
    pub fn record_allergies(
        &self,
        user_id: &str,
        raw: &str,
    ) -> CoreResult<Vec<ClinicalDataEntry>> {
        let mut db = self.db.lock()?;
        let entries = ClinicalDataService::new(&mut db).record_allergies(user_id, raw)?;
        Ok(entries)
    }

    /// Ingest a blood-panel JSON document, all-or-nothing.
    pub fn record_blood_panel(
        &self,
        user_id: &str,
        payload: &str,
    ) -> CoreResult<Vec<ClinicalDataEntry>> {
        let mut db = self.db.lock()?;
        let entries = ClinicalDataService::new(&mut db).record_blood_panel(user_id, payload)?;
        Ok(entries)
    }

    /// The stored allergy entries of a user.
    pub fn list_allergies(&self, user_id: &str) -> CoreResult<Vec<ClinicalDataEntry>> {
        let mut db = self.db.lock()?;
        let entries = ClinicalDataService::new(&mut db).list_allergies(user_id)?;
        Ok(entries)
    }

    /// All clinical data entries of a user.
    pub fn list_clinical_data(&self, user_id: &str) -> CoreResult<Vec<ClinicalDataEntry>> {
        let mut db = self.db.lock()?;
        let entries = ClinicalDataService::new(&mut db).list_entries(user_id)?;
        Ok(entries)
    }

    /// Delete one of the user's own clinical data entries.
    pub fn delete_clinical_entry(&self, user_id: &str, entry_id: &str) -> CoreResult<()> {
        let mut db = self.db.lock()?;
        ClinicalDataService::new(&mut db).delete_entry(user_id, entry_id)?;
        Ok(())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// All notifications for a user, newest first.
    pub fn notifications_for_user(&self, user_id: &str) -> CoreResult<Vec<Notification>> {
        let db = self.db.lock()?;
        Ok(db.list_notifications_for_user(user_id)?)
    }

    /// Number of unread notifications for a user.
    pub fn unread_notification_count(&self, user_id: &str) -> CoreResult<usize> {
        let db = self.db.lock()?;
        Ok(db.count_unread_notifications(user_id)?)
    }

    /// Mark one of the user's own notifications as read.
    pub fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> CoreResult<()> {
        let db = self.db.lock()?;
        Self::require_owned_notification(&db, user_id, notification_id)?;
        db.mark_notification_read(notification_id)?;
        Ok(())
    }

    /// Mark every notification of a user as read. Returns how many were
    /// still unread.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> CoreResult<usize> {
        let db = self.db.lock()?;
        Ok(db.mark_all_notifications_read(user_id)?)
    }

    /// Delete one of the user's own notifications.
    pub fn delete_notification(&self, user_id: &str, notification_id: &str) -> CoreResult<()> {
        let db = self.db.lock()?;
        Self::require_owned_notification(&db, user_id, notification_id)?;
        db.delete_notification(notification_id)?;
        Ok(())
    }

    fn require_owned_notification(
        db: &Database,
        user_id: &str,
        notification_id: &str,
    ) -> CoreResult<Notification> {
        let notification = db
            .get_notification(notification_id)?
            .ok_or_else(|| CoreError::NotFound(format!("notification {notification_id}")))?;
        if notification.user_id != user_id {
            return Err(CoreError::Unauthorized(
                "notification does not belong to the caller".into(),
            ));
        }
        Ok(notification)
    }

    // =========================================================================
    // Audit Operations
    // =========================================================================

    /// Append an access record to the hash chain.
    pub fn record_access(
        &self,
        actor_nif: &str,
        action: &str,
        detail: Option<&str>,
    ) -> CoreResult<()> {
        let db = self.db.lock()?;
        AuditTrail::new(&db).record(actor_nif, action, detail)?;
        Ok(())
    }

    /// Verify the whole access-log chain. Returns the entry count.
    pub fn verify_access_log(&self) -> CoreResult<usize> {
        let db = self.db.lock()?;
        let count = AuditTrail::new(&db).verify_chain()?;
        Ok(count)
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Gather everything stored about a user. Recorded in the access log.
    pub fn export_user(&self, user_id: &str) -> CoreResult<UserExport> {
        let db = self.db.lock()?;
        let export = UserExporter::new(&db).export_user(user_id)?;
        AuditTrail::new(&db).record(&export.profile.nif, "export", Some(user_id))?;
        Ok(export)
    }

    /// Export a user's data as pretty-printed JSON.
    pub fn export_user_json(&self, user_id: &str) -> CoreResult<String> {
        let export = self.export_user(user_id)?;
        Ok(export.to_json()?)
    }

    /// Export a user's clinical data as CSV.
    pub fn export_user_csv(&self, user_id: &str) -> CoreResult<String> {
        let export = self.export_user(user_id)?;
        Ok(export.to_csv())
    }
}
