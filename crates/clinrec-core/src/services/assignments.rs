//! Assignment workflow engine.
//!
//! Manages the lifecycle of physician-patient assignment requests:
//! creation with the single-pending-per-pair guarantee, patient decisions,
//! and administrative medical-role changes with bulk revocation.

use tracing::{debug, info, warn};

use super::{require_user, ServiceError, ServiceResult};
use crate::db::Database;
use crate::models::{
    AssignmentRequest, Notification, NotificationKind, PhysicianPatientLink, RequestStatus, Role,
    User,
};

/// Assignment workflow service.
pub struct AssignmentService<'a> {
    db: &'a Database,
}

impl<'a> AssignmentService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a pending assignment request from a physician to the patient
    /// with the given NIF.
    ///
    /// Fails with `NotFound` when either side does not resolve, with
    /// `Unauthorized` when the caller lacks the physician role, and with
    /// `Conflict` when a pending request already exists for the pair.
    pub fn create_request(
        &self,
        physician_id: &str,
        patient_nif: &str,
    ) -> ServiceResult<AssignmentRequest> {
        debug!(physician_id, patient_nif, "creating assignment request");

        if patient_nif.trim().is_empty() {
            return Err(ServiceError::Validation("patient NIF is required".into()));
        }

        let physician = require_user(self.db, physician_id)?;
        if !self.db.has_role(&physician.id, Role::Physician)? {
            return Err(ServiceError::Unauthorized(
                "caller does not hold the physician role".into(),
            ));
        }

        let patient = self
            .db
            .get_user_by_nif(patient_nif)?
            .ok_or_else(|| ServiceError::NotFound(format!("patient with NIF {patient_nif}")))?;

        if self
            .db
            .request_exists(&physician.nif, &patient.nif, RequestStatus::Pending)?
        {
            warn!(
                physician_nif = %physician.nif,
                patient_nif = %patient.nif,
                "duplicate pending assignment request rejected"
            );
            return Err(ServiceError::Conflict(
                "a pending assignment request already exists for this patient".into(),
            ));
        }

        let request = AssignmentRequest::new(&physician, &patient);
        self.db.insert_request(&request)?;

        self.db.insert_notification(&Notification::new(
            patient.id.clone(),
            NotificationKind::AssignmentRequest,
            format!(
                "Dr. {} requests access to your clinical record",
                physician.display_name()
            ),
        ))?;

        info!(request_id = %request.id, "assignment request created");
        Ok(request)
    }

    /// Pending requests initiated by the physician.
    pub fn list_pending_for_physician(
        &self,
        physician_id: &str,
    ) -> ServiceResult<Vec<AssignmentRequest>> {
        let physician = require_user(self.db, physician_id)?;
        Ok(self
            .db
            .list_requests_by_physician_and_status(&physician.nif, RequestStatus::Pending)?)
    }

    /// All requests initiated by the physician, newest first.
    pub fn list_sent_by_physician(
        &self,
        physician_id: &str,
    ) -> ServiceResult<Vec<AssignmentRequest>> {
        let physician = require_user(self.db, physician_id)?;
        Ok(self.db.list_requests_by_physician(&physician.nif)?)
    }

    /// Pending requests awaiting the patient's decision.
    pub fn list_received_by_patient(
        &self,
        patient_id: &str,
    ) -> ServiceResult<Vec<AssignmentRequest>> {
        let patient = require_user(self.db, patient_id)?;
        Ok(self
            .db
            .list_requests_by_patient_and_status(&patient.nif, RequestStatus::Pending)?)
    }

    /// Apply the patient's decision to a request.
    ///
    /// `new_status` must name a recognized non-pending status. Accepting a
    /// request establishes an active physician-patient link.
    pub fn decide_request(
        &self,
        acting_patient_id: &str,
        request_id: &str,
        new_status: &str,
    ) -> ServiceResult<AssignmentRequest> {
        debug!(request_id, new_status, "updating assignment request status");

        let status = RequestStatus::parse(new_status)
            .ok_or_else(|| ServiceError::Validation(format!("unrecognized status: {new_status}")))?;
        if status == RequestStatus::Pending {
            return Err(ServiceError::Validation(
                "a request cannot be moved back to pending".into(),
            ));
        }

        let request = self
            .db
            .get_request(request_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("assignment request {request_id}")))?;

        let patient = require_user(self.db, acting_patient_id)?;
        if request.patient_id != patient.id {
            return Err(ServiceError::Unauthorized(
                "request does not belong to the caller".into(),
            ));
        }

        self.db.update_request_status(&request.id, status)?;

        if status == RequestStatus::Accepted
            && !self
                .db
                .active_link_exists(&request.physician_id, &request.patient_id)?
        {
            let link =
                PhysicianPatientLink::new(request.physician_id.clone(), request.patient_id.clone());
            self.db.insert_link(&link)?;
        }

        self.db.insert_notification(&Notification::new(
            request.physician_id.clone(),
            NotificationKind::AssignmentDecision,
            format!(
                "Your assignment request for {} was {}",
                request.patient_nif,
                status.as_str()
            ),
        ))?;

        info!(request_id = %request.id, status = status.as_str(), "assignment request decided");

        // Re-read so the caller sees the stamped update time
        self.db
            .get_request(&request.id)?
            .ok_or_else(|| ServiceError::NotFound(format!("assignment request {request_id}")))
    }

    /// Grant or revoke the physician role of a user.
    ///
    /// Granting is idempotent. Revoking bulk-revokes every non-revoked link
    /// and assignment request of the physician, removes the role, and
    /// guarantees the user keeps the patient role.
    pub fn set_medical_role(&self, user_id: &str, grant: bool) -> ServiceResult<User> {
        let user = require_user(self.db, user_id)?;

        if grant {
            self.db.grant_role(&user.id, Role::Physician)?;
            info!(user_id = %user.id, "physician role granted");
            return Ok(user);
        }

        let links = self.db.revoke_links_for_physician(&user.id)?;
        let requests = self.db.revoke_requests_for_physician(&user.nif)?;
        self.db.revoke_role(&user.id, Role::Physician)?;
        self.db.grant_role(&user.id, Role::Patient)?;

        info!(
            user_id = %user.id,
            revoked_links = links,
            revoked_requests = requests,
            "physician role revoked"
        );
        Ok(user)
    }

    /// Physician lookup of a patient by NIF and birth date.
    pub fn find_patient(&self, nif: &str, birth_date: &str) -> ServiceResult<User> {
        if nif.trim().is_empty() {
            return Err(ServiceError::Validation("patient NIF is required".into()));
        }
        if !is_iso_date(birth_date) {
            return Err(ServiceError::Validation(
                "birth date must use the YYYY-MM-DD format".into(),
            ));
        }

        self.db
            .find_user_by_nif_and_birth_date(nif, birth_date)?
            .ok_or_else(|| ServiceError::NotFound(format!("patient with NIF {nif}")))
    }
}

/// Cheap shape check for `YYYY-MM-DD`.
fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
