//! Assignment request and physician-patient link models.

use serde::{Deserialize, Serialize};

use super::User;

/// Status of an assignment request.
///
/// A request starts `Pending` and is resolved by the patient (`Accepted` /
/// `Rejected`) or by an administrative revocation of the physician's
/// medical role (`Revoked`). Requests are never hard-deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Revoked,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            "revoked" => Some(RequestStatus::Revoked),
            _ => None,
        }
    }
}

/// A proposal linking one physician to one patient.
///
/// NIFs are denormalized onto the row so the single-pending-per-pair check
/// and the physician/patient views query without joins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentRequest {
    /// Unique request id
    pub id: String,
    /// Physician (initiator) user id
    pub physician_id: String,
    /// Physician NIF
    pub physician_nif: String,
    /// Patient (recipient) user id
    pub patient_id: String,
    /// Patient NIF
    pub patient_nif: String,
    /// Current status
    pub status: RequestStatus,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl AssignmentRequest {
    /// Create a new pending request from a physician to a patient.
    pub fn new(physician: &User, patient: &User) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            physician_id: physician.id.clone(),
            physician_nif: physician.nif.clone(),
            patient_id: patient.id.clone(),
            patient_nif: patient.nif.clone(),
            status: RequestStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Status of an established physician-patient relationship.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkStatus {
    Active,
    Revoked,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Active => "active",
            LinkStatus::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LinkStatus::Active),
            "revoked" => Some(LinkStatus::Revoked),
            _ => None,
        }
    }
}

/// An established relationship giving a physician access to a patient's
/// record. Created when the patient accepts an assignment request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhysicianPatientLink {
    /// Unique link id
    pub id: String,
    /// Physician user id
    pub physician_id: String,
    /// Patient user id
    pub patient_id: String,
    /// Current status
    pub status: LinkStatus,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl PhysicianPatientLink {
    /// Create a new active link.
    pub fn new(physician_id: String, patient_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            physician_id,
            patient_id,
            status: LinkStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
