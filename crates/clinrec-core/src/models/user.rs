//! User and role models.

use serde::{Deserialize, Serialize};

/// A registered user. Physicians and patients share this record; what a
/// user may do is determined by their role links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Internal UUID - the opaque id used by every foreign key
    pub id: String,
    /// National identifier, unique, the human-facing handle
    pub nif: String,
    /// Given name
    pub given_name: String,
    /// Family name
    pub family_name: String,
    /// Contact email
    pub email: Option<String>,
    /// Birth date (`YYYY-MM-DD`), used by physician patient lookup
    pub birth_date: Option<String>,
    /// Account status
    pub status: AccountStatus,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl User {
    /// Create a new active user with required fields.
    pub fn new(nif: String, given_name: String, family_name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            nif,
            given_name,
            family_name,
            email: None,
            birth_date: None,
            status: AccountStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Display name, family name last.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

/// Account status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "suspended" => Some(AccountStatus::Suspended),
            _ => None,
        }
    }
}

/// Role a user can hold. Stored as one row per (user, role).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Physician,
    Patient,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Physician => "physician",
            Role::Patient => "patient",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "physician" => Some(Role::Physician),
            "patient" => Some(Role::Patient),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}
