//! User data export.
//!
//! Gathers everything stored about a user into a single portable
//! document: profile, roles, the clinical history with its antecedent
//! entries, every clinical data row, and the user's access-log entries.

use serde::{Deserialize, Serialize};

use crate::db::{AccessLogEntry, Database};
use crate::models::{AccountStatus, ClinicalDataEntry, Role, User};
use crate::services::{require_user, split_entries, ServiceResult};

/// Complete export of one user's stored data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserExport {
    /// Export metadata
    pub metadata: ExportMetadata,
    /// Profile fields
    pub profile: ExportProfile,
    /// Granted roles
    pub roles: Vec<String>,
    /// Family-history blob, split into entries
    pub antecedents: Vec<String>,
    /// All clinical data rows, oldest first
    pub clinical_data: Vec<ClinicalDataEntry>,
    /// Access-log entries recorded for the user, newest first
    pub access_log: Vec<ExportAccessRow>,
}

/// Export metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Exported user id
    pub user_id: String,
    /// Export timestamp
    pub exported_at: String,
}

/// Profile fields included in the export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportProfile {
    pub nif: String,
    pub given_name: String,
    pub family_name: String,
    pub email: Option<String>,
    pub birth_date: Option<String>,
    pub status: AccountStatus,
    pub created_at: String,
}

/// One access-log row, without the chain hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportAccessRow {
    pub action: String,
    pub detail: Option<String>,
    pub created_at: String,
}

impl UserExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the clinical data rows to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("kind,value,unit,note,created_at\n");

        // Lines
        for entry in &self.clinical_data {
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                escape_csv(&entry.kind),
                entry.value,
                escape_csv(&entry.unit),
                escape_csv(entry.note.as_deref().unwrap_or("")),
                escape_csv(&entry.created_at),
            ));
        }

        csv
    }
}

/// User data exporter.
pub struct UserExporter<'a> {
    db: &'a Database,
}

impl<'a> UserExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Gather everything stored about the user.
    pub fn export_user(&self, user_id: &str) -> ServiceResult<UserExport> {
        let user = require_user(self.db, user_id)?;

        let roles = self
            .db
            .roles_for_user(&user.id)?
            .iter()
            .map(Role::as_str)
            .map(str::to_string)
            .collect();

        let (antecedents, clinical_data) = match self.db.get_history_by_user(&user.id)? {
            Some(history) => (
                split_entries(history.family_history.as_deref()),
                self.db.list_entries_for_history(&history.id)?,
            ),
            None => (Vec::new(), Vec::new()),
        };

        let access_log = self
            .db
            .list_access_rows_for_actor(&user.nif)?
            .into_iter()
            .map(ExportAccessRow::from)
            .collect();

        Ok(UserExport {
            metadata: ExportMetadata {
                user_id: user.id.clone(),
                exported_at: chrono::Utc::now().to_rfc3339(),
            },
            profile: ExportProfile::from(&user),
            roles,
            antecedents,
            clinical_data,
            access_log,
        })
    }
}

impl From<&User> for ExportProfile {
    fn from(user: &User) -> Self {
        Self {
            nif: user.nif.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            email: user.email.clone(),
            birth_date: user.birth_date.clone(),
            status: user.status,
            created_at: user.created_at.clone(),
        }
    }
}

impl From<AccessLogEntry> for ExportAccessRow {
    fn from(entry: AccessLogEntry) -> Self {
        Self {
            action: entry.action,
            detail: entry.detail,
            created_at: entry.created_at,
        }
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
