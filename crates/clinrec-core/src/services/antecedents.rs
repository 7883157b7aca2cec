//! Family-antecedent editor.
//!
//! Antecedents live in a single free-text blob on the clinical history.
//! Individual entries are separated by blank lines; the editor splits the
//! blob, applies a positional edit or delete, and writes the rejoined
//! blob back with an optimistic-concurrency check.

use tracing::debug;

use super::{ensure_history, require_user, ServiceError, ServiceResult};
use crate::db::Database;
use crate::models::ClinicalHistory;

/// Editor for the family-history blob of a user's clinical record.
pub struct AntecedentEditor<'a> {
    db: &'a Database,
}

impl<'a> AntecedentEditor<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// The user's clinical history, created empty on first access.
    pub fn get_or_create_history(&self, user_id: &str) -> ServiceResult<ClinicalHistory> {
        let user = require_user(self.db, user_id)?;
        Ok(ensure_history(self.db, &user)?)
    }

    /// The antecedent entries of a user, in blob order.
    pub fn list_antecedents(&self, user_id: &str) -> ServiceResult<Vec<String>> {
        let history = self.get_or_create_history(user_id)?;
        Ok(split_entries(history.family_history.as_deref()))
    }

    /// Replace the whole family-history blob. A blank replacement clears it.
    pub fn replace_family_history(
        &self,
        user_id: &str,
        raw: &str,
    ) -> ServiceResult<ClinicalHistory> {
        let history = self.get_or_create_history(user_id)?;
        let trimmed = raw.trim();
        let blob = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        };
        self.write_blob(&history, blob)
    }

    /// Delete the antecedent at the given zero-based position.
    ///
    /// A history with no antecedents is left untouched; an out-of-range
    /// index on a non-empty list is an error.
    pub fn delete_antecedent_at(
        &self,
        user_id: &str,
        index: usize,
    ) -> ServiceResult<ClinicalHistory> {
        let history = self.get_or_create_history(user_id)?;

        let Some(blob) = history.family_history.as_deref() else {
            return Ok(history);
        };

        let mut entries = split_entries(Some(blob));
        if entries.is_empty() {
            return Ok(history);
        }
        if index >= entries.len() {
            return Err(ServiceError::Validation(format!(
                "antecedent index {index} out of range (have {})",
                entries.len()
            )));
        }

        entries.remove(index);
        debug!(user_id, index, "antecedent deleted");

        let joined = join_entries(&entries);
        self.write_blob(&history, joined.as_deref())
    }

    /// Replace the antecedent at the given zero-based position with new
    /// text, stamped with the local edit time.
    pub fn edit_antecedent_at(
        &self,
        user_id: &str,
        index: usize,
        text: &str,
    ) -> ServiceResult<ClinicalHistory> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::Validation(
                "antecedent text must not be blank".into(),
            ));
        }

        let history = self.get_or_create_history(user_id)?;

        let mut entries = split_entries(history.family_history.as_deref());
        if entries.is_empty() {
            return Err(ServiceError::Validation("no antecedents to edit".into()));
        }
        if index >= entries.len() {
            return Err(ServiceError::Validation(format!(
                "antecedent index {index} out of range (have {})",
                entries.len()
            )));
        }

        entries[index] = format!(
            "[{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M"),
            trimmed
        );
        debug!(user_id, index, "antecedent edited");

        let joined = join_entries(&entries);
        self.write_blob(&history, joined.as_deref())
    }

    fn write_blob(
        &self,
        history: &ClinicalHistory,
        blob: Option<&str>,
    ) -> ServiceResult<ClinicalHistory> {
        let updated = self
            .db
            .update_family_history(&history.id, blob, history.version)?;
        if !updated {
            return Err(ServiceError::Conflict(
                "clinical history was modified concurrently".into(),
            ));
        }

        self.db
            .get_history(&history.id)?
            .ok_or_else(|| ServiceError::NotFound(format!("clinical history {}", history.id)))
    }
}

/// Split a family-history blob into entries on runs of blank lines.
/// Entries are trimmed; whitespace-only fragments are discarded.
pub fn split_entries(blob: Option<&str>) -> Vec<String> {
    let Some(blob) = blob else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut current = String::new();

    for line in blob.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                entries.push(current.trim().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        entries.push(current.trim().to_string());
    }

    entries
}

/// Rejoin entries into a blob, or `None` when the list is empty.
pub fn join_entries(entries: &[String]) -> Option<String> {
    if entries.is_empty() {
        None
    } else {
        Some(entries.join("\n\n"))
    }
}
