//! Clinical-data ingestion.
//!
//! Two inbound formats: free-text allergy lists (one allergy per line)
//! and blood-panel JSON exports from lab devices. Allergy ingestion is
//! strictly additive; a panel is persisted all-or-nothing after every
//! element has been validated.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use super::{ensure_history, require_user, ServiceError, ServiceResult};
use crate::db::Database;
use crate::models::{ClinicalDataEntry, KIND_ALLERGY_INTOLERANCE, KIND_BLOOD_ANALYSIS};

/// Ingestion service for clinical data entries.
///
/// Holds the database mutably because batch inserts run in a transaction.
pub struct ClinicalDataService<'a> {
    db: &'a mut Database,
}

impl<'a> ClinicalDataService<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Record a free-text allergy list, one allergy per line.
    ///
    /// Blank lines are skipped. Entries are appended; earlier submissions
    /// are never replaced or deduplicated. Returns the stored entries.
    pub fn record_allergies(
        &mut self,
        user_id: &str,
        raw: &str,
    ) -> ServiceResult<Vec<ClinicalDataEntry>> {
        let user = require_user(self.db, user_id)?;
        let history = ensure_history(self.db, &user)?;

        let entries: Vec<ClinicalDataEntry> = raw
            .split('\n')
            .map(|line| line.trim_end_matches('\r').trim())
            .filter(|line| !line.is_empty())
            .map(|line| ClinicalDataEntry::new_allergy(history.id.clone(), line.to_string()))
            .collect();

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        self.db.insert_entries(&entries)?;
        info!(user_id, count = entries.len(), "allergies recorded");
        Ok(entries)
    }

    /// Ingest a blood-panel JSON document.
    ///
    /// The document must be an array of objects, each carrying a numeric
    /// `value` (JSON number, or string using `.` or `,` as the decimal
    /// separator). The kind tag comes from `label`, then `key`, then a
    /// generic fallback. Every element is validated before anything is
    /// written, so a bad element persists nothing.
    pub fn record_blood_panel(
        &mut self,
        user_id: &str,
        payload: &str,
    ) -> ServiceResult<Vec<ClinicalDataEntry>> {
        let user = require_user(self.db, user_id)?;
        let history = ensure_history(self.db, &user)?;

        let document: Value = serde_json::from_str(payload)?;
        let items = document
            .as_array()
            .ok_or_else(|| ServiceError::Validation("blood panel must be a JSON array".into()))?;

        let mut entries = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            entries.push(parse_panel_item(&history.id, position, item)?);
        }

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        self.db.insert_entries(&entries)?;
        info!(user_id, count = entries.len(), "blood panel recorded");
        Ok(entries)
    }

    /// The stored allergy entries of a user, oldest first.
    pub fn list_allergies(&self, user_id: &str) -> ServiceResult<Vec<ClinicalDataEntry>> {
        let user = require_user(self.db, user_id)?;
        let history = ensure_history(self.db, &user)?;
        Ok(self
            .db
            .list_entries_by_kind(&history.id, KIND_ALLERGY_INTOLERANCE)?)
    }

    /// All clinical data entries of a user, oldest first.
    pub fn list_entries(&self, user_id: &str) -> ServiceResult<Vec<ClinicalDataEntry>> {
        let user = require_user(self.db, user_id)?;
        let history = ensure_history(self.db, &user)?;
        Ok(self.db.list_entries_for_history(&history.id)?)
    }

    /// Delete one of the user's own entries.
    pub fn delete_entry(&self, user_id: &str, entry_id: &str) -> ServiceResult<()> {
        let user = require_user(self.db, user_id)?;
        let history = ensure_history(self.db, &user)?;

        let entry = self
            .db
            .get_entry(entry_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("clinical data entry {entry_id}")))?;

        if entry.history_id != history.id {
            return Err(ServiceError::Unauthorized(
                "entry does not belong to the caller".into(),
            ));
        }

        self.db.delete_entry(entry_id)?;
        debug!(user_id, entry_id, "clinical data entry deleted");
        Ok(())
    }
}

fn parse_panel_item(
    history_id: &str,
    position: usize,
    item: &Value,
) -> ServiceResult<ClinicalDataEntry> {
    let object = item.as_object().ok_or_else(|| {
        ServiceError::Validation(format!("panel element {position} is not an object"))
    })?;

    let value = match object.get("value") {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            ServiceError::Validation(format!("panel element {position}: value out of range"))
        })?,
        Some(Value::String(s)) => parse_decimal(s).ok_or_else(|| {
            ServiceError::Validation(format!(
                "panel element {position}: value {s:?} is not numeric"
            ))
        })?,
        _ => {
            return Err(ServiceError::Validation(format!(
                "panel element {position} is missing a numeric value"
            )))
        }
    };

    let kind = object
        .get("label")
        .and_then(Value::as_str)
        .or_else(|| object.get("key").and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(KIND_BLOOD_ANALYSIS)
        .to_string();

    let unit = object
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let created_at = object
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(parse_panel_timestamp)
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    Ok(ClinicalDataEntry::new_measurement(
        history_id.to_string(),
        kind,
        value,
        unit,
        created_at,
    ))
}

/// Parse a decimal string accepting `,` as the decimal separator,
/// as exported by devices configured for European locales.
fn parse_decimal(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse().ok()
}

/// Accept RFC 3339 or a bare `YYYY-MM-DDTHH:MM:SS` local timestamp,
/// keeping the original string when it parses.
fn parse_panel_timestamp(s: &str) -> Option<String> {
    if DateTime::parse_from_rfc3339(s).is_ok() {
        return Some(s.to_string());
    }
    if NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok() {
        return Some(s.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn setup() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = User::new("12345678Z".into(), "Ana".into(), "García".into());
        db.insert_user(&user).unwrap();
        (db, user)
    }

    #[test]
    fn test_record_allergies_additive() {
        let (mut db, user) = setup();
        let mut service = ClinicalDataService::new(&mut db);

        service
            .record_allergies(&user.id, "penicillin\nlactose\n")
            .unwrap();
        service.record_allergies(&user.id, "pollen").unwrap();

        let allergies = service.list_allergies(&user.id).unwrap();
        assert_eq!(allergies.len(), 3);
        assert!(allergies.iter().all(|e| e.is_allergy()));
        assert!(allergies.iter().all(|e| e.value == 0.0));
    }

    #[test]
    fn test_record_allergies_skips_blank_lines() {
        let (mut db, user) = setup();
        let mut service = ClinicalDataService::new(&mut db);

        let stored = service
            .record_allergies(&user.id, "nuts\r\n\r\n  \ngluten\n\n")
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].note.as_deref(), Some("nuts"));
        assert_eq!(stored[1].note.as_deref(), Some("gluten"));
    }

    #[test]
    fn test_record_blood_panel() {
        let (mut db, user) = setup();
        let mut service = ClinicalDataService::new(&mut db);

        let payload = r#"[
            {"label": "glucose", "value": 92.5, "unit": "mg/dL",
             "createdAt": "2025-06-01T10:15:00+00:00"},
            {"key": "cholesterol", "value": "187,4", "unit": "mg/dL"},
            {"value": 5}
        ]"#;

        let stored = service.record_blood_panel(&user.id, payload).unwrap();
        assert_eq!(stored.len(), 3);

        assert_eq!(stored[0].kind, "glucose");
        assert_eq!(stored[0].value, 92.5);
        assert_eq!(stored[0].created_at, "2025-06-01T10:15:00+00:00");

        assert_eq!(stored[1].kind, "cholesterol");
        assert_eq!(stored[1].value, 187.4);

        assert_eq!(stored[2].kind, KIND_BLOOD_ANALYSIS);
        assert_eq!(stored[2].unit, "");
    }

    #[test]
    fn test_blood_panel_naive_timestamp_kept() {
        let (mut db, user) = setup();
        let mut service = ClinicalDataService::new(&mut db);

        let payload = r#"[{"label": "glucose", "value": 90,
                           "createdAt": "2025-06-01T10:15:00"}]"#;
        let stored = service.record_blood_panel(&user.id, payload).unwrap();
        assert_eq!(stored[0].created_at, "2025-06-01T10:15:00");
    }

    #[test]
    fn test_blood_panel_bad_timestamp_replaced() {
        let (mut db, user) = setup();
        let mut service = ClinicalDataService::new(&mut db);

        let payload = r#"[{"label": "glucose", "value": 90,
                           "createdAt": "last tuesday"}]"#;
        let stored = service.record_blood_panel(&user.id, payload).unwrap();
        assert_ne!(stored[0].created_at, "last tuesday");
        assert!(DateTime::parse_from_rfc3339(&stored[0].created_at).is_ok());
    }

    #[test]
    fn test_blood_panel_all_or_nothing() {
        let (mut db, user) = setup();
        let mut service = ClinicalDataService::new(&mut db);

        let payload = r#"[
            {"label": "glucose", "value": 92.5},
            {"label": "broken", "value": "not a number"}
        ]"#;

        let err = service.record_blood_panel(&user.id, payload).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(service.list_entries(&user.id).unwrap().is_empty());
    }

    #[test]
    fn test_blood_panel_must_be_array() {
        let (mut db, user) = setup();
        let mut service = ClinicalDataService::new(&mut db);

        let err = service
            .record_blood_panel(&user.id, r#"{"value": 1}"#)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service.record_blood_panel(&user.id, "not json").unwrap_err();
        assert!(matches!(err, ServiceError::Json(_)));
    }

    #[test]
    fn test_delete_entry_ownership() {
        let (mut db, user) = setup();
        let other = User::new("87654321X".into(), "Luis".into(), "Santos".into());
        db.insert_user(&other).unwrap();

        let mut service = ClinicalDataService::new(&mut db);
        let stored = service.record_allergies(&user.id, "nuts").unwrap();

        let err = service.delete_entry(&other.id, &stored[0].id).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        service.delete_entry(&user.id, &stored[0].id).unwrap();
        assert!(service.list_allergies(&user.id).unwrap().is_empty());

        let err = service.delete_entry(&user.id, &stored[0].id).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("187,4"), Some(187.4));
        assert_eq!(parse_decimal(" 92.5 "), Some(92.5));
        assert_eq!(parse_decimal("abc"), None);
    }
}
