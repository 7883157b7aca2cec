//! Clinical data entry model.

use serde::{Deserialize, Serialize};

/// Kind tag for allergy/intolerance entries.
pub const KIND_ALLERGY_INTOLERANCE: &str = "allergy_intolerance";

/// Default kind tag for unlabeled blood-analysis entries.
pub const KIND_BLOOD_ANALYSIS: &str = "blood_analysis";

/// Unit marker used for free-text entries where no measurement applies.
pub const UNIT_TEXT: &str = "text";

/// A single clinical data row linked to a history: a lab measurement
/// (numeric value + unit) or an allergy note (value 0, text in `note`).
/// Rows are append-only; ingestion never replaces earlier submissions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalDataEntry {
    /// Unique entry id
    pub id: String,
    /// Owning clinical history id
    pub history_id: String,
    /// Kind tag, e.g. `glucose`, `allergy_intolerance`
    pub kind: String,
    /// Numeric value (0.0 for text-only entries)
    pub value: f64,
    /// Unit of measure, `text` for text-only entries
    pub unit: String,
    /// Free-text note (allergy description, lab remark)
    pub note: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl ClinicalDataEntry {
    /// Create an allergy/intolerance entry from one line of user input.
    pub fn new_allergy(history_id: String, text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            history_id,
            kind: KIND_ALLERGY_INTOLERANCE.to_string(),
            value: 0.0,
            unit: UNIT_TEXT.to_string(),
            note: Some(text),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a measurement entry with an explicit timestamp.
    pub fn new_measurement(
        history_id: String,
        kind: String,
        value: f64,
        unit: String,
        created_at: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            history_id,
            kind,
            value,
            unit,
            note: None,
            created_at,
        }
    }

    /// Whether this entry is an allergy/intolerance note.
    pub fn is_allergy(&self) -> bool {
        self.kind == KIND_ALLERGY_INTOLERANCE
    }
}
