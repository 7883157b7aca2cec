//! Clinical history model.

use serde::{Deserialize, Serialize};

/// Per-user clinical history record (exactly one per user, created lazily).
///
/// Family-history antecedents live inside `family_history` as free text,
/// one entry per blank-line-delimited block. `version` is bumped on every
/// mutation so concurrent editors fail fast instead of overwriting each
/// other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalHistory {
    /// Unique history id
    pub id: String,
    /// Owning user id (unique)
    pub user_id: String,
    /// Family-history blob, None when nothing recorded
    pub family_history: Option<String>,
    /// Optimistic-concurrency counter
    pub version: i64,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl ClinicalHistory {
    /// Create an empty history for a user.
    pub fn new(user_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            family_history: None,
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
