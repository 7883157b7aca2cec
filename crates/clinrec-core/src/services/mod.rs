//! Business services over the database layer.

mod antecedents;
mod assignments;
mod clinical_data;

pub use antecedents::*;
pub use assignments::*;
pub use clinical_data::*;

use thiserror::Error;

use crate::db::{Database, DbResult};
use crate::models::{ClinicalHistory, User};

/// Service-level errors, one variant per failure class callers can
/// distinguish.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Resolve a user by id, mapping absence to [`ServiceError::NotFound`].
pub(crate) fn require_user(db: &Database, user_id: &str) -> ServiceResult<User> {
    db.get_user(user_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("user {user_id}")))
}

/// Fetch the user's history, creating an empty one on first touch.
/// The only creation path for a history record.
pub(crate) fn ensure_history(db: &Database, user: &User) -> DbResult<ClinicalHistory> {
    if let Some(history) = db.get_history_by_user(&user.id)? {
        return Ok(history);
    }
    let history = ClinicalHistory::new(user.id.clone());
    db.insert_history(&history)?;
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_history_creates_once() {
        let db = Database::open_in_memory().unwrap();
        let user = User::new("12345678Z".into(), "Ana".into(), "García".into());
        db.insert_user(&user).unwrap();

        let first = ensure_history(&db, &user).unwrap();
        let second = ensure_history(&db, &user).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_require_user_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = require_user(&db, "missing").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
