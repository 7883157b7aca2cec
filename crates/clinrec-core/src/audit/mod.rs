//! Hash-chained access log.
//!
//! Every recorded access links to its predecessor via SHA-256, so any
//! after-the-fact edit or deletion of a row breaks verification of the
//! whole suffix. Append-only; entries are never updated.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::{AccessLogEntry, Database};

/// Hash used for the first entry's `prev_hash`.
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Audit log errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Audit chain corrupt at seq {seq}: {reason}")]
    ChainCorrupt { seq: i64, reason: String },
}

pub type AuditResult<T> = Result<T, AuditError>;

/// Access-log manager over a database.
pub struct AuditTrail<'a> {
    db: &'a Database,
}

impl<'a> AuditTrail<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an access record, chaining it to the current tail.
    pub fn record(
        &self,
        actor_nif: &str,
        action: &str,
        detail: Option<&str>,
    ) -> AuditResult<AccessLogEntry> {
        let prev_hash = match self.db.last_access_row()? {
            Some(last) => last.entry_hash,
            None => GENESIS_HASH.to_string(),
        };

        let created_at = chrono::Utc::now().to_rfc3339();
        let entry_hash = hash_entry(&prev_hash, actor_nif, action, detail, &created_at);

        let seq = self.db.append_access_row(
            actor_nif,
            action,
            detail,
            &created_at,
            &prev_hash,
            &entry_hash,
        )?;

        Ok(AccessLogEntry {
            seq,
            actor_nif: actor_nif.to_string(),
            action: action.to_string(),
            detail: detail.map(|d| d.to_string()),
            created_at,
            prev_hash,
            entry_hash,
        })
    }

    /// Walk the whole chain and recompute every hash.
    /// Returns the number of verified entries.
    pub fn verify_chain(&self) -> AuditResult<usize> {
        let entries = self.db.list_access_rows()?;
        let mut expected_prev = GENESIS_HASH.to_string();

        for entry in &entries {
            if entry.prev_hash != expected_prev {
                return Err(AuditError::ChainCorrupt {
                    seq: entry.seq,
                    reason: "previous-hash link broken".into(),
                });
            }

            let recomputed = hash_entry(
                &entry.prev_hash,
                &entry.actor_nif,
                &entry.action,
                entry.detail.as_deref(),
                &entry.created_at,
            );
            if recomputed != entry.entry_hash {
                return Err(AuditError::ChainCorrupt {
                    seq: entry.seq,
                    reason: "entry hash mismatch".into(),
                });
            }

            expected_prev = entry.entry_hash.clone();
        }

        Ok(entries.len())
    }

    /// Entries recorded for one actor, newest first.
    pub fn entries_for_actor(&self, actor_nif: &str) -> AuditResult<Vec<AccessLogEntry>> {
        Ok(self.db.list_access_rows_for_actor(actor_nif)?)
    }
}

/// Hash one entry's content together with its predecessor's hash.
fn hash_entry(
    prev_hash: &str,
    actor_nif: &str,
    action: &str,
    detail: Option<&str>,
    created_at: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(actor_nif.as_bytes());
    hasher.update(b"|");
    hasher.update(action.as_bytes());
    hasher.update(b"|");
    hasher.update(detail.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(created_at.as_bytes());
    hex::encode(hasher.finalize())
}
