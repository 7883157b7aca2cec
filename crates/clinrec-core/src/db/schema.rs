//! SQLite schema definition.

/// Complete database schema for clinrec.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Users and roles
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    nif TEXT NOT NULL UNIQUE,
    given_name TEXT NOT NULL,
    family_name TEXT NOT NULL,
    email TEXT,
    birth_date TEXT,                              -- YYYY-MM-DD
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_users_nif ON users(nif);
CREATE INDEX IF NOT EXISTS idx_users_birth_date ON users(birth_date);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id TEXT NOT NULL REFERENCES users(id),
    role TEXT NOT NULL CHECK (role IN ('physician', 'patient', 'admin')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, role)
);

-- ============================================================================
-- Assignment requests
-- ============================================================================

CREATE TABLE IF NOT EXISTS assignment_requests (
    id TEXT PRIMARY KEY,
    physician_id TEXT NOT NULL REFERENCES users(id),
    physician_nif TEXT NOT NULL,
    patient_id TEXT NOT NULL REFERENCES users(id),
    patient_nif TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'accepted', 'rejected', 'revoked')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_requests_physician ON assignment_requests(physician_nif, status);
CREATE INDEX IF NOT EXISTS idx_requests_patient ON assignment_requests(patient_nif, status);

-- ============================================================================
-- Physician-patient links
-- ============================================================================

CREATE TABLE IF NOT EXISTS physician_patient_links (
    id TEXT PRIMARY KEY,
    physician_id TEXT NOT NULL REFERENCES users(id),
    patient_id TEXT NOT NULL REFERENCES users(id),
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'revoked')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_links_physician ON physician_patient_links(physician_id, status);
CREATE INDEX IF NOT EXISTS idx_links_patient ON physician_patient_links(patient_id, status);

-- ============================================================================
-- Clinical histories (one per user, lazily created)
-- ============================================================================

CREATE TABLE IF NOT EXISTS clinical_histories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
    family_history TEXT,                          -- blank-line-delimited entries
    version INTEGER NOT NULL DEFAULT 0,           -- optimistic concurrency
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Clinical data entries (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS clinical_data_entries (
    id TEXT PRIMARY KEY,
    history_id TEXT NOT NULL REFERENCES clinical_histories(id),
    kind TEXT NOT NULL,
    value REAL NOT NULL,
    unit TEXT NOT NULL,
    note TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_entries_history ON clinical_data_entries(history_id);
CREATE INDEX IF NOT EXISTS idx_entries_kind ON clinical_data_entries(history_id, kind);

-- ============================================================================
-- Notifications
-- ============================================================================

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    kind TEXT NOT NULL,
    message TEXT NOT NULL,
    read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, read);

-- ============================================================================
-- Access log (append-only hash chain)
-- ============================================================================

CREATE TABLE IF NOT EXISTS access_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_nif TEXT NOT NULL,
    action TEXT NOT NULL,
    detail TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    prev_hash TEXT NOT NULL,                      -- hex SHA-256 of previous entry
    entry_hash TEXT NOT NULL                      -- hex SHA-256 over this entry
);

CREATE INDEX IF NOT EXISTS idx_access_log_actor ON access_log(actor_nif);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_role_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO users (id, nif, given_name, family_name) VALUES ('u1', '1A', 'A', 'B')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO user_roles (user_id, role) VALUES ('u1', 'nurse')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO user_roles (user_id, role) VALUES ('u1', 'patient')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_one_history_per_user() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO users (id, nif, given_name, family_name) VALUES ('u1', '1A', 'A', 'B')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO clinical_histories (id, user_id) VALUES ('h1', 'u1')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO clinical_histories (id, user_id) VALUES ('h2', 'u1')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_request_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO users (id, nif, given_name, family_name) VALUES ('u1', '1A', 'A', 'B')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO users (id, nif, given_name, family_name) VALUES ('u2', '2B', 'C', 'D')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO assignment_requests (id, physician_id, physician_nif, patient_id, patient_nif, status)
             VALUES ('r1', 'u1', '1A', 'u2', '2B', 'open')",
            [],
        );
        assert!(result.is_err());
    }
}
