//! Role-link database operations.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::Role;

impl Database {
    /// Grant a role to a user. Idempotent: an existing link is left as-is.
    pub fn grant_role(&self, user_id: &str, role: Role) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
            params![user_id, role.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Remove a role from a user.
    pub fn revoke_role(&self, user_id: &str, role: Role) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role = ?2",
            params![user_id, role.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Whether the user holds the given role.
    pub fn has_role(&self, user_id: &str, role: Role) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM user_roles WHERE user_id = ?1 AND role = ?2",
            params![user_id, role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All roles held by a user.
    pub fn roles_for_user(&self, user_id: &str) -> DbResult<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT role FROM user_roles WHERE user_id = ? ORDER BY role")?;

        let rows = stmt.query_map([user_id], |row| row.get::<_, String>(0))?;

        let mut roles = Vec::new();
        for row in rows {
            // Rows are constrained by the schema CHECK; unknown values only
            // appear if the table was tampered with outside the app.
            if let Some(role) = Role::parse(&row?) {
                roles.push(role);
            }
        }
        Ok(roles)
    }
}
