//! User database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{AccountStatus, User};

impl Database {
    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (
                id, nif, given_name, family_name, email, birth_date,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                user.id,
                user.nif,
                user.given_name,
                user.family_name,
                user.email,
                user.birth_date,
                user.status.as_str(),
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing user's mutable fields.
    pub fn update_user(&self, user: &User) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE users SET
                given_name = ?2,
                family_name = ?3,
                email = ?4,
                birth_date = ?5,
                status = ?6,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.given_name,
                user.family_name,
                user.email,
                user.birth_date,
                user.status.as_str(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a user by internal id.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                r#"
                SELECT id, nif, given_name, family_name, email, birth_date,
                       status, created_at, updated_at
                FROM users
                WHERE id = ?
                "#,
                [id],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a user by NIF.
    pub fn get_user_by_nif(&self, nif: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                r#"
                SELECT id, nif, given_name, family_name, email, birth_date,
                       status, created_at, updated_at
                FROM users
                WHERE nif = ?
                "#,
                [nif],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Find a user by NIF and birth date (physician patient lookup).
    pub fn find_user_by_nif_and_birth_date(
        &self,
        nif: &str,
        birth_date: &str,
    ) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                r#"
                SELECT id, nif, given_name, family_name, email, birth_date,
                       status, created_at, updated_at
                FROM users
                WHERE nif = ? AND birth_date = ?
                "#,
                [nif, birth_date],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Delete a user.
    pub fn delete_user(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM users WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct UserRow {
    id: String,
    nif: String,
    given_name: String,
    family_name: String,
    email: Option<String>,
    birth_date: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        nif: row.get(1)?,
        given_name: row.get(2)?,
        family_name: row.get(3)?,
        email: row.get(4)?,
        birth_date: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let status = AccountStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown account status: {}", row.status)))?;

        Ok(User {
            id: row.id,
            nif: row.nif,
            given_name: row.given_name,
            family_name: row.family_name,
            email: row.email,
            birth_date: row.birth_date,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut user = User::new("12345678Z".into(), "Ana".into(), "García".into());
        user.email = Some("ana@example.com".into());
        user.birth_date = Some("1990-04-12".into());

        db.insert_user(&user).unwrap();

        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved.nif, "12345678Z");
        assert_eq!(retrieved.email, Some("ana@example.com".into()));
        assert_eq!(retrieved.status, AccountStatus::Active);
    }

    #[test]
    fn test_get_by_nif() {
        let db = setup_db();

        let user = User::new("12345678Z".into(), "Ana".into(), "García".into());
        db.insert_user(&user).unwrap();

        let retrieved = db.get_user_by_nif("12345678Z").unwrap().unwrap();
        assert_eq!(retrieved.id, user.id);

        assert!(db.get_user_by_nif("00000000X").unwrap().is_none());
    }

    #[test]
    fn test_nif_unique() {
        let db = setup_db();

        let user = User::new("12345678Z".into(), "Ana".into(), "García".into());
        db.insert_user(&user).unwrap();

        let dup = User::new("12345678Z".into(), "Otra".into(), "Persona".into());
        assert!(db.insert_user(&dup).is_err());
    }

    #[test]
    fn test_find_by_nif_and_birth_date() {
        let db = setup_db();

        let mut user = User::new("12345678Z".into(), "Ana".into(), "García".into());
        user.birth_date = Some("1990-04-12".into());
        db.insert_user(&user).unwrap();

        let found = db
            .find_user_by_nif_and_birth_date("12345678Z", "1990-04-12")
            .unwrap();
        assert!(found.is_some());

        let miss = db
            .find_user_by_nif_and_birth_date("12345678Z", "1991-01-01")
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_update_user() {
        let db = setup_db();

        let mut user = User::new("12345678Z".into(), "Ana".into(), "García".into());
        db.insert_user(&user).unwrap();

        user.email = Some("nueva@example.com".into());
        user.status = AccountStatus::Suspended;
        assert!(db.update_user(&user).unwrap());

        let retrieved = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(retrieved.email, Some("nueva@example.com".into()));
        assert_eq!(retrieved.status, AccountStatus::Suspended);
    }
}
