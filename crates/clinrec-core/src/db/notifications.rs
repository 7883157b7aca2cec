//! Notification database operations.

use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::{Notification, NotificationKind};

impl Database {
    /// Insert a notification.
    pub fn insert_notification(&self, notification: &Notification) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO notifications (
                id, user_id, kind, message, read, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                notification.id,
                notification.user_id,
                notification.kind.as_str(),
                notification.message,
                notification.read as i64,
                notification.created_at,
            ],
        )?;
        Ok(())
    }

    /// All notifications for a user, newest first.
    pub fn list_notifications_for_user(&self, user_id: &str) -> DbResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, kind, message, read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map([user_id], map_notification_row)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?.try_into()?);
        }
        Ok(notifications)
    }

    /// Number of unread notifications for a user.
    pub fn count_unread_notifications(&self, user_id: &str) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Mark a notification as read.
    pub fn mark_notification_read(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("UPDATE notifications SET read = 1 WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Mark every notification of a user as read. Returns the number of
    /// notifications flipped.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0",
            [user_id],
        )?;
        Ok(rows_affected)
    }

    /// Delete a notification.
    pub fn delete_notification(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM notifications WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Get a notification by id.
    pub fn get_notification(&self, id: &str) -> DbResult<Option<Notification>> {
        use rusqlite::OptionalExtension;
        self.conn
            .query_row(
                r#"
                SELECT id, user_id, kind, message, read, created_at
                FROM notifications
                WHERE id = ?
                "#,
                [id],
                map_notification_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }
}

/// Intermediate row struct for database mapping.
struct NotificationRow {
    id: String,
    user_id: String,
    kind: String,
    message: String,
    read: i64,
    created_at: String,
}

fn map_notification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        message: row.get(3)?,
        read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DbError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::parse(&row.kind).ok_or_else(|| {
            DbError::Constraint(format!("Unknown notification kind: {}", row.kind))
        })?;

        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind,
            message: row.message,
            read: row.read != 0,
            created_at: row.created_at,
        })
    }
}
