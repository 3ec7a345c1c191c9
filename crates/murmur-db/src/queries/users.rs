use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{NOW, OptionalExt};
use crate::Database;
use crate::models::{UserRow, UserSummaryRow};

const USER_COLUMNS: &str = "id, email, password, avatar, is_email_verified, last_login, \
     posts_count, followers_count, following_count, is_active, is_banned, banned_until, \
     deleted_at, created_at, updated_at";

impl Database {
    /// Returns `false` when the email is already registered.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)
                 ON CONFLICT(email) DO NOTHING",
                (id, email, password_hash),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn record_login(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!("UPDATE users SET last_login = {NOW}, updated_at = {NOW} WHERE id = ?1"),
                [id],
            )?;
            Ok(())
        })
    }

    /// Active users the given user does not follow yet, newest accounts first.
    pub fn suggested_users(&self, user_id: &str, limit: u32) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.avatar FROM users u
                 WHERE u.id <> ?1
                   AND u.is_active = 1
                   AND u.deleted_at IS NULL
                   AND NOT EXISTS (
                       SELECT 1 FROM follows f WHERE f.follower_id = ?1 AND f.followee_id = u.id
                   )
                 ORDER BY u.created_at DESC, u.rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], summary_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users the given user follows, most recently followed first.
    pub fn following_users(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.avatar FROM follows f
                 JOIN users u ON u.id = f.followee_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at DESC, f.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], summary_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        avatar: row.get(3)?,
        is_email_verified: row.get(4)?,
        last_login: row.get(5)?,
        posts_count: row.get(6)?,
        followers_count: row.get(7)?,
        following_count: row.get(8)?,
        is_active: row.get(9)?,
        is_banned: row.get(10)?,
        banned_until: row.get(11)?,
        deleted_at: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub(crate) fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<UserSummaryRow> {
    Ok(UserSummaryRow {
        id: row.get(0)?,
        email: row.get(1)?,
        avatar: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::queries::test_support::{db, user};

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db();
        assert!(db.create_user("u1", "same@example.com", "h").unwrap());
        assert!(!db.create_user("u2", "same@example.com", "h").unwrap());
        assert!(db.get_user_by_id("u2").unwrap().is_none());
    }

    #[test]
    fn suggestions_skip_self_followed_and_inactive() {
        let db = db();
        for id in ["me", "a", "b", "c"] {
            user(&db, id);
        }
        db.follow("me", "a").unwrap();
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE users SET is_active = 0 WHERE id = 'b'", [])?;
            Ok(())
        })
        .unwrap();

        let ids: Vec<String> = db
            .suggested_users("me", 5)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["c".to_string()]);
    }
}
