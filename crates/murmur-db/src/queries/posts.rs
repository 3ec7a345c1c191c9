use anyhow::Result;
use rusqlite::Row;

use super::{NOW, OptionalExt};
use crate::Database;
use crate::models::{NewPost, PostRow};

const POST_SELECT: &str = "SELECT p.id, p.author_id, u.email, u.avatar, p.content, p.image, \
     p.image_public_id, p.privacy, p.reactions_count, p.comments_count, p.shares_count, \
     p.created_at, p.updated_at
     FROM posts p
     JOIN users u ON u.id = p.author_id";

/// Live posts visible to `?1`: every public post plus the viewer's own private ones.
/// A NULL viewer matches no author, leaving only public posts.
const FEED_FILTER: &str = "p.is_deleted = 0
       AND (p.privacy = 'public' OR p.author_id = ?1)";

impl Database {
    pub fn insert_post(&self, post: &NewPost<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO posts (id, author_id, content, image, image_public_id, privacy)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    post.id,
                    post.author_id,
                    post.content,
                    post.image,
                    post.image_public_id,
                    post.privacy
                ],
            )?;
            tx.execute(
                &format!(
                    "UPDATE users SET posts_count = posts_count + 1, updated_at = {NOW} WHERE id = ?1"
                ),
                [post.author_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// A live (not soft-deleted) post, regardless of privacy.
    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.id = ?1 AND p.is_deleted = 0"))?;
            let row = stmt.query_row([id], post_from_row).optional()?;
            Ok(row)
        })
    }

    /// Newest-first page of the feed as seen by `viewer_id`.
    pub fn list_feed(&self, viewer_id: Option<&str>, limit: u32, offset: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT}
                 WHERE {FEED_FILTER}
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![viewer_id, limit, offset], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_feed(&self, viewer_id: Option<&str>) -> Result<u64> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM posts p WHERE {FEED_FILTER}"),
                [viewer_id],
                |row| row.get(0),
            )?;
            Ok(total as u64)
        })
    }

    /// Overwrites whichever fields are given. Returns `false` if the post is gone.
    pub fn update_post(&self, id: &str, content: Option<&str>, privacy: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                &format!(
                    "UPDATE posts SET
                         content = COALESCE(?2, content),
                         privacy = COALESCE(?3, privacy),
                         updated_at = {NOW}
                     WHERE id = ?1 AND is_deleted = 0"
                ),
                rusqlite::params![id, content, privacy],
            )?;
            Ok(updated == 1)
        })
    }

    /// Flags the post deleted and releases it from the author's post count.
    /// Returns `false` if it was already deleted or never existed.
    pub fn soft_delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let author_id: Option<String> = tx
                .query_row(
                    "SELECT author_id FROM posts WHERE id = ?1 AND is_deleted = 0",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(author_id) = author_id else {
                return Ok(false);
            };

            tx.execute(
                &format!(
                    "UPDATE posts SET is_deleted = 1, deleted_at = {NOW}, updated_at = {NOW}
                     WHERE id = ?1"
                ),
                [id],
            )?;
            tx.execute(
                &format!(
                    "UPDATE users SET posts_count = MAX(posts_count - 1, 0), updated_at = {NOW}
                     WHERE id = ?1"
                ),
                [&author_id],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_email: row.get(2)?,
        author_avatar: row.get(3)?,
        content: row.get(4)?,
        image: row.get(5)?,
        image_public_id: row.get(6)?,
        privacy: row.get(7)?,
        reactions_count: row.get(8)?,
        comments_count: row.get(9)?,
        shares_count: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::models::NewPost;
    use crate::queries::test_support::{db, post, user};

    #[test]
    fn feed_hides_other_users_private_posts() {
        let db = db();
        user(&db, "alice");
        user(&db, "bob");
        post(&db, "p1", "alice");
        db.insert_post(&NewPost {
            id: "p2",
            author_id: "alice",
            content: "secret",
            image: None,
            image_public_id: None,
            privacy: "private",
        })
        .unwrap();

        assert_eq!(db.count_feed(None).unwrap(), 1);
        assert_eq!(db.count_feed(Some("bob")).unwrap(), 1);
        assert_eq!(db.count_feed(Some("alice")).unwrap(), 2);

        let own = db.list_feed(Some("alice"), 10, 0).unwrap();
        assert_eq!(own[0].id, "p2");
        assert_eq!(own[0].author_email, "alice@example.com");
    }

    #[test]
    fn soft_delete_releases_post_count_once() {
        let db = db();
        user(&db, "alice");
        post(&db, "p1", "alice");
        assert_eq!(db.get_user_by_id("alice").unwrap().unwrap().posts_count, 1);

        assert!(db.soft_delete_post("p1").unwrap());
        assert!(!db.soft_delete_post("p1").unwrap());

        assert!(db.get_post("p1").unwrap().is_none());
        assert_eq!(db.get_user_by_id("alice").unwrap().unwrap().posts_count, 0);
        assert_eq!(db.count_feed(Some("alice")).unwrap(), 0);
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let db = db();
        user(&db, "alice");
        post(&db, "p1", "alice");

        assert!(db.update_post("p1", None, Some("private")).unwrap());
        let row = db.get_post("p1").unwrap().unwrap();
        assert_eq!(row.content, "hello");
        assert_eq!(row.privacy, "private");
    }
}
