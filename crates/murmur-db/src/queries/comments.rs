use anyhow::Result;
use rusqlite::Row;

use super::{NOW, OptionalExt, placeholders};
use crate::Database;
use crate::models::{CommentRow, NewComment};

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.parent_id, c.author_id, u.email, u.avatar, \
     c.content, c.image, c.image_public_id, c.reactions_count, c.replies_count, c.is_deleted, \
     c.created_at, c.updated_at
     FROM comments c
     JOIN users u ON u.id = c.author_id";

/// Top-level comments worth showing: live ones, and deleted ones that still
/// anchor live replies.
const THREAD_FILTER: &str = "c.post_id = ?1
       AND c.parent_id IS NULL
       AND (c.is_deleted = 0 OR c.replies_count > 0)";

impl Database {
    /// Inserts the comment and bumps the post's comment count (top-level) or
    /// the parent's reply count (reply) in the same transaction.
    pub fn insert_comment(&self, comment: &NewComment<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO comments (id, post_id, parent_id, author_id, content, image, image_public_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    comment.id,
                    comment.post_id,
                    comment.parent_id,
                    comment.author_id,
                    comment.content,
                    comment.image,
                    comment.image_public_id
                ],
            )?;

            match comment.parent_id {
                Some(parent_id) => tx.execute(
                    &format!(
                        "UPDATE comments SET replies_count = replies_count + 1, updated_at = {NOW}
                         WHERE id = ?1"
                    ),
                    [parent_id],
                )?,
                None => tx.execute(
                    &format!(
                        "UPDATE posts SET comments_count = comments_count + 1, updated_at = {NOW}
                         WHERE id = ?1"
                    ),
                    [comment.post_id],
                )?,
            };

            tx.commit()?;
            Ok(())
        })
    }

    /// Fetches a comment including soft-deleted ones.
    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE c.id = ?1"))?;
            let row = stmt.query_row([id], comment_from_row).optional()?;
            Ok(row)
        })
    }

    /// Newest-first page of a post's top-level comments.
    pub fn list_top_level_comments(&self, post_id: &str, limit: u32, offset: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT}
                 WHERE {THREAD_FILTER}
                 ORDER BY c.created_at DESC, c.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![post_id, limit, offset], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_top_level_comments(&self, post_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM comments c WHERE {THREAD_FILTER}"),
                [post_id],
                |row| row.get(0),
            )?;
            Ok(total as u64)
        })
    }

    /// Batch-fetch live replies for a set of parent comments, oldest first.
    pub fn list_replies(&self, parent_ids: &[String]) -> Result<Vec<CommentRow>> {
        if parent_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT}
                 WHERE c.parent_id IN ({}) AND c.is_deleted = 0
                 ORDER BY c.created_at ASC, c.rowid ASC",
                placeholders(1, parent_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(parent_ids.iter()), comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flags the comment deleted and releases it from whichever counter it was
    /// contributing to. Returns `false` if it was already deleted.
    pub fn soft_delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let target: Option<(String, Option<String>)> = tx
                .query_row(
                    "SELECT post_id, parent_id FROM comments WHERE id = ?1 AND is_deleted = 0",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((post_id, parent_id)) = target else {
                return Ok(false);
            };

            tx.execute(
                &format!(
                    "UPDATE comments SET is_deleted = 1, deleted_at = {NOW}, updated_at = {NOW}
                     WHERE id = ?1"
                ),
                [id],
            )?;

            match parent_id {
                Some(parent_id) => tx.execute(
                    &format!(
                        "UPDATE comments SET replies_count = MAX(replies_count - 1, 0), updated_at = {NOW}
                         WHERE id = ?1"
                    ),
                    [&parent_id],
                )?,
                None => tx.execute(
                    &format!(
                        "UPDATE posts SET comments_count = MAX(comments_count - 1, 0), updated_at = {NOW}
                         WHERE id = ?1"
                    ),
                    [&post_id],
                )?,
            };

            tx.commit()?;
            Ok(true)
        })
    }
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        parent_id: row.get(2)?,
        author_id: row.get(3)?,
        author_email: row.get(4)?,
        author_avatar: row.get(5)?,
        content: row.get(6)?,
        image: row.get(7)?,
        image_public_id: row.get(8)?,
        reactions_count: row.get(9)?,
        replies_count: row.get(10)?,
        is_deleted: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
