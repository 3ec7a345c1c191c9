use anyhow::Result;
use rusqlite::Transaction;

use super::NOW;
use crate::Database;

/// Whether a follow/unfollow actually changed the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowChange {
    Applied,
    Unchanged,
}

impl Database {
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> Result<FollowChange> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO follows (follower_id, followee_id) VALUES (?1, ?2)",
                (follower_id, followee_id),
            )?;
            if inserted == 0 {
                return Ok(FollowChange::Unchanged);
            }
            recount_follows(&tx, follower_id, followee_id)?;
            tx.commit()?;
            Ok(FollowChange::Applied)
        })
    }

    pub fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<FollowChange> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                (follower_id, followee_id),
            )?;
            if removed == 0 {
                return Ok(FollowChange::Unchanged);
            }
            recount_follows(&tx, follower_id, followee_id)?;
            tx.commit()?;
            Ok(FollowChange::Applied)
        })
    }

    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)",
                (follower_id, followee_id),
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }
}

/// Follower counts are derived from the edge table, never incremented blindly.
fn recount_follows(tx: &Transaction<'_>, follower_id: &str, followee_id: &str) -> Result<()> {
    tx.execute(
        &format!(
            "UPDATE users SET following_count =
                 (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                 updated_at = {NOW}
             WHERE id = ?1"
        ),
        [follower_id],
    )?;
    tx.execute(
        &format!(
            "UPDATE users SET followers_count =
                 (SELECT COUNT(*) FROM follows WHERE followee_id = ?1),
                 updated_at = {NOW}
             WHERE id = ?1"
        ),
        [followee_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::FollowChange;
    use crate::queries::test_support::{db, user};

    #[test]
    fn follow_counts_mirror_edges() {
        let db = db();
        for id in ["a", "b", "c"] {
            user(&db, id);
        }

        assert_eq!(db.follow("a", "b").unwrap(), FollowChange::Applied);
        assert_eq!(db.follow("c", "b").unwrap(), FollowChange::Applied);
        assert_eq!(db.follow("a", "b").unwrap(), FollowChange::Unchanged);

        let b = db.get_user_by_id("b").unwrap().unwrap();
        assert_eq!(b.followers_count, 2);
        let a = db.get_user_by_id("a").unwrap().unwrap();
        assert_eq!(a.following_count, 1);
        assert!(db.is_following("a", "b").unwrap());

        assert_eq!(db.unfollow("a", "b").unwrap(), FollowChange::Applied);
        assert_eq!(db.unfollow("a", "b").unwrap(), FollowChange::Unchanged);

        let b = db.get_user_by_id("b").unwrap().unwrap();
        assert_eq!(b.followers_count, 1);
        let a = db.get_user_by_id("a").unwrap().unwrap();
        assert_eq!(a.following_count, 0);
    }

    #[test]
    fn following_list_orders_latest_first() {
        let db = db();
        for id in ["me", "x", "y"] {
            user(&db, id);
        }
        db.follow("me", "x").unwrap();
        db.follow("me", "y").unwrap();

        let ids: Vec<String> = db
            .following_users("me")
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["y".to_string(), "x".to_string()]);
    }
}
