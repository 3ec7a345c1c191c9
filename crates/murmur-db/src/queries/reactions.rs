use anyhow::Result;
use rusqlite::params_from_iter;
use tracing::warn;

use murmur_types::models::{ReactionKind, TargetKind, ToggleAction, decide_toggle};

use super::{OptionalExt, placeholders};
use crate::Database;
use crate::models::{ReactionRow, ReactorRow};

/// Outcome of a reaction toggle, read back inside the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleResult {
    pub action: ToggleAction,
    /// The user's reaction after the toggle.
    pub current: Option<ReactionKind>,
    pub reactions_count: i64,
}

fn table(target: TargetKind) -> &'static str {
    match target {
        TargetKind::Post => "posts",
        TargetKind::Comment => "comments",
    }
}

impl Database {
    /// Toggle `user_id`'s reaction on a live post or comment.
    ///
    /// Returns `None` if the target does not exist or is soft-deleted.
    pub fn toggle_reaction(
        &self,
        target: TargetKind,
        target_id: &str,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<Option<ToggleResult>> {
        let table = table(target);
        let target_type = target.as_str();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let live: bool = tx.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1 AND is_deleted = 0)"),
                [target_id],
                |row| row.get(0),
            )?;
            if !live {
                return Ok(None);
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT kind FROM reactions
                     WHERE target_type = ?1 AND target_id = ?2 AND user_id = ?3",
                    (target_type, target_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;
            let action = match existing {
                None => decide_toggle(None, kind),
                Some(raw) => match raw.parse::<ReactionKind>() {
                    Ok(previous) => decide_toggle(Some(previous), kind),
                    Err(e) => {
                        warn!("Overwriting reaction by {} on {}: {}", user_id, target_id, e);
                        ToggleAction::Changed
                    }
                },
            };
            let current = match action {
                ToggleAction::Added => {
                    tx.execute(
                        "INSERT INTO reactions (target_type, target_id, user_id, kind)
                         VALUES (?1, ?2, ?3, ?4)",
                        (target_type, target_id, user_id, kind.as_str()),
                    )?;
                    Some(kind)
                }
                ToggleAction::Removed => {
                    tx.execute(
                        "DELETE FROM reactions
                         WHERE target_type = ?1 AND target_id = ?2 AND user_id = ?3",
                        (target_type, target_id, user_id),
                    )?;
                    None
                }
                ToggleAction::Changed => {
                    tx.execute(
                        "UPDATE reactions SET kind = ?4
                         WHERE target_type = ?1 AND target_id = ?2 AND user_id = ?3",
                        (target_type, target_id, user_id, kind.as_str()),
                    )?;
                    Some(kind)
                }
            };

            // Counter mirrors the rows; recomputed rather than incremented.
            tx.execute(
                &format!(
                    "UPDATE {table} SET reactions_count =
                         (SELECT COUNT(*) FROM reactions WHERE target_type = ?1 AND target_id = ?2)
                     WHERE id = ?2"
                ),
                (target_type, target_id),
            )?;
            let reactions_count: i64 = tx.query_row(
                &format!("SELECT reactions_count FROM {table} WHERE id = ?1"),
                [target_id],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok(Some(ToggleResult {
                action,
                current,
                reactions_count,
            }))
        })
    }

    /// Batch-fetch reactions for a set of targets of one kind.
    pub fn get_reactions_for_targets(
        &self,
        target: TargetKind,
        target_ids: &[String],
    ) -> Result<Vec<ReactionRow>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT r.target_id, r.user_id, u.email, u.avatar, r.kind FROM reactions r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.target_type = ?1 AND r.target_id IN ({})
                 ORDER BY r.created_at ASC",
                placeholders(2, target_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;

            let params = std::iter::once(target.as_str()).chain(target_ids.iter().map(String::as_str));
            let rows = stmt
                .query_map(params_from_iter(params), |row| {
                    Ok(ReactionRow {
                        target_id: row.get(0)?,
                        user_id: row.get(1)?,
                        user_email: row.get(2)?,
                        user_avatar: row.get(3)?,
                        kind: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Every user who reacted to the target, with their reaction kind.
    pub fn get_reactors(&self, target: TargetKind, target_id: &str) -> Result<Vec<ReactorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.avatar, r.kind FROM reactions r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.target_type = ?1 AND r.target_id = ?2
                 ORDER BY r.created_at ASC",
            )?;
            let rows = stmt
                .query_map((target.as_str(), target_id), |row| {
                    Ok(ReactorRow {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        avatar: row.get(2)?,
                        kind: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
