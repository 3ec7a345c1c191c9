//! Turning DB rows into response bodies.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use murmur_db::models::{CommentRow, PostRow, ReactionRow, UserRow, UserSummaryRow};
use murmur_types::api::{CommentResponse, PostResponse, ReactionEntry, UserDto, UserSummary};
use murmur_types::models::{Privacy, ReactionKind};

pub const DELETED_COMMENT_TEXT: &str = "This comment is deleted";

pub(crate) fn uuid(raw: &str, field: &str, owner: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on '{}': {}", field, raw, owner, e);
        Uuid::default()
    })
}

pub(crate) fn timestamp(raw: &str, field: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand may use SQLite's datetime() format.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}' on '{}': {}", field, raw, owner, e);
            DateTime::default()
        })
}

pub(crate) fn user(row: &UserRow) -> UserDto {
    UserDto {
        id: uuid(&row.id, "id", &row.id),
        email: row.email.clone(),
        is_email_verified: row.is_email_verified,
        avatar: row.avatar.clone(),
        posts_count: row.posts_count,
        followers_count: row.followers_count,
        following_count: row.following_count,
        last_login: row.last_login.as_deref().map(|t| timestamp(t, "last_login", &row.id)),
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        updated_at: timestamp(&row.updated_at, "updated_at", &row.id),
    }
}

pub(crate) fn summary(id: &str, email: &str, avatar: Option<&str>) -> UserSummary {
    UserSummary {
        id: uuid(id, "user id", email),
        email: email.to_string(),
        avatar: avatar.map(str::to_owned),
    }
}

pub(crate) fn summaries(rows: Vec<UserSummaryRow>) -> Vec<UserSummary> {
    rows.into_iter()
        .map(|row| summary(&row.id, &row.email, row.avatar.as_deref()))
        .collect()
}

/// Group reaction rows by target id, dropping rows with unknown kinds.
pub(crate) fn group_reactions(rows: Vec<ReactionRow>) -> HashMap<String, Vec<ReactionEntry>> {
    let mut grouped: HashMap<String, Vec<ReactionEntry>> = HashMap::new();
    for row in rows {
        let kind = match row.kind.parse::<ReactionKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Skipping reaction on '{}': {}", row.target_id, e);
                continue;
            }
        };
        let user = summary(&row.user_id, &row.user_email, row.user_avatar.as_deref());
        grouped
            .entry(row.target_id)
            .or_default()
            .push(ReactionEntry { user, kind });
    }
    grouped
}

fn viewer_reaction(entries: &[ReactionEntry], viewer: Option<Uuid>) -> Option<ReactionKind> {
    let viewer = viewer?;
    entries.iter().find(|e| e.user.id == viewer).map(|e| e.kind)
}

pub(crate) fn post(row: PostRow, reactions: Vec<ReactionEntry>, viewer: Option<Uuid>) -> PostResponse {
    let privacy = row.privacy.parse::<Privacy>().unwrap_or_else(|e| {
        warn!("Post '{}' has {}; treating as private", row.id, e);
        Privacy::Private
    });

    PostResponse {
        id: uuid(&row.id, "id", &row.id),
        author: summary(&row.author_id, &row.author_email, row.author_avatar.as_deref()),
        current_user_reaction: viewer_reaction(&reactions, viewer),
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        updated_at: timestamp(&row.updated_at, "updated_at", &row.id),
        content: row.content,
        image: row.image,
        image_public_id: row.image_public_id,
        privacy,
        reactions,
        reactions_count: row.reactions_count,
        comments_count: row.comments_count,
        shares_count: row.shares_count,
    }
}

pub(crate) fn posts(rows: Vec<PostRow>, reactions: Vec<ReactionRow>, viewer: Option<Uuid>) -> Vec<PostResponse> {
    let mut grouped = group_reactions(reactions);
    rows.into_iter()
        .map(|row| {
            let entries = grouped.remove(&row.id).unwrap_or_default();
            post(row, entries, viewer)
        })
        .collect()
}

/// A deleted comment keeps its place in the thread but loses its author,
/// text and image.
pub(crate) fn comment(
    row: CommentRow,
    reactions: Option<&[ReactionEntry]>,
    viewer: Option<Uuid>,
) -> CommentResponse {
    let (content, image, image_public_id, author) = if row.is_deleted {
        (DELETED_COMMENT_TEXT.to_string(), None, None, None)
    } else {
        let author = summary(&row.author_id, &row.author_email, row.author_avatar.as_deref());
        (row.content, row.image, row.image_public_id, Some(author))
    };

    CommentResponse {
        id: uuid(&row.id, "id", &row.id),
        post_id: uuid(&row.post_id, "post_id", &row.id),
        parent_id: row.parent_id.as_deref().map(|p| uuid(p, "parent_id", &row.id)),
        content,
        image,
        image_public_id,
        author,
        reactions_count: row.reactions_count,
        replies_count: row.replies_count,
        is_deleted: row.is_deleted,
        current_user_reaction: reactions.and_then(|r| viewer_reaction(r, viewer)),
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        updated_at: timestamp(&row.updated_at, "updated_at", &row.id),
        replies: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_row(deleted: bool) -> CommentRow {
        CommentRow {
            id: Uuid::new_v4().to_string(),
            post_id: Uuid::new_v4().to_string(),
            parent_id: None,
            author_id: Uuid::new_v4().to_string(),
            author_email: "a@b.co".into(),
            author_avatar: None,
            content: "original".into(),
            image: Some("/uploads/comment/x.png".into()),
            image_public_id: Some("comment/x".into()),
            reactions_count: 0,
            replies_count: 2,
            is_deleted: deleted,
            created_at: "2026-01-02T03:04:05.678Z".into(),
            updated_at: "2026-01-02 03:04:05".into(),
        }
    }

    #[test]
    fn deleted_comment_is_a_placeholder() {
        let view = comment(comment_row(true), None, None);
        assert_eq!(view.content, DELETED_COMMENT_TEXT);
        assert!(view.author.is_none());
        assert!(view.image.is_none());
        assert!(view.is_deleted);
        assert_eq!(view.replies_count, 2);
    }

    #[test]
    fn live_comment_keeps_author_and_parses_both_timestamp_forms() {
        let view = comment(comment_row(false), None, None);
        assert_eq!(view.content, "original");
        assert_eq!(view.author.unwrap().email, "a@b.co");
        assert_eq!(view.created_at.to_rfc3339(), "2026-01-02T03:04:05.678+00:00");
        assert_eq!(view.updated_at.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn viewer_reaction_is_picked_out() {
        let viewer = Uuid::new_v4();
        let rows = vec![
            ReactionRow {
                target_id: "p1".into(),
                user_id: Uuid::new_v4().to_string(),
                user_email: "other@b.co".into(),
                user_avatar: None,
                kind: "like".into(),
            },
            ReactionRow {
                target_id: "p1".into(),
                user_id: viewer.to_string(),
                user_email: "me@b.co".into(),
                user_avatar: None,
                kind: "haha".into(),
            },
            ReactionRow {
                target_id: "p1".into(),
                user_id: viewer.to_string(),
                user_email: "me@b.co".into(),
                user_avatar: None,
                kind: "bogus".into(),
            },
        ];
        let grouped = group_reactions(rows);
        let entries = &grouped["p1"];
        assert_eq!(entries.len(), 2);
        assert_eq!(viewer_reaction(entries, Some(viewer)), Some(ReactionKind::Haha));
        assert_eq!(viewer_reaction(entries, None), None);
    }
}
