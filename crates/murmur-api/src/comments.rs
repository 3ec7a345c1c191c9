use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use murmur_db::models::{CommentRow, NewComment};
use murmur_types::api::{
    ApiResponse, CommentResponse, CreateCommentRequest, DeleteCommentResponse, Pagination,
    ReactionEntry,
};
use murmur_types::models::TargetKind;

use crate::error::{ApiError, AppJson, AppQuery};
use crate::middleware::AuthUser;
use crate::posts::visible_post;
use crate::state::{AppState, with_db};
use crate::{validate, views};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    pub post_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One page of a post's thread: top-level comments newest first, each with
/// its live replies oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    AppQuery(query): AppQuery<CommentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let raw_post_id = query
        .post_id
        .ok_or_else(|| ApiError::validation("Post ID is required"))?;
    let post_id = validate::id(&raw_post_id, "post")?;
    let (page, limit) = validate::page(query.page, query.limit);
    let offset = validate::offset(page, limit);
    let viewer = viewer.map(|u| u.id);

    visible_post(&state, post_id, viewer).await?;

    let id = post_id.to_string();
    let (top, total, replies, reactions) = with_db(&state, move |db| {
        let top = db.list_top_level_comments(&id, limit, offset)?;
        let total = db.count_top_level_comments(&id)?;
        let top_ids: Vec<String> = top.iter().map(|c| c.id.clone()).collect();
        let replies = db.list_replies(&top_ids)?;

        // Only needed to fill in the viewer's own reaction.
        let reactions = if viewer.is_some() {
            let all_ids: Vec<String> = top_ids
                .into_iter()
                .chain(replies.iter().map(|r| r.id.clone()))
                .collect();
            db.get_reactions_for_targets(TargetKind::Comment, &all_ids)?
        } else {
            vec![]
        };
        Ok((top, total, replies, reactions))
    })
    .await?;

    let comments = thread(top, replies, views::group_reactions(reactions), viewer);
    let pagination = Pagination::new(page, limit, total, comments.len());

    Ok(Json(
        ApiResponse::ok(comments)
            .with_message("Comments fetched successfully")
            .with_pagination(pagination),
    ))
}

fn thread(
    top: Vec<CommentRow>,
    replies: Vec<CommentRow>,
    reactions: HashMap<String, Vec<ReactionEntry>>,
    viewer: Option<Uuid>,
) -> Vec<CommentResponse> {
    let mut by_parent: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    for reply in replies {
        let Some(parent) = reply.parent_id.clone() else {
            continue;
        };
        let entries = reactions.get(&reply.id).map(Vec::as_slice);
        by_parent
            .entry(parent)
            .or_default()
            .push(views::comment(reply, entries, viewer));
    }

    top.into_iter()
        .map(|row| {
            let replies = by_parent.remove(&row.id).unwrap_or_default();
            let entries = reactions.get(&row.id).map(Vec::as_slice);
            let mut view = views::comment(row, entries, viewer);
            view.replies = Some(replies);
            view
        })
        .collect()
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validate::comment_content(&req.content)?;
    let post_id = validate::id(&req.post_id, "post")?;
    let image = validate::image_url(req.image)?;
    let image_public_id = validate::optional_text(req.image_public_id);
    let parent_id = req
        .parent_id
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(|p| validate::id(p, "parent comment"))
        .transpose()?;

    visible_post(&state, post_id, Some(user.id)).await?;

    // Threads are one level deep: a reply to a reply hangs off the root.
    let root_id = match parent_id {
        None => None,
        Some(parent_id) => {
            let id = parent_id.to_string();
            let parent = with_db(&state, move |db| db.get_comment(&id))
                .await?
                .filter(|c| c.post_id == post_id.to_string())
                .ok_or_else(|| ApiError::not_found("Parent comment not found"))?;
            if parent.is_deleted {
                return Err(ApiError::bad_request("Cannot reply to a deleted comment"));
            }
            match parent.parent_id {
                None => Some(parent.id),
                Some(root_id) => {
                    let id = root_id.clone();
                    let root = with_db(&state, move |db| db.get_comment(&id))
                        .await?
                        .ok_or_else(|| ApiError::not_found("Parent comment not found"))?;
                    if root.is_deleted {
                        return Err(ApiError::bad_request("Cannot reply to a deleted comment"));
                    }
                    Some(root_id)
                }
            }
        }
    };

    let comment_id = Uuid::new_v4();
    let is_reply = root_id.is_some();
    let (id, post, author_id) = (comment_id.to_string(), post_id.to_string(), user.id.to_string());
    let row = with_db(&state, move |db| {
        db.insert_comment(&NewComment {
            id: &id,
            post_id: &post,
            parent_id: root_id.as_deref(),
            author_id: &author_id,
            content: &content,
            image: image.as_deref(),
            image_public_id: image_public_id.as_deref(),
        })?;
        db.get_comment(&id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("comment {comment_id} missing after insert"))?;

    info!("User {} commented {} on post {}", user.id, comment_id, post_id);

    let message = if is_reply {
        "Reply created successfully"
    } else {
        "Comment created successfully"
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(views::comment(row, None, Some(user.id))).with_message(message)),
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comment_id = validate::id(&id, "comment")?;

    let id = comment_id.to_string();
    let comment = with_db(&state, move |db| db.get_comment(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    if comment.author_id != user.id.to_string() {
        return Err(ApiError::forbidden("You can only delete your own comments"));
    }
    if comment.is_deleted {
        return Err(ApiError::bad_request("This comment has already been deleted"));
    }

    let has_replies = comment.replies_count > 0;
    let id = comment.id;
    if !with_db(&state, move |db| db.soft_delete_comment(&id)).await? {
        return Err(ApiError::bad_request("This comment has already been deleted"));
    }

    info!("User {} deleted comment {}", user.id, comment_id);

    let message = if has_replies {
        "Comment marked as deleted. Replies preserved."
    } else {
        "Comment deleted."
    };
    Ok(Json(
        ApiResponse::ok(DeleteCommentResponse {
            comment_id,
            has_replies,
            message: message.to_string(),
        })
        .with_message("Comment deleted successfully"),
    ))
}
