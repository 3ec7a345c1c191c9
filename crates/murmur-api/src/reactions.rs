use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use murmur_types::api::{
    ApiResponse, ReactionGroups, ReactionUsersResponse, ToggleReactionRequest, ToggleReactionResponse,
};
use murmur_types::models::{ReactionKind, TargetKind};

use crate::error::{ApiError, AppJson, AppQuery};
use crate::middleware::AuthUser;
use crate::posts::visible_post;
use crate::state::{AppState, with_db};
use crate::{validate, views};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsQuery {
    pub target_type: Option<String>,
    pub reaction_type: Option<String>,
}

/// Check the target exists and sits on a post the viewer can see.
/// `live_only` rejects soft-deleted comments.
async fn ensure_target(
    state: &AppState,
    target: TargetKind,
    target_id: Uuid,
    viewer: Option<Uuid>,
    live_only: bool,
) -> Result<(), ApiError> {
    match target {
        TargetKind::Post => {
            visible_post(state, target_id, viewer).await?;
        }
        TargetKind::Comment => {
            let id = target_id.to_string();
            let comment = with_db(state, move |db| db.get_comment(&id))
                .await?
                .filter(|c| !(live_only && c.is_deleted))
                .ok_or_else(|| ApiError::not_found("Comment not found"))?;
            let post_id = views::uuid(&comment.post_id, "post_id", &comment.id);
            visible_post(state, post_id, viewer)
                .await
                .map_err(|_| ApiError::not_found("Comment not found"))?;
        }
    }
    Ok(())
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = validate::target_kind(&req.target_type)?;
    let kind = validate::reaction_kind(&req.kind)?;
    let target_id = validate::id(&req.target_id, target.as_str())?;

    ensure_target(&state, target, target_id, Some(user.id), true).await?;

    let (tid, uid) = (target_id.to_string(), user.id.to_string());
    let result = with_db(&state, move |db| db.toggle_reaction(target, &tid, &uid, kind))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", target.label())))?;

    debug!(
        "User {} {} {} on {} {}",
        user.id,
        result.action.as_str(),
        kind,
        target,
        target_id
    );

    Ok(Json(
        ApiResponse::ok(ToggleReactionResponse {
            target_id,
            target_type: target,
            action: result.action,
            current_user_reaction: result.current,
            reactions_count: result.reactions_count,
        })
        .with_message(format!("Reaction {} successfully", result.action.as_str())),
    ))
}

/// Users who reacted to a target, bucketed by kind, optionally narrowed to one kind.
pub async fn get_reactions(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(target_id): Path<String>,
    AppQuery(query): AppQuery<ReactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let target = validate::target_kind(query.target_type.as_deref().unwrap_or_default())?;
    let only = query
        .reaction_type
        .as_deref()
        .map(validate::reaction_kind)
        .transpose()?;
    let target_id = validate::id(&target_id, target.as_str())?;

    ensure_target(&state, target, target_id, viewer.map(|u| u.id), false).await?;

    let id = target_id.to_string();
    let reactors = with_db(&state, move |db| db.get_reactors(target, &id)).await?;

    let mut groups = ReactionGroups::default();
    for row in reactors {
        let kind = match row.kind.parse::<ReactionKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Skipping reaction by '{}' on {}: {}", row.user_id, target_id, e);
                continue;
            }
        };
        if only.is_some_and(|k| k != kind) {
            continue;
        }
        groups.push(kind, views::summary(&row.user_id, &row.email, row.avatar.as_deref()));
    }
    let summary = groups.summary();

    Ok(Json(
        ApiResponse::ok(ReactionUsersResponse {
            reactions: groups,
            summary,
        })
        .with_message("Reactions fetched successfully"),
    ))
}
