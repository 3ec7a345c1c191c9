use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use murmur_db::FollowChange;
use murmur_types::api::{ApiResponse, FollowResponse};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};
use crate::{validate, views};

const SUGGESTED_LIMIT: u32 = 5;

pub async fn follow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = validate::id(&user_id, "user")?;
    if target == user.id {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let (follower, followee) = (user.id.to_string(), target.to_string());
    let change = with_db(&state, move |db| {
        let exists = db
            .get_user_by_id(&followee)?
            .is_some_and(|u| u.is_active && u.deleted_at.is_none());
        if !exists {
            return Ok(None);
        }
        db.follow(&follower, &followee).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("The user you are trying to follow does not exist"))?;

    if change == FollowChange::Unchanged {
        return Err(ApiError::bad_request("You are already following this user"));
    }

    info!("User {} followed {}", user.id, target);

    Ok(Json(
        ApiResponse::ok(FollowResponse { user_id: target }).with_message("User followed successfully"),
    ))
}

pub async fn unfollow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = validate::id(&user_id, "user")?;
    if target == user.id {
        return Err(ApiError::bad_request("You cannot unfollow yourself"));
    }

    let (follower, followee) = (user.id.to_string(), target.to_string());
    let change = with_db(&state, move |db| {
        if !db.is_following(&follower, &followee)? {
            return Ok(Err(ApiError::bad_request("You are not following this user")));
        }
        if db.get_user_by_id(&followee)?.is_none() {
            return Ok(Err(ApiError::not_found("The user you are trying to unfollow does not exist")));
        }
        db.unfollow(&follower, &followee).map(Ok)
    })
    .await??;

    if change == FollowChange::Unchanged {
        return Err(ApiError::bad_request("You are not following this user"));
    }

    info!("User {} unfollowed {}", user.id, target);

    Ok(Json(
        ApiResponse::ok(FollowResponse { user_id: target }).with_message("User unfollowed successfully"),
    ))
}

pub async fn suggested(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let id = user.id.to_string();
    let rows = with_db(&state, move |db| db.suggested_users(&id, SUGGESTED_LIMIT)).await?;

    Ok(Json(
        ApiResponse::ok(views::summaries(rows)).with_message("Suggested users fetched successfully"),
    ))
}

pub async fn following(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let id = user.id.to_string();
    let rows = with_db(&state, move |db| db.following_users(&id)).await?;

    Ok(Json(
        ApiResponse::ok(views::summaries(rows)).with_message("Following users fetched successfully"),
    ))
}
