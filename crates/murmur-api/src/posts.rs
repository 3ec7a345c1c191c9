use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use murmur_db::models::{NewPost, PostRow};
use murmur_types::api::{
    ApiResponse, CreatePostRequest, DeletePostResponse, Pagination, PostResponse, ReactRequest,
    UpdatePostRequest,
};
use murmur_types::models::{Privacy, TargetKind};

use crate::error::{ApiError, AppJson, AppQuery};
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};
use crate::{validate, views};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A live post the viewer is allowed to see. Private posts are only visible
/// to their author; everyone else gets the same 404 as for a missing post.
pub(crate) async fn visible_post(
    state: &AppState,
    post_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<PostRow, ApiError> {
    let id = post_id.to_string();
    let row = with_db(state, move |db| db.get_post(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let is_author = viewer.is_some_and(|v| v.to_string() == row.author_id);
    if row.privacy == Privacy::Private.as_str() && !is_author {
        return Err(ApiError::not_found("Post not found"));
    }
    Ok(row)
}

/// Attach reactions to a single post row.
async fn hydrate(state: &AppState, row: PostRow, viewer: Option<Uuid>) -> Result<PostResponse, ApiError> {
    let ids = vec![row.id.clone()];
    let reactions = with_db(state, move |db| db.get_reactions_for_targets(TargetKind::Post, &ids)).await?;
    Ok(views::posts(vec![row], reactions, viewer)
        .pop()
        .ok_or_else(|| anyhow::anyhow!("post vanished while rendering"))?)
}

pub async fn list_posts(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    AppQuery(query): AppQuery<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit) = validate::page(query.page, query.limit);
    let offset = validate::offset(page, limit);
    let viewer = viewer.map(|u| u.id);
    let viewer_id = viewer.map(|v| v.to_string());

    let (rows, total, reactions) = with_db(&state, move |db| {
        let rows = db.list_feed(viewer_id.as_deref(), limit, offset)?;
        let total = db.count_feed(viewer_id.as_deref())?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let reactions = db.get_reactions_for_targets(TargetKind::Post, &ids)?;
        Ok((rows, total, reactions))
    })
    .await?;

    let posts = views::posts(rows, reactions, viewer);
    let pagination = Pagination::new(page, limit, total, posts.len());

    Ok(Json(
        ApiResponse::ok(posts)
            .with_message("Posts fetched successfully")
            .with_pagination(pagination),
    ))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validate::post_content(&req.content)?;
    let privacy = validate::privacy(req.privacy.as_deref())?;
    let image = validate::image_url(req.image)?;
    let image_public_id = validate::optional_text(req.image_public_id);

    let post_id = Uuid::new_v4();
    let (id, author_id) = (post_id.to_string(), user.id.to_string());
    let row = with_db(&state, move |db| {
        db.insert_post(&NewPost {
            id: &id,
            author_id: &author_id,
            content: &content,
            image: image.as_deref(),
            image_public_id: image_public_id.as_deref(),
            privacy: privacy.as_str(),
        })?;
        db.get_post(&id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("post {post_id} missing after insert"))?;

    info!("User {} created post {}", user.id, post_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(views::post(row, vec![], Some(user.id))).with_message("Post created successfully")),
    ))
}

pub async fn get_post(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = validate::id(&id, "post")?;
    let viewer = viewer.map(|u| u.id);
    let row = visible_post(&state, post_id, viewer).await?;
    let post = hydrate(&state, row, viewer).await?;

    Ok(Json(ApiResponse::ok(post).with_message("Post fetched successfully")))
}

pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = validate::id(&id, "post")?;
    let content = req.content.as_deref().map(validate::post_content).transpose()?;
    let privacy = req
        .privacy
        .as_deref()
        .map(|p| validate::privacy(Some(p)))
        .transpose()?;

    let row = visible_post(&state, post_id, Some(user.id)).await?;
    if row.author_id != user.id.to_string() {
        return Err(ApiError::forbidden("You can only edit your own posts"));
    }

    let id = row.id;
    let row = with_db(&state, move |db| {
        if !db.update_post(&id, content.as_deref(), privacy.map(Privacy::as_str))? {
            return Ok(None);
        }
        db.get_post(&id)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Post not found"))?;

    info!("User {} updated post {}", user.id, post_id);
    let post = hydrate(&state, row, Some(user.id)).await?;

    Ok(Json(ApiResponse::ok(post).with_message("Post updated successfully")))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = validate::id(&id, "post")?;
    let row = visible_post(&state, post_id, Some(user.id)).await?;
    if row.author_id != user.id.to_string() {
        return Err(ApiError::forbidden("You can only delete your own posts"));
    }

    let id = row.id;
    if !with_db(&state, move |db| db.soft_delete_post(&id)).await? {
        return Err(ApiError::not_found("Post not found"));
    }

    info!("User {} deleted post {}", user.id, post_id);

    Ok(Json(
        ApiResponse::ok(DeletePostResponse { post_id }).with_message("Post deleted successfully"),
    ))
}

/// Reaction shortcut scoped to a post. Same toggle rules as `/api/reactions`.
pub async fn react_to_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = validate::id(&id, "post")?;
    let kind = validate::reaction_kind(&req.kind)?;
    visible_post(&state, post_id, Some(user.id)).await?;

    let (target_id, user_id) = (post_id.to_string(), user.id.to_string());
    let toggled = with_db(&state, move |db| {
        let Some(result) = db.toggle_reaction(TargetKind::Post, &target_id, &user_id, kind)? else {
            return Ok(None);
        };
        Ok(db.get_post(&target_id)?.map(|row| (result, row)))
    })
    .await?;
    let Some((result, row)) = toggled else {
        return Err(ApiError::not_found("Post not found"));
    };

    let post = hydrate(&state, row, Some(user.id)).await?;

    Ok(Json(
        ApiResponse::ok(post).with_message(format!("Reaction {} successfully", result.action.as_str())),
    ))
}
