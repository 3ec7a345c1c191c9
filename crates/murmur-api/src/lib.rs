pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod reactions;
pub mod state;
pub mod tokens;
pub mod uploads;
pub mod users;
pub mod validate;
mod views;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use serde::Serialize;
use tower_http::services::ServeDir;

use murmur_types::api::ApiResponse;

pub use error::ApiError;
pub use state::{AppState, AppStateInner, AuthSettings};
pub use uploads::ImageStore;

/// Room for multipart framing and the `type` field on top of the image itself.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

/// Every route the service exposes, ready for outer layers (CORS, tracing).
pub fn router(state: AppState) -> Router {
    // Session routes manage their own cookies and skip the refreshing middleware.
    let session = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh));

    let app = Router::new()
        .route("/auth/verify", get(auth::verify))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/{id}/react", post(posts::react_to_post))
        .route("/comments", get(comments::list_comments).post(comments::create_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route("/reactions", post(reactions::toggle_reaction))
        .route("/reactions/{target_id}", get(reactions::get_reactions))
        .route("/users/suggested", get(users::suggested))
        .route("/users/following", get(users::following))
        .route("/users/{user_id}/follow", post(users::follow))
        .route("/users/{user_id}/unfollow", post(users::unfollow))
        .route(
            "/upload",
            post(uploads::upload_image)
                .layer(DefaultBodyLimit::max(uploads::MAX_IMAGE_SIZE + UPLOAD_BODY_SLACK)),
        )
        .layer(from_fn_with_state(state.clone(), middleware::authenticate));

    let uploads_dir = state.images.dir().to_path_buf();

    Router::new()
        .nest("/api", session.merge(app))
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<ApiResponse<Health>> {
    Json(ApiResponse::ok(Health { status: "ok" }).with_message("Server is running"))
}
