use std::sync::Arc;

use tracing::error;

use murmur_db::Database;

use crate::error::ApiError;
use crate::uploads::ImageStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub auth: AuthSettings,
    pub images: ImageStore,
}

/// Signing secrets and cookie policy for sessions.
pub struct AuthSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub secure_cookies: bool,
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
        })?
        .map_err(ApiError::Internal)
}
