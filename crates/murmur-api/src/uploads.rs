use std::path::{Path, PathBuf};

use anyhow::Result;
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    response::IntoResponse,
};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use murmur_types::api::{ApiResponse, UploadResponse};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 5 MiB per image.
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

pub(crate) const IMAGE_TOO_LARGE: &str = "Image size must be less than 5MB";

const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Which folder an upload belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFolder {
    Post,
    Profile,
    Comment,
}

impl UploadFolder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Profile => "profile",
            Self::Comment => "comment",
        }
    }

    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("post") {
            "post" => Some(Self::Post),
            "profile" => Some(Self::Profile),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }
}

pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

/// Content-addressed image storage on local disk.
///
/// Each image lives at `{dir}/{folder}/{sha256}.{ext}` and is served back
/// under `/uploads/`. Identical bytes land on the same file.
pub struct ImageStore {
    dir: PathBuf,
    public_base: String,
}

impl ImageStore {
    /// `public_base` prefixes returned URLs; empty yields root-relative URLs.
    pub fn new(dir: PathBuf, public_base: &str) -> Self {
        Self {
            dir,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, folder: UploadFolder, ext: &str, data: &[u8]) -> Result<StoredImage> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hex::encode(hasher.finalize());

        let folder_dir = self.dir.join(folder.as_str());
        fs::create_dir_all(&folder_dir).await?;

        let file_name = format!("{hash}.{ext}");
        let path = folder_dir.join(&file_name);
        if fs::try_exists(&path).await? {
            debug!("Image {} already stored", path.display());
        } else {
            // Only complete files ever appear under the final name.
            let partial = folder_dir.join(format!(".{hash}.{}.part", Uuid::new_v4()));
            fs::write(&partial, data).await?;
            if let Err(e) = fs::rename(&partial, &path).await {
                fs::remove_file(&partial).await.ok();
                return Err(e.into());
            }
        }

        Ok(StoredImage {
            url: format!("{}/uploads/{}/{}", self.public_base, folder.as_str(), file_name),
            public_id: format!("{}/{}", folder.as_str(), hash),
        })
    }
}

/// POST /api/upload: multipart form with a `file` image part and an
/// optional `type` folder (`post` by default).
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;

    let mut file: Option<(String, Bytes)> = None;
    let mut folder: Option<String> = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .and_then(|v| v.split(';').next())
                    .map(|v| v.trim().to_ascii_lowercase())
                    .unwrap_or_default();
                file = Some((content_type, field.bytes().await?));
            }
            Some("type") => folder = Some(field.text().await?),
            other => debug!("Ignoring upload form field {:?}", other),
        }
    }

    let folder = UploadFolder::parse(folder.as_deref())
        .ok_or_else(|| ApiError::validation("Upload type must be 'post', 'profile' or 'comment'"))?;

    let (content_type, data) =
        file.ok_or_else(|| ApiError::bad_request("Please select an image to upload"))?;
    let ext = ACCEPTED_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| ApiError::bad_request("Only JPEG, PNG, WebP and GIF images are allowed"))?;

    if data.is_empty() {
        return Err(ApiError::bad_request("Please select an image to upload"));
    }
    if data.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::bad_request(IMAGE_TOO_LARGE));
    }

    let stored = state.images.save(folder, ext, &data).await?;
    info!(
        "User {} uploaded {} ({} bytes)",
        user.id,
        stored.public_id,
        data.len()
    );

    Ok(Json(
        ApiResponse::ok(UploadResponse {
            url: stored.url,
            public_id: stored.public_id,
        })
        .with_message("Image uploaded successfully"),
    ))
}
