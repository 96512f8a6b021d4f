use std::path::{Path as FsPath, PathBuf};

use anyhow::Result;
use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use ripple_types::api::UploadResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Image uploads land here before their URL travels onward as a post
/// image or a message content marker.
const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/svg+xml",
    "image/tiff",
    "image/x-icon",
    "image/heic",
    "image/heif",
];

/// On-disk store for uploaded images, served statically under /uploads.
pub struct UploadStore {
    dir: PathBuf,
    public_url: String,
}

impl UploadStore {
    pub async fn new(dir: PathBuf, public_url: String) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir, public_url })
    }

    pub fn dir(&self) -> &FsPath {
        &self.dir
    }

    /// Store bytes under a generated name, keeping the original extension.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let ext = FsPath::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);

        fs::write(self.dir.join(&file_name), data).await?;

        Ok(format!(
            "{}/uploads/{}",
            self.public_url.trim_end_matches('/'),
            file_name
        ))
    }
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("malformed multipart body".into()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string).unwrap_or_default();
        if !ALLOWED_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::BadRequest(
                "only image uploads are allowed".into(),
            ));
        }

        let file_name = field.file_name().map(str::to_string).unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("file too large or truncated".into()))?;

        let file_url = state.uploads.save(&file_name, &data).await?;
        return Ok(Json(UploadResponse { file_url }));
    }

    Err(ApiError::BadRequest("no file uploaded".into()))
}
