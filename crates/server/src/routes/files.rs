//! Stored files and their resized variants
//!
//! Open to anonymous clients; files are public media.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use folio_core::image::{FILE_IMAGE_PRE_KEY, ImageOptions, SourceFile, aspect_ratio, normalize_quality, parse_size};
use folio_core::{Error, FileRecord};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files/{id}/", get(download))
        .route("/files/{id}/{size}/", get(resized))
}

/// Query string of the resize route. `crop` and `constrain` are flags: present
/// and not `0`/`false` means on.
#[derive(Debug, Default, Deserialize)]
pub struct ResizeQuery {
    pub crop: Option<String>,
    pub constrain: Option<String>,
    pub quality: Option<u8>,
}

fn flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
}

impl ResizeQuery {
    fn options(&self) -> ImageOptions {
        ImageOptions {
            crop: flag(self.crop.as_deref()),
            constrain: flag(self.constrain.as_deref()),
            quality: normalize_quality(self.quality.unwrap_or_default()),
            cache: true,
            unique_key: None,
        }
    }
}

async fn load_file(state: &AppState, id: i64) -> Result<FileRecord, ApiError> {
    Ok(state
        .store
        .get_file(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("file {id}")))?)
}

/// GET /files/{id}/
async fn download(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, ApiError> {
    let file = load_file(&state, id).await?;
    let content = state.storage().read(&file.file.path).await?;

    let content_type = file.file.mime_type.clone().unwrap_or_else(|| "application/octet-stream".into());
    let disposition = format!("inline; filename=\"{}\"", file.file.name.replace('"', ""));
    Ok(([(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)], content).into_response())
}

/// GET /files/{id}/{size}/ - `size` is `WxH`, either side may be 0
async fn resized(
    State(state): State<AppState>, Path((id, size)): Path<(i64, String)>, Query(query): Query<ResizeQuery>,
) -> Result<Response, ApiError> {
    let requested = parse_size(&size)?;
    let file = load_file(&state, id).await?;
    let source = SourceFile::from(&file);
    let options = query.options();

    let original = state.images.original_dimensions(&source).await?;
    let target = aspect_ratio(original, requested, options.constrain);
    tracing::debug!(id, ?original, ?requested, ?target, "resizing file");

    let image = state
        .images
        .get_image(&source, target, FILE_IMAGE_PRE_KEY, &options)
        .await?
        .ok_or_else(|| Error::NotFound(format!("file {id} at {size}")))?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], image.bytes).into_response())
}
