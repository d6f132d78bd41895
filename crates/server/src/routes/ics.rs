//! Calendar export endpoints
//!
//! Both views require a superuser and never modify the export.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use folio_core::{Error, IcsExport};
use serde::Serialize;

use crate::auth::Superuser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ics/{id}/status", get(status))
        .route("/ics/{id}/download", get(download))
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub export: IcsExport,
    /// Server time, for polling clients.
    pub now: String,
}

async fn load_export(state: &AppState, id: i64) -> Result<IcsExport, ApiError> {
    Ok(state
        .store
        .get_export(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("ics export {id}")))?)
}

/// GET /ics/{id}/status
async fn status(
    State(state): State<AppState>, Superuser(_user): Superuser, Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiError> {
    let export = load_export(&state, id).await?;
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    Ok(Json(StatusResponse { export, now }))
}

/// GET /ics/{id}/download - the payload once completed, else back to status
async fn download(
    State(state): State<AppState>, Superuser(user): Superuser, Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let export = load_export(&state, id).await?;

    let payload = match export.result {
        Some(payload) if export.is_completed() => payload,
        _ => {
            tracing::debug!(id, status = %export.status, "export not ready");
            return Ok(Redirect::to(&format!("/ics/{id}/status")).into_response());
        }
    };

    tracing::info!(id, user = %user.username, bytes = payload.len(), "ics export downloaded");
    let disposition = format!("attachment; filename=\"{}\"", export.file_name.replace('"', ""));
    Ok((
        [(header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()), (header::CONTENT_DISPOSITION, disposition)],
        payload,
    )
        .into_response())
}
