//! Per-turn download artifacts (JSON of the raw response, CSV of the
//! flattened records), served with fixed filenames.

use axum::{
    extract::{Extension, Path},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::ApiError;
use crate::server::app::AppState;
use crate::sessions::{ArtifactKind, SessionError};

/// `GET /api/sessions/:id/turns/:turn/download/:kind` where kind is
/// `json` or `csv`.
pub async fn download_handler(
    Extension(state): Extension<AppState>,
    Path((id, turn, kind)): Path<(Uuid, usize, String)>,
) -> Result<Response, ApiError> {
    let kind = match kind.as_str() {
        "json" => ArtifactKind::Json,
        "csv" => ArtifactKind::Csv,
        _ => return Err(SessionError::ArtifactNotFound.into()),
    };

    let bytes = state.registry.artifact(id, turn, kind).await?;
    Ok((
        [
            (header::CONTENT_TYPE, kind.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", kind.filename()),
            ),
        ],
        bytes,
    )
        .into_response())
}
