//! The chat turn handler: prompt in, rendered table out.

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiError;
use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub url: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadLinks {
    pub json: String,
    pub csv: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Markdown table for the assistant turn (empty when no records).
    pub table: String,
    /// Assistant turn index in the transcript.
    pub turn: usize,
    pub record_count: usize,
    pub downloads: DownloadLinks,
}

/// `POST /api/sessions/:id/chat`: submit a prompt for extraction.
///
/// Blank URLs are rejected before any API call; a second submission while
/// one is in flight gets 409; extraction failures surface as transport or
/// response-shape errors with the transcript untouched.
pub async fn chat_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state
        .registry
        .chat(id, &request.url, &request.prompt)
        .await?;

    let base = format!("/api/sessions/{}/turns/{}/download", id, outcome.turn);
    Ok(Json(ChatResponse {
        table: outcome.table,
        turn: outcome.turn,
        record_count: outcome.record_count,
        downloads: DownloadLinks {
            json: format!("{base}/json"),
            csv: format!("{base}/csv"),
        },
    }))
}
