//! Session lifecycle and schema-builder handlers.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::ApiError;
use crate::server::app::AppState;
use crate::sessions::{FieldsView, SessionSnapshot};
use extract::FieldType;

/// `POST /api/sessions`: open a new session.
pub async fn create_session_handler(
    Extension(state): Extension<AppState>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let id = state.registry.create_session().await;
    let snapshot = state.registry.snapshot(id).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// `GET /api/sessions/:id`: current session state.
pub async fn session_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.registry.snapshot(id).await?))
}

/// `DELETE /api/sessions/:id`: drop the session and its data.
///
/// The UI fires this from a page-unload handler so abandoned sessions do
/// not linger until the expiry sweep.
pub async fn delete_session_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.registry.delete_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/:id/fields`: append a blank schema field.
///
/// A no-op at capacity; the returned view tells the UI whether to keep
/// showing the add affordance.
pub async fn add_field_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FieldsView>, ApiError> {
    Ok(Json(state.registry.add_field(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// `PUT /api/sessions/:id/fields/:index`: overwrite a field in place.
pub async fn update_field_handler(
    Extension(state): Extension<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(request): Json<UpdateFieldRequest>,
) -> Result<Json<FieldsView>, ApiError> {
    Ok(Json(
        state
            .registry
            .update_field(id, index, &request.name, request.field_type)
            .await?,
    ))
}

/// `DELETE /api/sessions/:id/fields/:index`: remove a field.
///
/// A no-op on the last remaining slot.
pub async fn remove_field_handler(
    Extension(state): Extension<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<FieldsView>, ApiError> {
    Ok(Json(state.registry.remove_field(id, index).await?))
}

/// `POST /api/sessions/:id/reset`: clear the conversation.
pub async fn reset_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.registry.reset(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
