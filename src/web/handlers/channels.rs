use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::web::AppState;
use crate::web::responses::{handle_error, ok};

#[derive(Debug, Deserialize)]
pub struct UpdateThumbnailRequest {
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateThumbnailResponse {
    pub channel_id: String,
    pub invalidated: bool,
}

/// `PUT /api/v1/channels/{channel_id}/thumbnail`
pub async fn update_thumbnail(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<UpdateThumbnailRequest>,
) -> Response {
    match state
        .channel_service
        .update_thumbnail_url(&channel_id, request.thumbnail_url)
        .await
    {
        Ok(update) => ok(UpdateThumbnailResponse {
            channel_id: update.channel_id,
            invalidated: update.invalidated,
        })
        .into_response(),
        Err(e) => handle_error(e).into_response(),
    }
}
