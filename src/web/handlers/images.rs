//! Image HTTP handlers
//!
//! Both endpoints always answer 200: a missing or unreachable image becomes
//! an SVG placeholder tagged `X-Cache: PLACEHOLDER`.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::debug;

use crate::image_cache::{ImageResponse, VideoQuality};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct VideoImageQuery {
    #[serde(default = "default_quality")]
    pub quality: VideoQuality,
}

fn default_quality() -> VideoQuality {
    VideoQuality::Hqdefault
}

/// `GET /api/v1/images/channels/{channel_id}`
pub async fn get_channel_image(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ImageResponse {
    let response = state
        .image_cache
        .get_channel_image(state.channels.as_ref(), &channel_id)
        .await;
    debug!(channel_id, x_cache = response.x_cache(), "Served channel image");
    response
}

/// `GET /api/v1/images/videos/{video_id}?quality=`
pub async fn get_video_image(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<VideoImageQuery>,
) -> ImageResponse {
    let response = state
        .image_cache
        .get_video_image(&video_id, query.quality)
        .await;
    debug!(
        video_id,
        quality = %query.quality,
        x_cache = response.x_cache(),
        "Served video image"
    );
    response
}
