//! Health check HTTP handler

use axum::{extract::State, response::IntoResponse};
use serde::Serialize;

use crate::web::{AppState, responses::ok};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// True when the image cache could not prepare its directories and is
    /// serving placeholders only
    pub passthrough: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    ok(HealthResponse {
        status: "healthy",
        passthrough: state.image_cache.is_passthrough(),
        timestamp: chrono::Utc::now(),
    })
}
