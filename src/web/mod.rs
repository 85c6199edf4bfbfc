//! Web server and routing

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::WebConfig;
use crate::image_cache::ImageCacheService;
use crate::repositories::ChannelStore;
use crate::services::ChannelService;

pub mod handlers;
pub mod responses;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub image_cache: Arc<ImageCacheService>,
    pub channels: Arc<dyn ChannelStore>,
    pub channel_service: Arc<ChannelService>,
}

impl AppState {
    pub fn new(image_cache: Arc<ImageCacheService>, channels: Arc<dyn ChannelStore>) -> Self {
        let channel_service = Arc::new(ChannelService::new(
            channels.clone(),
            image_cache.clone(),
        ));
        Self {
            image_cache,
            channels,
            channel_service,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/images/channels/{channel_id}",
            get(handlers::images::get_channel_image),
        )
        .route(
            "/images/videos/{video_id}",
            get(handlers::images::get_video_image),
        )
        .route(
            "/channels/{channel_id}/thumbnail",
            put(handlers::channels::update_thumbnail),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &WebConfig, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until SIGINT or SIGTERM
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind to {}", self.addr))?;
        info!("Listening on http://{}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}
