//! Shared fixtures: a scriptable upstream image server and an in-memory
//! channel store

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use yt_image_proxy::{
    config::ImageCacheConfig,
    errors::RepositoryResult,
    image_cache::ImageCacheService,
    observability::ImageCacheMetrics,
    repositories::{ChannelStore, ChannelThumbnailLookup},
};

/// A JPEG-looking body of exactly `len` bytes
pub fn jpeg_bytes(len: usize, seed: u8) -> Vec<u8> {
    let mut body = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    body.extend((0..len.saturating_sub(12)).map(|i| (i as u8).wrapping_mul(31) ^ seed));
    body.extend([0xFF, 0xD9]);
    body.truncate(len);
    body
}

/// A PNG-looking body of exactly `len` bytes
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut body = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    body.resize(len, 0x42);
    body
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
    pub delay: Duration,
    /// Repeat `body` forever as a chunked stream with no Content-Length
    pub endless: bool,
}

impl StubResponse {
    pub fn jpeg(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "image/jpeg".to_string(),
            body,
            delay: Duration::ZERO,
            endless: false,
        }
    }

    /// `image/jpeg` that never ends, sent in `chunk`-sized pieces
    pub fn endless_jpeg(chunk: Vec<u8>) -> Self {
        Self {
            endless: true,
            ..Self::jpeg(chunk)
        }
    }

    pub fn png(body: Vec<u8>) -> Self {
        Self {
            content_type: "image/png".to_string(),
            ..Self::jpeg(body)
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            content_type: "text/plain".to_string(),
            body: b"upstream says no".to_vec(),
            delay: Duration::ZERO,
            endless: false,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct StubState {
    routes: Mutex<HashMap<String, StubResponse>>,
    hits: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the in-flight count even when the client hangs up mid-request
struct InFlight(Arc<StubState>);

impl InFlight {
    fn enter(state: Arc<StubState>) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Upstream image server bound to an ephemeral localhost port
pub struct UpstreamStub {
    pub base_url: String,
    state: Arc<StubState>,
}

impl UpstreamStub {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(serve).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn respond(&self, path: &str, response: StubResponse) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.total.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn serve(State(state): State<Arc<StubState>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    state.total.fetch_add(1, Ordering::SeqCst);
    *state.hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    let _in_flight = InFlight::enter(state.clone());
    let route = state.routes.lock().unwrap().get(&path).cloned();

    let Some(route) = route else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }
    if route.endless {
        let chunk = bytes::Bytes::from(route.body);
        let body = Body::from_stream(
            futures::stream::repeat(chunk).map(Ok::<_, std::io::Error>),
        );
        return (route.status, [(header::CONTENT_TYPE, route.content_type)], body).into_response();
    }
    (
        route.status,
        [(header::CONTENT_TYPE, route.content_type)],
        route.body,
    )
        .into_response()
}

/// Channel store backed by a map, counting thumbnail lookups
#[derive(Default)]
pub struct MemoryChannelStore {
    urls: Mutex<HashMap<String, Option<String>>>,
    lookups: AtomicUsize,
}

impl MemoryChannelStore {
    pub fn with_channel(self, channel_id: &str, url: Option<String>) -> Self {
        self.urls.lock().unwrap().insert(channel_id.to_string(), url);
        self
    }

    pub fn set(&self, channel_id: &str, url: Option<String>) {
        self.urls.lock().unwrap().insert(channel_id.to_string(), url);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelThumbnailLookup for MemoryChannelStore {
    async fn lookup_thumbnail_url(&self, channel_id: &str) -> RepositoryResult<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.urls.lock().unwrap().get(channel_id).cloned().flatten())
    }
}

#[async_trait]
impl ChannelStore for MemoryChannelStore {
    async fn channel_ids_with_thumbnails(&self) -> RepositoryResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .urls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, url)| url.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn upsert_thumbnail_url(
        &self,
        channel_id: &str,
        thumbnail_url: Option<String>,
    ) -> RepositoryResult<Option<String>> {
        Ok(self
            .urls
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), thumbnail_url)
            .flatten())
    }
}

/// Cache configuration rooted at `root` with video thumbnails served by `stub`
pub fn test_config(root: &Path, stub: &UpstreamStub) -> ImageCacheConfig {
    ImageCacheConfig {
        video_thumbnail_base_url: stub.url("/vi"),
        on_demand_timeout: Duration::from_secs(5),
        background_timeout: Duration::from_secs(5),
        max_concurrent_fetches: 4,
        ..ImageCacheConfig::with_cache_root(root)
    }
}

pub async fn new_service(config: ImageCacheConfig) -> ImageCacheService {
    ImageCacheService::new(config, ImageCacheMetrics::global())
        .await
        .unwrap()
}
