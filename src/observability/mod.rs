//! OpenTelemetry metrics for the image cache

use anyhow::Result;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Meter, MeterProvider},
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use tracing::info;

use crate::image_cache::{CacheStatus, ImageKind};

/// Meter name shared by every instrument in the service
const METER_NAME: &str = "yt-image-proxy";

/// Main observability interface providing metrics
#[derive(Clone)]
pub struct AppObservability {
    pub image_cache: ImageCacheMetrics,
}

impl AppObservability {
    /// Initialize observability and install the meter provider globally
    pub fn new(service_name: &str) -> Result<Self> {
        // Metrics are exported by whichever reader the deployment attaches;
        // without one the instruments are cheap no-ops.
        let provider = SdkMeterProvider::builder().build();
        global::set_meter_provider(provider.clone());

        let meter = provider.meter(METER_NAME);
        info!("Metrics initialised for {}", service_name);

        Ok(Self {
            image_cache: ImageCacheMetrics::new(&meter),
        })
    }
}

/// Instruments recorded by the image cache
#[derive(Clone)]
pub struct ImageCacheMetrics {
    requests: Counter<u64>,
    upstream_fetches: Counter<u64>,
    self_heals: Counter<u64>,
    invalidations: Counter<u64>,
    bytes_served: Counter<u64>,
}

impl ImageCacheMetrics {
    pub fn new(meter: &Meter) -> Self {
        let requests = meter
            .u64_counter("image_requests_total")
            .with_description("Image requests by kind and X-Cache outcome")
            .build();
        let upstream_fetches = meter
            .u64_counter("image_upstream_fetches_total")
            .with_description("Upstream image fetches by kind and outcome")
            .build();
        let self_heals = meter
            .u64_counter("image_cache_self_heals_total")
            .with_description("Cache entries deleted for failing size validation")
            .build();
        let invalidations = meter
            .u64_counter("image_cache_invalidations_total")
            .with_description("Channel image invalidations")
            .build();
        let bytes_served = meter
            .u64_counter("image_bytes_served_total")
            .with_description("Image bytes returned to clients")
            .build();

        Self {
            requests,
            upstream_fetches,
            self_heals,
            invalidations,
            bytes_served,
        }
    }

    /// Instruments bound to the global meter provider
    pub fn global() -> Self {
        Self::new(&global::meter(METER_NAME))
    }

    pub fn record_request(&self, kind: ImageKind, status: CacheStatus, bytes: usize) {
        let attributes = [
            KeyValue::new("kind", kind.to_string()),
            KeyValue::new("cache_status", status.to_string()),
        ];
        self.requests.add(1, &attributes);
        self.bytes_served.add(bytes as u64, &attributes);
    }

    pub fn record_fetch(&self, kind: ImageKind, outcome: String) {
        self.upstream_fetches.add(
            1,
            &[
                KeyValue::new("kind", kind.to_string()),
                KeyValue::new("outcome", outcome),
            ],
        );
    }

    pub fn record_self_heal(&self, kind: ImageKind) {
        self.self_heals.add(1, &[KeyValue::new("kind", kind.to_string())]);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.add(1, &[]);
    }
}
