//! # Application State Management
//!
//! Whatever every HTTP request handler needs to see lives here: the parsed
//! configuration, the provider clients, and the running metrics.
//!
//! ## Key Rust Concepts (IMPORTANT for beginners):
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: One value, many owners; the data lives until the last clone drops
//! - **Why needed**: Each Actix worker thread holds its own clone of AppState
//! - **Memory safety**: No manual cleanup, the count reaching zero frees it
//! - **Thread safety**: The reference count itself is atomic
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Many readers or a single writer, never both at once
//! - **Why needed**: Every request updates the metrics, while the metrics
//!   endpoints read them concurrently
//!
//! ### Arc<dyn Trait> (shared trait objects)
//! - The provider clients are stored behind their trait interfaces
//!   (ChatProvider, TranscriptionProvider, SpeechProvider), so handlers and the
//!   voice pipeline never know which concrete API they are talking to. Tests
//!   swap in scripted mocks through the same seam.
//!
//! ### What is deliberately NOT mutable:
//! The configuration. It is loaded once at startup, validated, and shared as a
//! plain `Arc<AppConfig>`. There is no runtime config mutation in this service,
//! so no lock is needed around it.

use crate::config::AppConfig;
use crate::persona;
use crate::providers::{ChatProvider, SpeechProvider, TranscriptionProvider};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, immutable after startup
    pub config: Arc<AppConfig>,

    /// Running counters, fed by the metrics middleware
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started (never changes, Instant is Copy)
    pub start_time: Instant,

    /// Chat completion provider (OpenAI in production, a mock in tests)
    pub chat: Arc<dyn ChatProvider>,

    /// Speech-to-text provider
    pub transcriber: Arc<dyn TranscriptionProvider>,

    /// Text-to-speech provider
    pub synthesizer: Arc<dyn SpeechProvider>,

    /// Whether the external audio encoder was found at startup.
    /// When false, uploads are transcribed without re-encoding.
    pub ffmpeg_available: bool,
}

/// Counters accumulated over the lifetime of the process.
///
/// ## Why these metrics matter:
/// - **request_count**: Overall API load since startup
/// - **error_count**: Overall failures since startup
/// - **endpoint_metrics**: Per-endpoint statistics (for spotting the slow or
///   failing proxy path, e.g. a misbehaving provider)
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// API requests handled since startup
    pub request_count: u64,

    /// Requests that ended in an error response
    pub error_count: u64,

    /// Per-endpoint breakdown, keyed as "METHOD path" (e.g. "POST /api/chat")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Counters for one endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Requests seen by this endpoint
    pub request_count: u64,

    /// Summed handling time in milliseconds, for computing the average
    pub total_duration_ms: u64,

    /// Error responses sent by this endpoint
    pub error_count: u64,
}

impl AppState {
    /// Create a new AppState with the given configuration and providers.
    pub fn new(
        config: AppConfig,
        chat: Arc<dyn ChatProvider>,
        transcriber: Arc<dyn TranscriptionProvider>,
        synthesizer: Arc<dyn SpeechProvider>,
        ffmpeg_available: bool,
    ) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            chat,
            transcriber,
            synthesizer,
            ffmpeg_available,
        }
    }

    /// The system prompt sent with every chat completion.
    ///
    /// Deployments can override the built-in persona via
    /// `assistant.system_prompt`; an empty value means "use the built-in one".
    pub fn system_prompt(&self) -> &str {
        let custom = &self.config.assistant.system_prompt;
        if custom.is_empty() {
            persona::SYSTEM_PROMPT
        } else {
            custom
        }
    }

    /// Bump the overall request counter; the metrics middleware calls this
    /// once per API request.
    ///
    /// ## Thread Safety:
    /// - The write lock is held for a single addition, nothing more
    /// - `.unwrap()` assumes the lock isn't poisoned (safe in practice, a
    ///   poisoned lock means a panic already happened while holding it)
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Bump the overall error counter.
    ///
    /// ## When this is called:
    /// - HTTP 4xx errors (client errors like 400 Bad Request)
    /// - HTTP 5xx errors (server errors, including relayed provider failures)
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Fold one finished request into the per-endpoint counters.
    ///
    /// ## Parameters:
    /// - **endpoint**: "METHOD path" label, e.g. "POST /api/voice/chat"
    /// - **duration_ms**: Wall-clock handling time
    /// - **is_error**: Whether the response status was 4xx or 5xx
    ///
    /// The first time we see an endpoint, a new EndpointMetric is created with
    /// default values; subsequent requests update the existing entry.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Clone the current counters for the /health and /metrics endpoints.
    ///
    /// ## Why a snapshot:
    /// - A read lock gives a consistent view of all three fields
    /// - Cloning means the lock is released before the response is serialised
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Seconds since the server started.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0  // No requests yet, so no average to calculate
        }
    }

    /// Error rate for this endpoint as a fraction (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0  // No requests yet, so no errors possible
        }
    }
}
