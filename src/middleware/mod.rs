pub mod logging;
pub mod metrics;

pub use logging::RequestLogging;
pub use metrics::MetricsMiddleware;

/// Paths that count as API traffic for logging and metrics purposes.
/// Everything else is the static frontend (pages, scripts, model files).
pub(crate) fn is_api_path(path: &str) -> bool {
    path == "/health" || path.starts_with("/api/")
}
