use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::process;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = &state.config;
    let uptime_seconds = state.get_uptime_seconds();

    let memory_info = get_memory_info();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": "pulmo-viewer-backend",
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            }
        },
        "memory": memory_info,
        "providers": {
            "chat": {
                "provider": state.chat.provider_name(),
                "model": config.openai.chat_model,
                "configured": state.chat.is_configured()
            },
            "transcription": {
                "provider": state.transcriber.provider_name(),
                "model": config.openai.transcription_model,
                "configured": state.transcriber.is_configured()
            },
            "speech": {
                "provider": state.synthesizer.provider_name(),
                "configured": state.synthesizer.is_configured()
            }
        },
        "audio": {
            "encoder": config.ffmpeg.binary,
            "encoder_available": state.ffmpeg_available
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "endpoints": endpoint_stats,
        "memory": get_memory_info(),
        "uploads": {
            "dir": state.config.uploads.dir,
            "max_upload_bytes": state.config.uploads.max_upload_bytes
        }
    }))
}

fn get_memory_info() -> serde_json::Value {
    #[cfg(target_os = "linux")]
    {
        let pid = process::id();
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", pid)) {
            let mut vm_rss = 0;
            let mut vm_size = 0;

            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        vm_rss = kb_str.parse::<u64>().unwrap_or(0) * 1024;
                    }
                } else if line.starts_with("VmSize:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        vm_size = kb_str.parse::<u64>().unwrap_or(0) * 1024;
                    }
                }
            }

            return json!({
                "resident_memory_bytes": vm_rss,
                "virtual_memory_bytes": vm_size,
                "available": true
            });
        }
    }

    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::providers::mocks::{MockChat, MockSpeech, MockTranscriber};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use std::sync::Arc;

    fn state_with_speech(synthesizer: MockSpeech) -> AppState {
        AppState::new(
            AppConfig::default(),
            Arc::new(MockChat::replying("ok")),
            Arc::new(MockTranscriber::hearing("ok")),
            Arc::new(synthesizer),
            false,
        )
    }

    #[actix_web::test]
    async fn test_health_reports_provider_configuration() {
        let state = state_with_speech(MockSpeech::unconfigured());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"]["name"], "pulmo-viewer-backend");
        assert_eq!(body["providers"]["chat"]["configured"], true);
        assert_eq!(body["providers"]["speech"]["configured"], false);
        assert_eq!(body["audio"]["encoder_available"], false);
        // Configuration state only, never the credentials themselves
        let rendered = body.to_string();
        assert!(!rendered.contains("api_key"));
    }

    #[actix_web::test]
    async fn test_metrics_reports_recorded_endpoints() {
        let state = state_with_speech(MockSpeech::speaking(b"ok"));
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();
        state.record_endpoint_request("POST /api/chat", 120, false);
        state.record_endpoint_request("POST /api/chat", 80, true);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/metrics", web::get().to(detailed_metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["overall"]["total_requests"], 2);
        assert_eq!(body["overall"]["total_errors"], 1);
        assert_eq!(body["overall"]["error_rate"], 0.5);

        let endpoints = body["endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0]["endpoint"], "POST /api/chat");
        assert_eq!(endpoints[0]["request_count"], 2);
        assert_eq!(endpoints[0]["error_count"], 1);
        assert_eq!(endpoints[0]["average_duration_ms"], 100.0);
    }
}
