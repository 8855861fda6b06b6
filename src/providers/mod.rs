//! # Upstream Provider Clients
//!
//! Everything AI-shaped in this service is proxied to a third-party API:
//! chat completion and speech-to-text go to OpenAI, text-to-speech goes to
//! ElevenLabs. This module defines one small trait per capability and the
//! concrete HTTP clients behind them.
//!
//! ## Why traits here:
//! - Handlers and the voice pipeline depend on the capability, not the vendor
//! - Tests exercise the whole request flow with scripted mocks instead of
//!   network calls
//! - `is_configured()` lets the health endpoint and the credential checks ask
//!   "could this call succeed?" without touching key material
//!
//! ## Error policy:
//! A provider that answers with a non-2xx status, or doesn't answer at all,
//! becomes `AppError::Upstream` carrying the provider name, its HTTP status
//! (when one was received) and its response body. The handlers relay that to
//! the client unchanged; this server never rewrites what a provider said.

use crate::error::AppError;
use async_trait::async_trait;

pub mod elevenlabs;
pub mod openai;

#[cfg(test)]
pub mod mocks;

pub use elevenlabs::ElevenLabsClient;
pub use openai::OpenAiClient;

/// Chat completion: one system prompt, one user message, one reply.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short provider identifier used in logs, health reports and error bodies.
    fn provider_name(&self) -> &'static str;

    /// Whether the credentials this provider needs are present.
    fn is_configured(&self) -> bool;

    /// Generate a reply to `user_message` under the given system prompt.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError>;
}

/// Speech-to-text over a complete uploaded recording.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    /// Transcribe an audio file. `filename` matters: the provider uses its
    /// extension to detect the container format. An empty transcript is a
    /// valid result (silence, noise), not an error.
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, AppError>;
}

/// Text-to-speech synthesis returning encoded audio bytes (MPEG).
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError>;
}

/// Build an `AppError::Upstream` from a non-2xx provider response, keeping
/// the provider's status and body so the client sees what actually happened.
pub(crate) async fn upstream_failure(provider: &'static str, response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();

    let detail = match response.text().await {
        Ok(body) if body.is_empty() => None,
        Ok(body) => match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => Some(value),
            // Not JSON; relay the raw text instead of dropping it
            Err(_) => Some(serde_json::Value::String(body)),
        },
        Err(_) => None,
    };

    AppError::Upstream {
        provider,
        status: Some(status),
        detail,
    }
}

/// Build an `AppError::Upstream` for a request that never produced a
/// response (connect failure, timeout, TLS error).
pub(crate) fn transport_failure(provider: &'static str, err: reqwest::Error) -> AppError {
    AppError::Upstream {
        provider,
        status: None,
        detail: Some(serde_json::Value::String(err.to_string())),
    }
}
