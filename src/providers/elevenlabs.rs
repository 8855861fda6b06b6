//! ElevenLabs text-to-speech client.
//!
//! One endpoint: `POST /text-to-speech/{voice_id}` with the text to speak,
//! answering MPEG audio bytes. Authentication uses the `xi-api-key` header
//! rather than a bearer token.

use super::{transport_failure, upstream_failure, SpeechProvider};
use crate::config::ElevenLabsConfig;
use crate::error::AppError;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "elevenlabs";

pub struct ElevenLabsClient {
    config: ElevenLabsConfig,
    client: reqwest::Client,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    /// Synthesis needs both the credential and a voice to speak with.
    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty() && !self.config.voice_id.is_empty()
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError> {
        if !self.is_configured() {
            return Err(AppError::ConfigError(
                "ELEVEN_API_KEY / ELEVEN_VOICE_ID are not set".to_string(),
            ));
        }

        debug!(voice_id = %self.config.voice_id, chars = text.len(), "Requesting speech synthesis");

        let url = format!("{}/text-to-speech/{}", self.config.api_base, self.config.voice_id);
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(upstream_failure(PROVIDER, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        Ok(bytes.to_vec())
    }
}
