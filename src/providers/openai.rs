//! OpenAI client covering the two capabilities this service proxies there:
//! chat completion (`/chat/completions`) and speech-to-text
//! (`/audio/transcriptions`).

use super::{transport_failure, upstream_failure, ChatProvider, TranscriptionProvider};
use crate::config::{AssistantConfig, OpenAiConfig};
use crate::error::AppError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "openai";

/// HTTP client for the OpenAI API.
///
/// One instance serves both the ChatProvider and TranscriptionProvider
/// traits; the two endpoints share the credential, base URL and timeout.
pub struct OpenAiClient {
    config: OpenAiConfig,
    assistant: AssistantConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig, assistant: AssistantConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            assistant,
            client,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }
}

/// Request body for `POST /chat/completions`.
///
/// Borrowed fields keep this allocation-free; the struct only lives for the
/// duration of one request.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Response body of `POST /audio/transcriptions`.
///
/// The current API answers `{"text": ...}`; older gateway deployments used
/// `{"transcription": ...}`, hence the alias. A missing field means an empty
/// transcript, which the pipeline treats as "no speech".
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default, alias = "transcription")]
    text: String,
}

/// The model answered but generated no choices; treat that as an empty reply
/// rather than an error.
fn reply_from(completion: ChatCompletionResponse) -> String {
    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .unwrap_or_default()
}

/// Content type for the transcription upload, derived from the filename the
/// same way the provider itself detects the container.
fn mime_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError> {
        if !ChatProvider::is_configured(self) {
            return Err(AppError::ConfigError("OPENAI_API_KEY is not set".to_string()));
        }

        let request = ChatCompletionRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: self.assistant.max_tokens,
            temperature: self.assistant.temperature,
        };

        debug!(model = %self.config.chat_model, "Requesting chat completion");

        let url = format!("{}/chat/completions", self.config.api_base);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(upstream_failure(PROVIDER, response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        Ok(reply_from(completion))
    }
}

#[async_trait]
impl TranscriptionProvider for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, AppError> {
        if !TranscriptionProvider::is_configured(self) {
            return Err(AppError::ConfigError("OPENAI_API_KEY is not set".to_string()));
        }

        debug!(
            model = %self.config.transcription_model,
            filename = %filename,
            size_bytes = audio.len(),
            "Requesting transcription"
        );

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))
            .map_err(|e| AppError::Internal(format!("Invalid upload content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", file_part);

        let url = format!("{}/audio/transcriptions", self.config.api_base);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(upstream_failure(PROVIDER, response).await);
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| transport_failure(PROVIDER, e))?;

        Ok(transcription.text)
    }
}
