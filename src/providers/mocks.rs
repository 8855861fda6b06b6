//! Scripted provider implementations for tests.
//!
//! Each mock returns a fixed result and counts how often it was called, so
//! tests can assert both on responses and on which pipeline stages ran.

use super::{ChatProvider, SpeechProvider, TranscriptionProvider};
use crate::error::AppError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

fn scripted_failure(provider: &'static str) -> AppError {
    AppError::Upstream {
        provider,
        status: Some(500),
        detail: Some(serde_json::json!({"error": "scripted failure"})),
    }
}

/// Chat provider that replies with a fixed string, or fails when scripted to.
pub struct MockChat {
    reply: Option<String>,
    configured: bool,
    pub calls: AtomicUsize,
}

impl MockChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            reply: None,
            configured: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    fn provider_name(&self) -> &'static str {
        "mock-chat"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(scripted_failure("mock-chat")),
        }
    }
}

/// Transcription provider that returns a fixed transcript, or fails.
pub struct MockTranscriber {
    transcript: Option<String>,
    configured: bool,
    pub calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn hearing(transcript: &str) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionProvider for MockTranscriber {
    fn provider_name(&self) -> &'static str {
        "mock-stt"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.transcript {
            Some(transcript) => Ok(transcript.clone()),
            None => Err(scripted_failure("mock-stt")),
        }
    }
}

/// Speech provider that returns fixed audio bytes, or fails.
pub struct MockSpeech {
    audio: Option<Vec<u8>>,
    configured: bool,
    pub calls: AtomicUsize,
}

impl MockSpeech {
    pub fn speaking(audio: &[u8]) -> Self {
        Self {
            audio: Some(audio.to_vec()),
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            audio: None,
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            audio: None,
            configured: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for MockSpeech {
    fn provider_name(&self) -> &'static str {
        "mock-tts"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.audio {
            Some(audio) => Ok(audio.clone()),
            None => Err(scripted_failure("mock-tts")),
        }
    }
}
