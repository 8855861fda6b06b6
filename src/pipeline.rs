//! # Voice Round-Trip Pipeline
//!
//! The heart of `/api/voice/chat`: a fixed linear sequence over the provider
//! traits with each external call made at most once, in order, and no retries.
//!
//! ```text
//! audio bytes -> transcribe -> chat-complete -> synthesize -> base64 audio
//! ```
//!
//! ## Partial progress on failure:
//! When a stage fails mid-pipeline, the client still deserves whatever was
//! already produced: a failed chat completion returns the transcript, a
//! failed synthesis returns transcript and reply. `PipelineFailure` carries
//! that progress alongside the underlying error so the endpoint can merge
//! both into its response body.
//!
//! ## The empty transcript:
//! Silence or noise transcribes to an empty string. That is not an error and
//! must not burn a chat or synthesis call; the pipeline short-circuits to
//! `VoiceOutcome::NoSpeech` and the endpoint answers with a fixed fallback
//! reply.

use crate::error::AppError;
use crate::providers::{ChatProvider, SpeechProvider, TranscriptionProvider};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::debug;

/// Successful result of a voice round-trip.
#[derive(Debug)]
pub enum VoiceOutcome {
    /// The recording contained no recognisable speech.
    NoSpeech,

    /// A full exchange: what was heard, what was answered, and the answer
    /// spoken as base64-encoded MPEG audio.
    Exchange {
        transcript: String,
        reply: String,
        audio_base64: String,
    },
}

/// A stage failure, keeping the progress made before it.
#[derive(Debug)]
pub struct PipelineFailure {
    /// Present once transcription succeeded.
    pub transcript: Option<String>,
    /// Present once chat completion succeeded.
    pub reply: Option<String>,
    pub source: AppError,
}

/// Run the transcribe -> chat -> synthesize sequence.
pub async fn run_voice_exchange(
    transcriber: &dyn TranscriptionProvider,
    chat: &dyn ChatProvider,
    synthesizer: &dyn SpeechProvider,
    system_prompt: &str,
    audio: Vec<u8>,
    filename: &str,
) -> Result<VoiceOutcome, PipelineFailure> {
    let transcript = transcriber
        .transcribe(audio, filename)
        .await
        .map_err(|source| PipelineFailure {
            transcript: None,
            reply: None,
            source,
        })?;

    if transcript.trim().is_empty() {
        debug!("Transcription produced no speech, skipping chat and synthesis");
        return Ok(VoiceOutcome::NoSpeech);
    }

    debug!(chars = transcript.len(), "Transcription complete");

    let reply = chat
        .complete(system_prompt, &transcript)
        .await
        .map_err(|source| PipelineFailure {
            transcript: Some(transcript.clone()),
            reply: None,
            source,
        })?;

    let audio_mpeg = synthesizer
        .synthesize(&reply)
        .await
        .map_err(|source| PipelineFailure {
            transcript: Some(transcript.clone()),
            reply: Some(reply.clone()),
            source,
        })?;

    debug!(audio_bytes = audio_mpeg.len(), "Voice exchange complete");

    Ok(VoiceOutcome::Exchange {
        transcript,
        reply,
        audio_base64: BASE64.encode(audio_mpeg),
    })
}
