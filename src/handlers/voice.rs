//! Voice endpoints: the spoken round-trip and plain text-to-speech.

use crate::audio::{convert_to_wav, save_upload};
use crate::error::AppError;
use crate::persona;
use crate::pipeline::{run_voice_exchange, VoiceOutcome};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Talk to the assistant with a voice recording.
///
/// ## Endpoint: `POST /api/voice/chat`
///
/// ## Request:
/// Multipart form data with the recording in a field named "file".
///
/// ## Response:
/// ```json
/// {
///   "transcript": "what are alveoli",
///   "reply": "They are the tiny air sacs...",
///   "audio_base64": "<the reply spoken as base64 MPEG audio>"
/// }
/// ```
///
/// A recording with no recognisable speech still answers 200, with an empty
/// transcript, an empty `audio_base64` and a fixed fallback reply.
///
/// ## Errors:
/// - 400 when no file was uploaded or it exceeds the size cap
/// - 500 when a provider credential is missing (checked before any call)
/// - 502 when a pipeline stage fails; the body carries whatever the earlier
///   stages already produced next to the error
///
/// The spooled upload and any re-encoded derivative are removed when the
/// request finishes, whatever the outcome.
pub async fn voice_chat(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let upload = save_upload(
        payload,
        Path::new(&state.config.uploads.dir),
        state.config.uploads.max_upload_bytes,
    )
    .await?
    .ok_or_else(|| AppError::BadRequest("Missing audio file".to_string()))?;

    info!(
        filename = %upload.filename,
        size_bytes = upload.size_bytes,
        "Voice exchange started"
    );

    // The round-trip needs all three providers; refuse before spending any
    // provider call. The upload guard removes the spooled file on this path.
    let mut missing = Vec::new();
    if !state.transcriber.is_configured() || !state.chat.is_configured() {
        missing.push("OPENAI_API_KEY");
    }
    if !state.synthesizer.is_configured() {
        missing.push("ELEVEN_API_KEY / ELEVEN_VOICE_ID");
    }
    if !missing.is_empty() {
        return Err(AppError::ConfigError(format!(
            "Server not configured (missing {})",
            missing.join(", ")
        )));
    }

    let converted = if state.ffmpeg_available {
        convert_to_wav(&state.config.ffmpeg.binary, upload.file.path()).await
    } else {
        None
    };

    // Transcribe the WAV when conversion worked, the raw upload otherwise
    let (audio_path, stt_filename) = match &converted {
        Some(wav) => (
            wav.path(),
            wav.path()
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("recording.wav"),
        ),
        None => (upload.file.path(), upload.filename.as_str()),
    };

    let audio = tokio::fs::read(audio_path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read spooled audio: {}", e)))?;

    let outcome = run_voice_exchange(
        state.transcriber.as_ref(),
        state.chat.as_ref(),
        state.synthesizer.as_ref(),
        state.system_prompt(),
        audio,
        stt_filename,
    )
    .await;

    // The upload and conversion guards drop when this function returns,
    // removing both temp files on every branch below.
    match outcome {
        Ok(VoiceOutcome::NoSpeech) => Ok(HttpResponse::Ok().json(json!({
            "transcript": "",
            "reply": persona::NO_SPEECH_REPLY,
            "audio_base64": "",
        }))),
        Ok(VoiceOutcome::Exchange {
            transcript,
            reply,
            audio_base64,
        }) => Ok(HttpResponse::Ok().json(json!({
            "transcript": transcript,
            "reply": reply,
            "audio_base64": audio_base64,
        }))),
        Err(failure) => {
            let mut body = json!({ "error": failure.source.envelope() });
            if let Some(transcript) = failure.transcript {
                body["transcript"] = json!(transcript);
                body["reply"] = json!(failure.reply.unwrap_or_default());
            }
            Ok(HttpResponse::build(failure.source.http_status()).json(body))
        }
    }
}

/// Request body for `POST /api/voice/tts`.
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    text: Option<String>,
}

/// Speak a piece of text.
///
/// ## Endpoint: `POST /api/voice/tts`
///
/// ## Request:
/// ```json
/// {"text": "The lungs sit either side of the heart."}
/// ```
///
/// ## Response:
/// The synthesized speech as raw `audio/mpeg` bytes (not JSON), ready to be
/// fed to an `<audio>` element.
pub async fn tts(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, AppError> {
    let request: TtsRequest = serde_json::from_slice(&body)?;
    let text = request
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing text field".to_string()))?;

    if !state.synthesizer.is_configured() {
        return Err(AppError::ConfigError(
            "ELEVEN_API_KEY / ELEVEN_VOICE_ID are not set".to_string(),
        ));
    }

    let audio = state.synthesizer.synthesize(text).await?;

    Ok(HttpResponse::Ok().content_type("audio/mpeg").body(audio))
}
