//! Text chat endpoint.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

/// Request body for `POST /api/chat`.
///
/// The current frontend sends `message`; an earlier revision sent `text`,
/// and both are still accepted.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl ChatRequest {
    /// The user's prompt, whichever key it arrived under. Whitespace-only
    /// input counts as missing.
    fn prompt(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.text.as_deref())
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
    }
}

/// Ask the assistant a question in text form.
///
/// ## Endpoint: `POST /api/chat`
///
/// ## Request:
/// ```json
/// {"message": "What do the alveoli do?"}
/// ```
///
/// ## Response:
/// ```json
/// {"answer": "They are the tiny air sacs where gas exchange happens..."}
/// ```
///
/// ## Errors:
/// - 400 when the message is missing or empty
/// - 500 when the OpenAI credential is not configured
/// - 502 when the provider refused or failed, with its response relayed
pub async fn chat(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, AppError> {
    let request: ChatRequest = serde_json::from_slice(&body)?;
    let message = request
        .prompt()
        .ok_or_else(|| AppError::BadRequest("Missing message field".to_string()))?;

    if !state.chat.is_configured() {
        return Err(AppError::ConfigError("OPENAI_API_KEY is not set".to_string()));
    }

    let answer = state.chat.complete(state.system_prompt(), message).await?;

    Ok(HttpResponse::Ok().json(json!({ "answer": answer })))
}
