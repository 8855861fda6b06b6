//! # Audio Intake
//!
//! This module handles the voice recordings uploaded to `/api/voice/chat`:
//!
//! ## Key Components:
//! - **Upload spooling**: Streams the multipart `file` field to a
//!   UUID-named temporary file, enforcing the configured size cap while the
//!   bytes are still arriving
//! - **Temp file guard**: `TempFile` removes its file on drop, so uploads
//!   and their derivatives disappear on every exit path, success or error
//! - **Re-encoding**: Shells out to ffmpeg to convert whatever container the
//!   browser recorded (usually WebM/Opus) into 16 kHz mono PCM WAV, the
//!   format the transcription API handles most reliably
//!
//! ## Conversion is best-effort:
//! A missing or failing encoder never fails the request. The original upload
//! is submitted unchanged and the transcription provider is left to make
//! sense of the container.

pub mod convert;
pub mod upload;

pub use convert::{convert_to_wav, encoder_available};
pub use upload::{save_upload, SavedUpload, TempFile};
