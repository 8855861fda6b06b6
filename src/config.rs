//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix, plus a handful of plain deployment variables)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **struct**: Custom data types that group related fields together
//! - **impl blocks**: Add methods to structs
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Plain deployment variables (HOST, PORT, OPENAI_API_KEY, OPENAI_MODEL,
//!    ELEVEN_API_KEY, ELEVEN_VOICE_ID)
//! 2. Environment variables (APP_SERVER__HOST, APP_OPENAI__CHAT_MODEL, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! API keys are deliberately not given defaults and should never be written to
//! config.toml; they arrive through the environment (or a local .env file).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, upstream providers,
/// assistant behaviour, uploads) makes it easier to understand and maintain
/// as the application grows. Each group maps to a `[section]` in config.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub assistant: AssistantConfig,
    pub uploads: UploadsConfig,
    pub assets: AssetsConfig,
    pub ffmpeg: FfmpegConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to (e.g., "127.0.0.1", "0.0.0.0")
/// - `port`: TCP port number to listen on (1-65535)
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,  // u16 = unsigned 16-bit integer (0-65535), perfect for port numbers
}

/// OpenAI API settings, used for both chat completion and audio transcription.
///
/// ## Fields:
/// - `api_key`: Bearer token for api.openai.com. Empty string means "not configured";
///   requests that need it fail individually instead of preventing startup.
/// - `chat_model`: Chat completion model (e.g., "gpt-4o-mini", "gpt-4o")
/// - `transcription_model`: Speech-to-text model (e.g., "whisper-1")
/// - `api_base`: URL prefix for the API, overridable for tests and proxies
/// - `timeout_secs`: Per-request timeout for outbound calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

/// ElevenLabs API settings, used for text-to-speech synthesis.
///
/// ## Fields:
/// - `api_key`: Value sent in the `xi-api-key` header. Empty means "not configured".
/// - `voice_id`: Which synthetic voice to speak with (part of the request URL)
/// - `api_base`: URL prefix for the API, overridable for tests and proxies
/// - `timeout_secs`: Per-request timeout for outbound calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub voice_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

/// Assistant behaviour settings applied to every chat completion.
///
/// ## Fields:
/// - `max_tokens`: Upper bound on the length of a generated reply
/// - `temperature`: Sampling temperature (0.0 = deterministic, 2.0 = very random).
///   Low values suit a medical information assistant.
/// - `system_prompt`: Optional replacement for the built-in persona prompt.
///   Empty string means "use the built-in one".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
}

/// Settings for uploaded voice recordings.
///
/// ## Fields:
/// - `dir`: Directory where uploads are spooled before transcription.
///   Files here are temporary and removed after each request.
/// - `max_upload_bytes`: Reject recordings larger than this while they are
///   still streaming in. The transcription API itself caps files at 25 MB,
///   so anything bigger would only waste bandwidth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    pub dir: String,
    pub max_upload_bytes: usize,
}

/// Static frontend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory served at `/` (the viewer page, scripts and 3D models).
    pub dir: String,
}

/// External audio encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Name or path of the ffmpeg binary used to re-encode uploads to WAV.
    pub binary: String,
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values. Note that the
/// API key fields default to empty: the server boots without credentials and the
/// affected endpoints report the problem per request.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            openai: OpenAiConfig {
                api_key: String::new(),
                chat_model: "gpt-4o-mini".to_string(),
                transcription_model: "whisper-1".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
                timeout_secs: 120,
            },
            elevenlabs: ElevenLabsConfig {
                api_key: String::new(),
                voice_id: String::new(),
                api_base: "https://api.elevenlabs.io/v1".to_string(),
                timeout_secs: 120,
            },
            assistant: AssistantConfig {
                max_tokens: 512,      // Enough for a few paragraphs of answer
                temperature: 0.2,     // Keep medical answers close to the sources
                system_prompt: String::new(),
            },
            uploads: UploadsConfig {
                dir: "tmp".to_string(),
                max_upload_bytes: 25 * 1024 * 1024,
            },
            assets: AssetsConfig {
                dir: "static".to_string(),
            },
            ffmpeg: FfmpegConfig {
                binary: "ffmpeg".to_string(),
            },
        }
    }
}

/// Implementation block for AppConfig - adds methods to the struct.
impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the plain environment variables of the deployment contract
    ///    (HOST/PORT from the platform, the provider credentials)
    ///
    /// ## Rust Concepts:
    /// - **Builder pattern**: Chain method calls to configure the config loader
    /// - **?**: Early return on error (if any step fails, return the error)
    /// - **if let Ok(...)**: Only execute if the environment variable exists
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=8080`: Override server port (note the double underscore
    ///   separating section from field)
    /// - `APP_OPENAI__CHAT_MODEL=gpt-4o`: Override the chat model
    /// - `OPENAI_API_KEY=sk-...`: Provider credential
    /// - `ELEVEN_VOICE_ID=...`: Which ElevenLabs voice to use
    /// - `PORT=3000`: Special case for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists) - required(false) means "don't error if missing"
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix
            // Example: APP_SERVER__HOST becomes server.host in the config
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        // Handle the plain environment variables that deployment platforms and
        // the provider dashboards hand out. These don't follow the APP_ prefix
        // convention but are what operators actually set.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("openai.api_key", key)?;
        }

        if let Ok(model) = env::var("OPENAI_MODEL") {
            settings = settings.set_override("openai.chat_model", model)?;
        }

        if let Ok(key) = env::var("ELEVEN_API_KEY") {
            settings = settings.set_override("elevenlabs.api_key", key)?;
        }

        if let Ok(voice) = env::var("ELEVEN_VOICE_ID") {
            settings = settings.set_override("elevenlabs.voice_id", voice)?;
        }

        // Build the final configuration and convert it back to our AppConfig struct
        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be used)
    /// - Model names and API base URLs are non-empty
    /// - Assistant sampling parameters are in range
    /// - Upload cap and directories are usable
    ///
    /// ## What this deliberately does NOT check:
    /// API keys. A missing credential is an operational state, not a startup
    /// error: the server still serves the viewer and reports the gap on the
    /// endpoints that need the key.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.openai.chat_model.is_empty() {
            return Err(anyhow::anyhow!("OpenAI chat model cannot be empty"));
        }

        if self.openai.transcription_model.is_empty() {
            return Err(anyhow::anyhow!("OpenAI transcription model cannot be empty"));
        }

        if self.openai.api_base.is_empty() || self.elevenlabs.api_base.is_empty() {
            return Err(anyhow::anyhow!("Provider API base URLs cannot be empty"));
        }

        if self.openai.timeout_secs == 0 || self.elevenlabs.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Provider timeouts must be greater than 0"));
        }

        if self.assistant.max_tokens == 0 {
            return Err(anyhow::anyhow!("Assistant max_tokens must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.assistant.temperature) {
            return Err(anyhow::anyhow!(
                "Assistant temperature must be between 0.0 and 2.0 (got {})",
                self.assistant.temperature
            ));
        }

        if self.uploads.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limit must be greater than 0"));
        }

        if self.uploads.dir.is_empty() {
            return Err(anyhow::anyhow!("Upload directory cannot be empty"));
        }

        if self.assets.dir.is_empty() {
            return Err(anyhow::anyhow!("Assets directory cannot be empty"));
        }

        if self.ffmpeg.binary.is_empty() {
            return Err(anyhow::anyhow!("ffmpeg binary name cannot be empty"));
        }

        Ok(())  // All validation passed
    }
}

/// Tests for the configuration module.
///
/// ## Rust Concepts:
/// - **#[cfg(test)]**: Only compile this code when running tests
/// - **mod tests**: A module containing test functions
/// - **#[test]**: Marks a function as a test case
/// - **assert_eq!**: Checks that two values are equal
/// - **is_ok(), is_err()**: Check if a Result is success or error
#[cfg(test)]
mod tests {
    use super::*;  // Import everything from the parent module

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.openai.chat_model, "gpt-4o-mini");
        assert_eq!(config.openai.transcription_model, "whisper-1");
        assert!(config.openai.api_key.is_empty());
        assert!(config.elevenlabs.voice_id.is_empty());
        // Ensure the default config passes validation
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation_rejects_port_zero() {
        let mut config = AppConfig::default();
        config.server.port = 0;  // Invalid port
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_bad_temperature() {
        let mut config = AppConfig::default();
        config.assistant.temperature = 3.5;  // Out of the 0.0..=2.0 range
        assert!(config.validate().is_err());

        config.assistant.temperature = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_empty_models() {
        let mut config = AppConfig::default();
        config.openai.chat_model = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.assistant.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    /// Missing credentials must not fail validation: the server boots without
    /// them and reports the gap per request instead.
    #[test]
    fn test_missing_credentials_are_not_a_validation_error() {
        let config = AppConfig::default();
        assert!(config.openai.api_key.is_empty());
        assert!(config.elevenlabs.api_key.is_empty());
        assert!(config.validate().is_ok());
    }
}
