//! # Pulmo Viewer Backend - Main Application Entry Point
//!
//! This is the main entry point for the pulmo-viewer-backend web server: the
//! API and static-file host behind a 3D anatomical lung viewer with a built-in
//! voice assistant. It sets up an Actix-web HTTP server with the following key
//! features:
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: Request handling and upstream provider calls never block a thread
//! - **modules**: Each concern lives in its own file or directory under src/
//! - **Result<T, E>**: Errors propagate with ? instead of panicking
//! - **Arc & RwLock**: Shared state and metrics across worker threads
//! - **static**: A process-wide atomic flag carries the shutdown signal
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, optional TOML file, environment)
//! - **state**: Manages shared application state, metrics and the provider handles
//! - **providers**: HTTP clients for the OpenAI and ElevenLabs APIs
//! - **audio**: Upload spooling and best-effort WAV re-encoding
//! - **pipeline**: The transcribe -> chat -> synthesize voice round-trip
//! - **handlers**: HTTP request handlers for the API endpoints
//! - **health**: System health and metrics endpoints
//! - **middleware**: Request logging and per-endpoint metrics collection
//! - **error**: The AppError type and its JSON error envelope

// Module declarations, one per file or directory under src/
mod audio;       // Upload spooling and re-encoding (audio/ directory)
mod config;      // Configuration management (config.rs)
mod error;       // Error handling types (error.rs)
mod handlers;    // HTTP request handlers (handlers/ directory)
mod health;      // Health check endpoints (health.rs)
mod middleware;  // Custom middleware (middleware/ directory)
mod persona;     // The assistant's built-in system prompt (persona.rs)
mod pipeline;    // The voice round-trip (pipeline.rs)
mod providers;   // Upstream API clients (providers/ directory)
mod state;       // Application state management (state.rs)

// External crates (see Cargo.toml for versions)
use actix_cors::Cors;  // Browser cross-origin support
use actix_files::Files;  // Static file serving for the viewer frontend
use actix_web::{web, App, HttpServer, middleware::Logger};  // Web framework
use anyhow::Result;    // Error type for the startup path
use config::AppConfig; // Layered configuration loader
use providers::{ElevenLabsClient, OpenAiClient};  // Concrete provider clients
use state::AppState;   // Shared handles and metrics
use std::sync::atomic::{AtomicBool, Ordering};  // Lock-free shutdown flag
use std::sync::Arc;
use tracing::{info, error, warn};  // Structured logging
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};  // Logging setup

/// Process-wide shutdown flag. The signal task sets it and the main task
/// polls it; AtomicBool makes that safe with no lock involved.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Upper bound for JSON request bodies (chat and TTS). Audio uploads are
/// capped separately, per chunk, while they stream to disk.
const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Brings up logging** so startup problems are visible
/// 2. **Loads configuration** from defaults, config.toml and the environment
/// 3. **Builds the provider clients** (OpenAI, ElevenLabs) and probes for ffmpeg
/// 4. **Creates shared application state** that all requests can access
/// 5. **Configures the HTTP server** with middleware, API routes and the
///    static viewer frontend
/// 6. **Handles graceful shutdown** when receiving system signals
///
/// ## Key Rust Concepts:
/// - `#[actix_web::main]`: Sets up the async runtime the whole server runs on
/// - `async fn`: Startup awaits the encoder probe and then the server itself
/// - `Result<()>`: A failed startup step ends the process instead of limping on
/// - `?`: Each fallible step returns early on error
///
/// ## Error Handling:
/// Config parsing and address binding failures end the process with an error
/// message. Missing provider
/// credentials are NOT a startup error: the server comes up, warns, and the
/// affected endpoints answer 500 until the keys are supplied.
#[actix_web::main]
async fn main() -> Result<()> {
    // Pull in a local .env file when present; .ok() because a missing file
    // is the normal case outside development
    dotenv::dotenv().ok();

    // Logging comes up first so everything after can be traced
    init_tracing()?;

    // Layered configuration: defaults, then optional config.toml, then env
    let config = AppConfig::load()?;
    // Fail fast on nonsense values (port 0, empty model names, ...)
    config.validate()?;

    info!("Starting pulmo-viewer-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    // One OpenAI client serves both chat and transcription; the Arc is shared
    // between the two trait-object slots in the state.
    let openai = Arc::new(OpenAiClient::new(config.openai.clone(), config.assistant.clone())?);
    let elevenlabs = Arc::new(ElevenLabsClient::new(config.elevenlabs.clone())?);

    // Probe for the audio encoder once; uploads fall back to being sent
    // as recorded when it is missing.
    let ffmpeg_available = audio::encoder_available(&config.ffmpeg.binary).await;

    // Shared state: every handler sees the same provider handles and counters
    let app_state = AppState::new(
        config.clone(),
        openai.clone(),
        openai,
        elevenlabs,
        ffmpeg_available,
    );

    if !app_state.chat.is_configured() {
        warn!("OPENAI_API_KEY is not set; chat and voice endpoints will answer 500 until it is");
    }
    if !app_state.synthesizer.is_configured() {
        warn!("ELEVEN_API_KEY / ELEVEN_VOICE_ID are not set; speech synthesis will answer 500 until they are");
    }
    if !ffmpeg_available {
        warn!(binary = %config.ffmpeg.binary, "Audio encoder not found; recordings will be transcribed without re-encoding");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let assets_dir = config.assets.dir.clone();

    // Install SIGINT/SIGTERM handlers before the server starts accepting
    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    // Assemble the HTTP server; the closure runs once per worker thread
    let server = HttpServer::new(move || {
        // Permissive CORS so the viewer can be opened from any origin
        let cors = Cors::default()
            .allow_any_origin()    // Requests from any origin are accepted
            .allow_any_method()    // All HTTP methods
            .allow_any_header()    // All request headers
            .max_age(3600);        // Browsers may cache the preflight for an hour

        App::new()
            // This worker's clone of the shared state
            .app_data(web::Data::new(app_state.clone()))
            // Size limit for JSON bodies read via web::Bytes
            .app_data(web::PayloadConfig::new(JSON_BODY_LIMIT))
            // Middleware stack (the last wrap runs first on each request)
            .wrap(cors)                                    // Preflight and response headers
            .wrap(Logger::default())                       // Actix's own access log
            .wrap(middleware::MetricsMiddleware)           // Per-endpoint counters and timings
            .wrap(middleware::RequestLogging)              // Request ids, API/asset split
            // The JSON and voice API lives under /api
            .service(
                web::scope("/api")
                    .route("/chat", web::post().to(handlers::chat))
                    .route("/voice/chat", web::post().to(handlers::voice_chat))
                    .route("/voice/tts", web::post().to(handlers::tts))
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
            )
            // Health is reachable without the /api prefix too
            .route("/health", web::get().to(health::health_check))
            // The viewer frontend; registered last so the API routes win
            .service(Files::new("/", assets_dir.clone()).index_file("index.html"))
    })
    .bind(&bind_addr)?  // Bind the configured address
    .run();             // Start accepting connections without blocking this task

    // Keep a handle so the shutdown arm below can stop the server
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Race the server against the shutdown flag; whichever finishes first wins
    tokio::select! {
        // The server finishing on its own usually means a bind or runtime error
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        // A termination signal arrived
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;  // true = drain in-flight requests first
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Bring up the tracing subscriber for the whole process.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "info", "pulmo_viewer_backend=debug")
/// - If not set, defaults to "pulmo_viewer_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            // RUST_LOG wins when set, otherwise the service defaults apply
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulmo_viewer_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())  // Human-readable console output
        .init();

    Ok(())
}

/// Spawn the task that listens for termination signals.
///
/// ## What this does:
/// - SIGTERM: the usual stop request from a service manager
/// - SIGINT: Ctrl+C in a terminal
/// - Either one sets the process-wide shutdown flag
///
/// ## Why this matters:
/// Stopping gracefully lets in-flight requests finish, provider calls
/// included, and lets the temp-file guards run their cleanup.
fn setup_signal_handlers() {
    tokio::spawn(async {
        // Register for both common termination signals
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        // Whichever signal lands first wins
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        // Flip the flag; wait_for_shutdown() in main polls it
        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Block until the shutdown flag flips.
///
/// Simple polling: check the flag, sleep 100ms, check again. Fine for a
/// once-per-process-lifetime event.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
