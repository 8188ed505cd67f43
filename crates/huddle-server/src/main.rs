//! Huddle server binary: the main entry point for the conferencing bot.
//!
//! Wires the platform gateway client, the announcement pipeline and the call
//! state machine together, then serves the notification API with structured
//! logging and graceful shutdown on SIGTERM/SIGINT.

use huddle_bot::CallStateMachine;
use huddle_server::config;
use huddle_server::platform::HttpPlatform;
use huddle_server::{app, AppState};
use huddle_voice::{AnnouncementPipeline, AnnouncementSynthesizer, AudioInjector};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("HUDDLE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    if config.bot.user_id.is_empty() {
        tracing::warn!(
            "bot.user_id is not set; the bot will not recognize being added to conversations"
        );
    }

    // Platform gateway
    let platform = Arc::new(
        HttpPlatform::new(&config.platform)
            .expect("failed to build platform client: check platform settings in config"),
    );
    tracing::info!(base_url = %config.platform.base_url, "using platform gateway");

    // Announcement pipeline
    let synthesizer = AnnouncementSynthesizer::new(config.speech.clone())
        .expect("failed to build speech client: check speech settings in config");
    if !synthesizer.is_enabled() {
        tracing::warn!("speech.url is empty; announcements will be dropped");
    }
    let pipeline = Arc::new(AnnouncementPipeline::new(
        synthesizer,
        AudioInjector::new(platform.clone()),
    ));
    let (announce_tx, announce_rx) = mpsc::unbounded_channel();
    let pipeline_task = tokio::spawn(pipeline.run(announce_rx));

    // Call state machine
    let (machine, bot) = CallStateMachine::new(config.bot_settings(), platform, announce_tx);
    let machine_task = tokio::spawn(machine.run());

    // Build application
    let app = app(AppState { bot });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, mode = ?config.bot.mode, "starting huddle server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // The router held the last handle; the machine and pipeline drain and stop.
    if let Err(e) = machine_task.await {
        tracing::error!("call state machine task failed: {}", e);
    }
    if let Err(e) = pipeline_task.await {
        tracing::error!("announcement pipeline task failed: {}", e);
    }

    tracing::info!("huddle server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
