//! mychannel binary - single-host broadcast service
//!
//! Wires up:
//! - Local adapters (ffmpeg encoder, ffprobe/yt-dlp probes, Unix process lifecycle)
//! - The scheduling loop as a background task
//! - HTTP queue management and MCP inbound adapter

use mychannel::adapters::local::http::{self, auth::AuthToken, AppState};
use mychannel::adapters::local::{
    FfmpegEncoder, ProbeDurationProvider, TokioCommandRunner, UnixProcessLifecycle,
};
use mychannel::application::{ControlPlane, ProcessHandle, Scheduler, SchedulerTimings};
use mychannel::config::ChannelConfig;
use mychannel::domain::Playlist;
use mychannel::ports::duration::DurationProvider;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ChannelConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        destination = %config.destination.redacted(),
        fallback = %config.fallback_item,
        "Configuration loaded"
    );

    // 1. Adapters
    let timings = SchedulerTimings::default();
    let lifecycle = Arc::new(UnixProcessLifecycle);
    let durations: Arc<dyn DurationProvider> =
        Arc::new(ProbeDurationProvider::new(TokioCommandRunner, &config.tools));
    let encoder = Arc::new(
        FfmpegEncoder::new(config.tools.clone(), config.encoder.clone())
            .with_grace_period(timings.grace_period),
    );

    // 2. Shared state
    let playlist = Arc::new(Playlist::new());
    let process = Arc::new(
        ProcessHandle::new(lifecycle, Some(config.destination.endpoint()))
            .with_grace_period(timings.grace_period),
    );

    // 3. Scheduling loop
    let scheduler = Scheduler::new(
        playlist.clone(),
        process.clone(),
        durations.clone(),
        encoder,
        config.destination.clone(),
        config.fallback_item.clone(),
    )
    .with_timings(timings);
    let scheduler_task = tokio::spawn(async move { scheduler.run().await });

    // 4. HTTP layer
    let auth = AuthToken::new(config.auth_token.clone());
    if auth.is_enabled() {
        info!("Authentication enabled for write operations");
    } else {
        warn!("MYCHANNEL_AUTH_TOKEN not set, write operations are unauthenticated");
    }
    let control = ControlPlane::new(
        playlist,
        process,
        durations,
        config.fallback_item.clone(),
    );
    let app = http::router(AppState::new(control.clone(), auth));

    // 5. Start server
    let listener = match tokio::net::TcpListener::bind(config.bind_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_address(), e);
            std::process::exit(1);
        }
    };
    info!("Listening at http://{}", config.bind_address());

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // The encoder runs in its own process group and would outlive us.
    scheduler_task.abort();
    control.interrupt_current().await;
    info!("Shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let term = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = term => {},
    }

    warn!("Shutdown signal received");
}
