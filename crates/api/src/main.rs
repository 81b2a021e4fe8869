use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenegen_api::config::ServerConfig;
use scenegen_api::router::build_app_router;
use scenegen_api::state::AppState;
use scenegen_pipeline::CommandBackend;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scenegen_api=debug,scenegen_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    match &config.generator.program {
        Some(program) => tracing::info!(%program, "Generator program configured"),
        None => tracing::warn!("GENERATOR_COMMAND is not set; every job will fail to initialize"),
    }

    // --- App state ---
    let backend = Arc::new(CommandBackend::new(config.generator.clone()));
    let state = AppState::new(config.clone(), backend);

    state
        .store
        .ensure_root()
        .await
        .expect("Failed to create output directory");
    tracing::info!(output_dir = %state.store.root().display(), "Artifact store ready");

    // Log every job lifecycle event.
    let listener_handle = tokio::spawn(scenegen_events::log_events(state.event_bus.subscribe()));

    let dispatcher = Arc::clone(&state.dispatcher);
    let event_bus = Arc::clone(&state.event_bus);

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    let in_flight = dispatcher.in_flight();
    tracing::info!(in_flight, "Server stopped accepting connections, waiting for jobs");

    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if dispatcher.drain(timeout).await {
        tracing::info!("All jobs finished");
    } else {
        tracing::warn!(
            still_running = dispatcher.in_flight(),
            "Shutdown timeout reached with jobs still running",
        );
    }

    // Dropping the last bus handle closes the channel and stops the listener.
    drop(dispatcher);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), listener_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
