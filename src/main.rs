//! Raffle wheel backend entrypoint wiring the draw session, REST and SSE layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raffle_wheel_back::{
    animation::{HeadlessListSurface, HeadlessWheelSurface, TokioFrameScheduler},
    audio::{AudioCue, TimedAudioCue},
    config::ConfigStore,
    dao::{
        history_store::{HistoryStore, JsonFileHistoryStore, MemoryHistoryStore},
        reservation_store::MemoryReservationStore,
    },
    routes,
    services::driver,
    state::{SessionParts, SharedState},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ConfigStore::load();
    let settings = config.snapshot().await;

    let history: Arc<dyn HistoryStore> = match &settings.history_path {
        Some(path) => {
            info!(path = %path.display(), "persisting draw history to file");
            Arc::new(JsonFileHistoryStore::new(path.clone()))
        }
        None => {
            info!("draw history kept in memory");
            Arc::new(MemoryHistoryStore::new())
        }
    };

    let audio: Arc<dyn AudioCue> = if settings.audio_enabled {
        Arc::new(TimedAudioCue::new(settings.audio_volume))
    } else {
        info!("audio cues disabled");
        Arc::new(TimedAudioCue::disabled())
    };

    let state = driver::start_session(SessionParts {
        wheel_surface: Arc::new(HeadlessWheelSurface::new(settings.wheel_diameter)),
        list_surface: Arc::new(HeadlessListSurface::new(settings.list_geometry)),
        frames: Arc::new(TokioFrameScheduler::new(settings.frame_interval)),
        audio,
        history,
        reservations: Arc::new(MemoryReservationStore::new()),
        config,
    });

    // Build the HTTP router once the session is running.
    let app = build_router(state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
